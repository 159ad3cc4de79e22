use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::catalog::{self, ModelCard};
use crate::events::{ChatMessage, ConversationSnapshot};
use crate::llm::InferenceEngine;
use crate::storage::SnapshotStore;

/// Owns the running conversation and the selected model.
///
/// All operations take `&self`, so the manager can be shared with a spawned
/// send task. It does not serialize concurrent sends; callers keep at most one
/// in flight.
pub struct ConversationManager {
    store: Arc<dyn SnapshotStore>,
    engine: Arc<dyn InferenceEngine>,
    messages: watch::Sender<Vec<ChatMessage>>,
    current_model: Mutex<ModelCard>,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn SnapshotStore>, engine: Arc<dyn InferenceEngine>) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            store,
            engine,
            messages,
            current_model: Mutex::new(catalog::default_model().clone()),
        }
    }

    /// Restore the saved conversation, if any. Call once at startup.
    pub async fn initialize(&self) {
        let Some(snapshot) = self.store.observe().next().await.flatten() else {
            debug!("No saved conversation");
            return;
        };

        match catalog::find_model(&snapshot.model_id) {
            Some(card) => self.set_model(card.clone()),
            None => debug!(
                "Saved model {} not in catalog, keeping {}",
                snapshot.model_id,
                self.selected_model().id
            ),
        }

        info!("Restored {} messages", snapshot.messages.len());
        self.messages.send_replace(snapshot.messages);
    }

    pub fn selected_model(&self) -> ModelCard {
        self.current_model
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.borrow().clone()
    }

    /// Receive the message list every time it changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.messages.subscribe()
    }

    /// Switch models; `clear_history` also resets the conversation
    pub async fn select_model(&self, card: ModelCard, clear_history: bool) -> Result<()> {
        info!("Selected model {}", card.id);
        self.set_model(card);
        if clear_history {
            self.reset().await?;
        }
        Ok(())
    }

    /// Append the prompt, ask the engine for a reply and append that too.
    ///
    /// If the engine fails the prompt stays in the conversation and nothing
    /// is saved.
    pub async fn send(&self, prompt: &str, persist: bool) -> Result<ChatMessage> {
        let model = self.selected_model();

        let mut updated = self.messages();
        updated.push(ChatMessage::user(prompt));
        self.messages.send_replace(updated.clone());

        let reply = self
            .engine
            .generate_reply(&model, &updated, prompt)
            .await
            .with_context(|| format!("{} could not answer", model.display_name))?;

        let assistant = ChatMessage::assistant(reply);
        self.messages
            .send_modify(|messages| messages.push(assistant.clone()));

        if persist {
            let snapshot = ConversationSnapshot {
                model_id: model.id,
                messages: self.messages(),
            };
            self.store
                .save(Some(&snapshot))
                .await
                .context("Failed to save conversation")?;
        }

        Ok(assistant)
    }

    /// Clear the conversation and its saved copy
    pub async fn reset(&self) -> Result<()> {
        self.messages.send_replace(Vec::new());
        self.store
            .save(None)
            .await
            .context("Failed to clear saved conversation")?;
        info!("Conversation cleared");
        Ok(())
    }

    fn set_model(&self, card: ModelCard) {
        *self.current_model.lock().unwrap_or_else(|e| e.into_inner()) = card;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::featured_models;
    use crate::llm::InferenceError;
    use crate::storage::FileSnapshotStore;
    use crate::testing::{EchoEngine, FailingEngine};

    fn manager(dir: &tempfile::TempDir) -> (ConversationManager, Arc<FileSnapshotStore>) {
        let store = Arc::new(FileSnapshotStore::new(dir.path().join("chat_memory.json")));
        let manager = ConversationManager::new(store.clone(), Arc::new(EchoEngine));
        (manager, store)
    }

    #[tokio::test]
    async fn starts_empty_with_default_model() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir);
        manager.initialize().await;

        assert!(manager.messages().is_empty());
        assert_eq!(manager.selected_model(), *catalog::default_model());
    }

    #[tokio::test]
    async fn send_without_persist_leaves_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, store) = manager(&dir);

        let reply = manager.send("hi", false).await.unwrap();
        assert_eq!(reply, ChatMessage::assistant("Gemma 2B (int4) says: hi"));
        assert_eq!(manager.messages().len(), 2);
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn subscribers_see_both_appends() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(&dir);
        let rx = manager.subscribe();

        manager.send("ping", false).await.unwrap();
        assert_eq!(
            *rx.borrow(),
            vec![
                ChatMessage::user("ping"),
                ChatMessage::assistant("Gemma 2B (int4) says: ping"),
            ]
        );
    }

    #[tokio::test]
    async fn select_model_keeps_or_clears_history() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, store) = manager(&dir);
        manager.send("hi", true).await.unwrap();

        manager.select_model(featured_models()[1].clone(), false).await.unwrap();
        assert_eq!(manager.selected_model().id, featured_models()[1].id);
        assert_eq!(manager.messages().len(), 2);

        manager.select_model(featured_models()[2].clone(), true).await.unwrap();
        assert_eq!(manager.selected_model().id, featured_models()[2].id);
        assert!(manager.messages().is_empty());
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn select_model_accepts_cards_outside_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, store) = manager(&dir);
        let custom = ModelCard {
            id: "local/custom".to_string(),
            display_name: "Custom".to_string(),
            ..catalog::default_model().clone()
        };

        manager.select_model(custom, false).await.unwrap();
        manager.send("yo", true).await.unwrap();

        let saved = store.load().await.unwrap();
        assert_eq!(saved.model_id, "local/custom");
        assert_eq!(saved.messages[1], ChatMessage::assistant("Custom says: yo"));
    }

    #[tokio::test]
    async fn engine_failure_keeps_prompt_and_skips_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSnapshotStore::new(dir.path().join("chat_memory.json")));
        let manager = ConversationManager::new(store.clone(), Arc::new(FailingEngine));

        let err = manager.send("hi", true).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InferenceError>(),
            Some(InferenceError::ModelUnavailable { .. })
        ));
        assert_eq!(manager.messages(), vec![ChatMessage::user("hi")]);
        assert_eq!(store.load().await, None);
    }
}
