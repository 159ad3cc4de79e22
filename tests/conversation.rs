use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pixel_assistant::catalog::{self, ModelCard};
use pixel_assistant::download::FetchError;
use pixel_assistant::{
    ChatMessage, ConversationManager, ConversationSnapshot, FileSnapshotStore, InferenceEngine,
    InferenceError, SnapshotStore,
};

/// Keeps the snapshot in memory and counts writes
#[derive(Default)]
struct RecordingStore {
    current: Mutex<Option<ConversationSnapshot>>,
    saves: AtomicUsize,
}

impl RecordingStore {
    fn with(snapshot: ConversationSnapshot) -> Self {
        Self {
            current: Mutex::new(Some(snapshot)),
            saves: AtomicUsize::new(0),
        }
    }

    fn stored(&self) -> Option<ConversationSnapshot> {
        self.current.lock().unwrap().clone()
    }

    fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for RecordingStore {
    fn observe(&self) -> BoxStream<'static, Option<ConversationSnapshot>> {
        stream::iter(vec![self.stored()]).boxed()
    }

    async fn save(&self, snapshot: Option<&ConversationSnapshot>) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = snapshot.cloned();
        Ok(())
    }
}

/// Replies "Model X says: <prompt>"
struct ModelXEngine;

#[async_trait]
impl InferenceEngine for ModelXEngine {
    async fn ensure_ready(&self, _model: &ModelCard) -> Result<PathBuf, InferenceError> {
        Ok(PathBuf::from("model.litert"))
    }

    async fn generate_reply(
        &self,
        _model: &ModelCard,
        _history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, InferenceError> {
        Ok(format!("Model X says: {}", prompt))
    }
}

struct OfflineEngine;

#[async_trait]
impl InferenceEngine for OfflineEngine {
    async fn ensure_ready(&self, model: &ModelCard) -> Result<PathBuf, InferenceError> {
        Err(InferenceError::ModelUnavailable {
            model_id: model.id.clone(),
            source: FetchError::EmptyBody,
        })
    }

    async fn generate_reply(
        &self,
        model: &ModelCard,
        _history: &[ChatMessage],
        _prompt: &str,
    ) -> Result<String, InferenceError> {
        self.ensure_ready(model).await.map(|_| String::new())
    }
}

fn manager_with(store: &Arc<RecordingStore>) -> ConversationManager {
    ConversationManager::new(store.clone(), Arc::new(ModelXEngine))
}

#[tokio::test]
async fn first_send_matches_example() {
    let store = Arc::new(RecordingStore::default());
    let manager = manager_with(&store);
    manager.initialize().await;

    let reply = manager.send("hi", true).await.unwrap();

    let expected = vec![
        ChatMessage::user("hi"),
        ChatMessage::assistant("Model X says: hi"),
    ];
    assert_eq!(reply, expected[1]);
    assert_eq!(manager.messages(), expected);
    assert_eq!(
        store.stored(),
        Some(ConversationSnapshot {
            model_id: catalog::default_model().id.clone(),
            messages: expected,
        })
    );
}

#[tokio::test]
async fn persisted_list_tracks_memory_after_every_send() {
    let store = Arc::new(RecordingStore::default());
    let manager = manager_with(&store);

    for (i, prompt) in ["one", "two", "three", "four"].iter().enumerate() {
        if i == 2 {
            manager
                .select_model(catalog::featured_models()[1].clone(), false)
                .await
                .unwrap();
        }
        manager.send(prompt, true).await.unwrap();

        let saved = store.stored().unwrap();
        assert_eq!(saved.messages, manager.messages());
        assert_eq!(saved.model_id, manager.selected_model().id);
        assert_eq!(saved.messages.len(), (i + 1) * 2);
    }
    assert_eq!(store.save_count(), 4);
}

#[tokio::test]
async fn reset_always_empties_memory_and_store() {
    // from empty
    let store = Arc::new(RecordingStore::default());
    let manager = manager_with(&store);
    manager.reset().await.unwrap();
    assert!(manager.messages().is_empty());
    assert_eq!(store.stored(), None);

    // from a restored conversation
    let store = Arc::new(RecordingStore::with(ConversationSnapshot {
        model_id: catalog::featured_models()[2].id.clone(),
        messages: vec![ChatMessage::user("old")],
    }));
    let manager = manager_with(&store);
    manager.initialize().await;
    manager.send("new", true).await.unwrap();
    manager.reset().await.unwrap();
    assert!(manager.messages().is_empty());
    assert_eq!(store.stored(), None);
}

#[tokio::test]
async fn initialize_restores_messages_and_model() {
    let model = &catalog::featured_models()[2];
    let messages = vec![
        ChatMessage::user("a"),
        ChatMessage::assistant("b"),
        ChatMessage::user("c"),
    ];
    let store = Arc::new(RecordingStore::with(ConversationSnapshot {
        model_id: model.id.clone(),
        messages: messages.clone(),
    }));
    let manager = manager_with(&store);

    manager.initialize().await;

    assert_eq!(manager.messages(), messages);
    assert_eq!(&manager.selected_model(), model);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn unknown_saved_model_falls_back_to_first_entry() {
    let store = Arc::new(RecordingStore::with(ConversationSnapshot {
        model_id: "someone/retired-model".to_string(),
        messages: vec![ChatMessage::user("still here")],
    }));
    let manager = manager_with(&store);

    manager.initialize().await;

    assert_eq!(&manager.selected_model(), &catalog::featured_models()[0]);
    assert_eq!(manager.messages(), vec![ChatMessage::user("still here")]);
}

#[tokio::test]
async fn failed_inference_keeps_prompt_and_skips_save() {
    let store = Arc::new(RecordingStore::default());
    let manager = ConversationManager::new(store.clone(), Arc::new(OfflineEngine));

    let err = manager.send("hello?", true).await.unwrap_err();

    assert!(err.downcast_ref::<InferenceError>().is_some());
    assert_eq!(manager.messages(), vec![ChatMessage::user("hello?")]);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.stored(), None);
}

#[tokio::test]
async fn conversation_survives_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_memory.json");

    let first = ConversationManager::new(
        Arc::new(FileSnapshotStore::new(&path)),
        Arc::new(ModelXEngine),
    );
    first
        .select_model(catalog::featured_models()[1].clone(), false)
        .await
        .unwrap();
    first.send("remember me", true).await.unwrap();
    drop(first);

    let second = ConversationManager::new(
        Arc::new(FileSnapshotStore::new(&path)),
        Arc::new(ModelXEngine),
    );
    second.initialize().await;

    assert_eq!(second.selected_model().id, catalog::featured_models()[1].id);
    assert_eq!(
        second.messages(),
        vec![
            ChatMessage::user("remember me"),
            ChatMessage::assistant("Model X says: remember me"),
        ]
    );
}
