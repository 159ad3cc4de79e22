use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::catalog::{self, ModelCard};
use crate::events::{AppEvent, ChatMessage};
use crate::session::ConversationManager;

/// Everything the chat screen shows
#[derive(Debug, Clone, PartialEq)]
pub struct ChatUiState {
    pub input: String,
    pub messages: Vec<ChatMessage>,
    pub selected_model: ModelCard,
    pub is_sending: bool,
    pub is_memory_enabled: bool,
    pub last_error: Option<String>,
}

impl Default for ChatUiState {
    fn default() -> Self {
        Self {
            input: String::new(),
            messages: Vec::new(),
            selected_model: catalog::default_model().clone(),
            is_sending: false,
            is_memory_enabled: true,
            last_error: None,
        }
    }
}

type SendTask = JoinHandle<Result<ChatMessage, String>>;

/// Turns user intents into conversation operations and publishes UI state.
///
/// At most one send is in flight: starting a new one aborts the previous.
pub struct ChatViewModel {
    manager: Arc<ConversationManager>,
    state: Arc<watch::Sender<ChatUiState>>,
    send_task: Mutex<Option<SendTask>>,
    forwarder: JoinHandle<()>,
}

impl ChatViewModel {
    /// Restore the saved conversation and start mirroring it into the UI state
    pub async fn new(manager: Arc<ConversationManager>, memory_enabled: bool) -> Self {
        manager.initialize().await;

        let (state, _) = watch::channel(ChatUiState {
            messages: manager.messages(),
            selected_model: manager.selected_model(),
            is_memory_enabled: memory_enabled,
            ..ChatUiState::default()
        });
        let state = Arc::new(state);

        let mut history = manager.subscribe();
        let forward_state = Arc::clone(&state);
        let forwarder = tokio::spawn(async move {
            while history.changed().await.is_ok() {
                let messages = history.borrow_and_update().clone();
                forward_state.send_modify(|s| s.messages = messages);
            }
        });

        Self {
            manager,
            state,
            send_task: Mutex::new(None),
            forwarder,
        }
    }

    pub fn manager(&self) -> &Arc<ConversationManager> {
        &self.manager
    }

    pub fn state(&self) -> ChatUiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatUiState> {
        self.state.subscribe()
    }

    pub async fn handle_event(&self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::UpdateInput { text } => self.update_input(text),
            AppEvent::Send => {
                self.send_message();
            }
            AppEvent::SwitchModel {
                card,
                clear_history,
            } => self.change_model(card, clear_history).await?,
            AppEvent::ToggleMemory { enabled } => self.toggle_memory(enabled),
            AppEvent::ClearConversation => self.clear_conversation().await?,
        }
        Ok(())
    }

    pub fn update_input(&self, text: String) {
        self.state.send_modify(|s| s.input = text);
    }

    pub fn toggle_memory(&self, enabled: bool) {
        self.state.send_modify(|s| s.is_memory_enabled = enabled);
    }

    /// Switch models. The UI always shows the manager's selection afterwards,
    /// even when clearing the saved conversation failed.
    pub async fn change_model(&self, card: ModelCard, clear_history: bool) -> Result<()> {
        let outcome = self.manager.select_model(card, clear_history).await;
        let selected = self.manager.selected_model();
        self.state.send_modify(|s| s.selected_model = selected);
        outcome
    }

    pub async fn clear_conversation(&self) -> Result<()> {
        self.manager.reset().await
    }

    /// Send the pending input. Returns false when there was nothing to send.
    pub fn send_message(&self) -> bool {
        let prompt = self.state.borrow().input.clone();
        if prompt.trim().is_empty() {
            return false;
        }
        let persist = self.state.borrow().is_memory_enabled;

        let mut slot = self.send_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        self.state.send_modify(|s| {
            s.input.clear();
            s.is_sending = true;
            s.last_error = None;
        });

        let manager = Arc::clone(&self.manager);
        let state = Arc::clone(&self.state);
        *slot = Some(tokio::spawn(async move {
            let outcome = manager
                .send(&prompt, persist)
                .await
                .map_err(|e| format!("{:#}", e));
            if let Err(e) = &outcome {
                warn!("Send failed: {}", e);
            }
            state.send_modify(|s| {
                s.is_sending = false;
                s.last_error = outcome.as_ref().err().cloned();
            });
            outcome
        }));
        true
    }

    /// Wait for the in-flight send, if any, and return its outcome
    pub async fn finish_pending(&self) -> Option<Result<ChatMessage, String>> {
        let task = self
            .send_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()?;
        task.await.ok()
    }
}

impl Drop for ChatViewModel {
    fn drop(&mut self) {
        self.forwarder.abort();
        if let Some(task) = self
            .send_task
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
    }
}
