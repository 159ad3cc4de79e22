use serde::{Deserialize, Serialize};

use crate::catalog::ModelCard;

/// User intents forwarded from the front end into the view-model
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Replace the pending input text
    UpdateInput { text: String },

    /// Send the pending input as a prompt
    Send,

    /// Switch to a different model, optionally starting over
    SwitchModel { card: ModelCard, clear_history: bool },

    /// Turn conversation persistence on or off
    ToggleMemory { enabled: bool },

    /// Drop the conversation and its saved copy
    ClearConversation,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatMessage {
    User { content: String },
    Assistant { content: String },
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatMessage::User { content } | ChatMessage::Assistant { content } => content,
        }
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, ChatMessage::Assistant { .. })
    }
}

/// Durable projection of the conversation: which model, and what was said
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub model_id: String,
    pub messages: Vec<ChatMessage>,
}
