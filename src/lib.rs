//! Offline chat assistant: a conversation core with pluggable storage and
//! inference, plus a line-oriented front end.

pub mod catalog;
pub mod config;
pub mod download;
pub mod events;
pub mod llm;
pub mod session;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use catalog::ModelCard;
pub use config::Config;
pub use events::{AppEvent, ChatMessage, ConversationSnapshot};
pub use llm::{InferenceEngine, InferenceError, LocalModelManager};
pub use session::ConversationManager;
pub use storage::{FileSnapshotStore, SnapshotStore};
