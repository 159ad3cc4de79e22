//! Conversation front end: intents, commands and text rendering

pub mod commands;
pub mod history;
pub mod view_model;

pub use commands::{ParsedCommand, SlashCommand, get_help_text, parse_slash_command};
pub use history::{describe_model, render_history, render_message};
pub use view_model::{ChatUiState, ChatViewModel};
