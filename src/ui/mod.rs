pub mod conversation;
pub mod repl;
