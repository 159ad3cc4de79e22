use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::catalog::{self, ModelCard};

/// Commands that can be invoked by starting a line with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// List the bundled models
    Models,
    /// Switch to a different model
    Model,
    /// Turn conversation memory on or off
    Memory,
    /// Start over with an empty conversation
    Clear,
    /// Print the conversation so far
    History,
    /// Show help
    Help,
    /// Exit the chat
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Model picked by `/model <n|id> [--clear]`, and whether to clear history.
    /// `n` is the 1-based position in the catalog.
    pub fn model_target(&self) -> Option<(ModelCard, bool)> {
        if self.command != SlashCommand::Model {
            return None;
        }

        let mut selector = None;
        let mut clear_history = false;
        for part in self.argument()?.split_whitespace() {
            match part {
                "--clear" | "-c" => clear_history = true,
                other if selector.is_none() => selector = Some(other),
                _ => return None,
            }
        }

        let selector = selector?;
        let card = match selector.parse::<usize>() {
            Ok(n) if n >= 1 => catalog::featured_models().get(n - 1),
            Ok(_) => None,
            Err(_) => catalog::find_model(selector),
        }?;
        Some((card.clone(), clear_history))
    }

    /// Requested memory state for `/memory on|off`
    pub fn memory_target(&self) -> Option<bool> {
        if self.command != SlashCommand::Memory {
            return None;
        }

        match self.argument()?.trim().to_lowercase().as_str() {
            "on" | "true" | "yes" => Some(true),
            "off" | "false" | "no" => Some(false),
            _ => None,
        }
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Models => "list the bundled models",
            SlashCommand::Model => "switch model: /model <number|id> [--clear]",
            SlashCommand::Memory => "show or set conversation memory: /memory [on|off]",
            SlashCommand::Clear => "clear the conversation and its saved copy",
            SlashCommand::History => "print the conversation so far",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the chat",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Alternative spellings accepted by [`parse_slash_command`]
const COMMAND_ALIASES: &[(&str, SlashCommand)] = &[
    ("q", SlashCommand::Bye),
    ("quit", SlashCommand::Bye),
    ("exit", SlashCommand::Bye),
    ("m", SlashCommand::Model),
    ("switch", SlashCommand::Model),
    ("reset", SlashCommand::Clear),
    ("new", SlashCommand::Clear),
    ("h", SlashCommand::Help),
    ("?", SlashCommand::Help),
];

/// Return all built-in commands paired with their command string.
pub fn built_in_slash_commands() -> Vec<(&'static str, SlashCommand)> {
    SlashCommand::iter().map(|c| (c.command(), c)).collect()
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let tail: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| {
        let head = head.to_lowercase();
        COMMAND_ALIASES
            .iter()
            .find(|(alias, _)| *alias == head)
            .map(|(_, command)| *command)
    })?;

    let argument = if tail.is_empty() {
        None
    } else {
        Some(tail.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for (command_str, command) in built_in_slash_commands() {
        help.push_str(&format!("/{} - {}\n", command_str, command.description()));
    }

    help.push_str("\nAliases:");
    for command in SlashCommand::iter() {
        let aliases: Vec<String> = COMMAND_ALIASES
            .iter()
            .filter(|(_, target)| *target == command)
            .map(|(alias, _)| format!("/{}", alias))
            .collect();
        if !aliases.is_empty() {
            help.push_str(&format!("\n  {} for /{}", aliases.join(", "), command.command()));
        }
    }
    help.push_str("\nAnything else you type is sent to the selected model.");

    help
}
