//! Line-oriented chat loop over any async reader and writer.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::catalog;
use crate::events::AppEvent;
use crate::ui::conversation::{
    ChatViewModel, ParsedCommand, SlashCommand, describe_model, get_help_text,
    parse_slash_command, render_history, render_message,
};

const WRAP_WIDTH: usize = 80;

/// Run the chat until `/bye` or end of input
pub async fn run<R, W>(view_model: &ChatViewModel, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    print_banner(view_model, out)?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            match parse_slash_command(line) {
                Some(command) => {
                    if !handle_command(view_model, command, out).await? {
                        break;
                    }
                }
                None => writeln!(out, "Unknown command: {}. Type /help for the list.", line)?,
            }
            continue;
        }

        send_prompt(view_model, line, out).await?;
    }

    writeln!(out, "Bye!")?;
    Ok(())
}

fn print_banner<W: Write>(view_model: &ChatViewModel, out: &mut W) -> Result<()> {
    let state = view_model.state();
    writeln!(
        out,
        "Chatting with {} (memory {}). Type /help for commands.",
        state.selected_model.display_name,
        if state.is_memory_enabled { "on" } else { "off" }
    )?;
    if !state.messages.is_empty() {
        writeln!(out, "Restored {} earlier messages.", state.messages.len())?;
    }
    Ok(())
}

async fn send_prompt<W: Write>(view_model: &ChatViewModel, prompt: &str, out: &mut W) -> Result<()> {
    view_model
        .handle_event(AppEvent::UpdateInput {
            text: prompt.to_string(),
        })
        .await?;
    view_model.handle_event(AppEvent::Send).await?;

    match view_model.finish_pending().await {
        Some(Ok(reply)) => {
            let name = view_model.state().selected_model.display_name;
            for line in render_message(&reply, &name, WRAP_WIDTH) {
                writeln!(out, "{}", line)?;
            }
        }
        Some(Err(e)) => {
            writeln!(out, "Send failed: {}", e)?;
            writeln!(out, "Your message is kept in the history.")?;
        }
        None => {}
    }
    Ok(())
}

/// Returns false when the chat should end
async fn handle_command<W: Write>(
    view_model: &ChatViewModel,
    command: ParsedCommand,
    out: &mut W,
) -> Result<bool> {
    match command.command {
        SlashCommand::Models => {
            let selected = view_model.state().selected_model;
            for (i, card) in catalog::featured_models().iter().enumerate() {
                let marker = if card.id == selected.id { "*" } else { " " };
                writeln!(out, "{} {}. {}", marker, i + 1, describe_model(card))?;
            }
        }
        SlashCommand::Model => match command.model_target() {
            Some((card, clear_history)) => {
                let outcome = view_model
                    .handle_event(AppEvent::SwitchModel {
                        card,
                        clear_history,
                    })
                    .await;
                let name = view_model.state().selected_model.display_name;
                writeln!(out, "Switched to {}.", name)?;
                match outcome {
                    Ok(()) if clear_history => writeln!(out, "Conversation cleared.")?,
                    Ok(()) => {}
                    Err(e) => writeln!(out, "Could not clear the conversation: {:#}", e)?,
                }
            }
            None => writeln!(out, "Usage: /model <number|id> [--clear]")?,
        },
        SlashCommand::Memory => match (command.memory_target(), command.argument()) {
            (Some(enabled), _) => {
                view_model
                    .handle_event(AppEvent::ToggleMemory { enabled })
                    .await?;
                writeln!(out, "Memory {}.", if enabled { "on" } else { "off" })?;
            }
            (None, None) => {
                let enabled = view_model.state().is_memory_enabled;
                writeln!(out, "Memory is {}.", if enabled { "on" } else { "off" })?;
            }
            (None, Some(_)) => writeln!(out, "Usage: /memory [on|off]")?,
        },
        SlashCommand::Clear => {
            match view_model.handle_event(AppEvent::ClearConversation).await {
                Ok(()) => writeln!(out, "Conversation cleared.")?,
                Err(e) => writeln!(out, "Could not clear the conversation: {:#}", e)?,
            }
        }
        SlashCommand::History => {
            let name = view_model.state().selected_model.display_name;
            let messages = view_model.manager().messages();
            write!(out, "{}", render_history(&messages, &name, WRAP_WIDTH))?;
        }
        SlashCommand::Help => writeln!(out, "{}", get_help_text())?,
        SlashCommand::Bye => return Ok(false),
    }
    Ok(true)
}
