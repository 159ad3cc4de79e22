//! Plain-text rendering of the conversation

use crate::catalog::ModelCard;
use crate::events::ChatMessage;

/// One-line summary of a model card
pub fn describe_model(card: &ModelCard) -> String {
    format!(
        "{} [{}, {:.1} GB, {} tokens] - {}",
        card.display_name, card.quantization, card.size_gb, card.context_length, card.description
    )
}

/// Render the whole conversation, one block per message
pub fn render_history(messages: &[ChatMessage], assistant_name: &str, width: usize) -> String {
    if messages.is_empty() {
        return "No messages yet. Type a prompt to start.\n".to_string();
    }

    let mut out = String::new();
    for message in messages {
        for line in render_message(message, assistant_name, width) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Render a single message into lines: a header, then indented wrapped text
pub fn render_message(message: &ChatMessage, assistant_name: &str, width: usize) -> Vec<String> {
    let header = match message {
        ChatMessage::User { .. } => "You:".to_string(),
        ChatMessage::Assistant { .. } => format!("{}:", assistant_name),
    };

    let mut lines = vec![header];
    for content_line in wrap_text(message.content(), width.saturating_sub(2)) {
        lines.push(format!("  {}", content_line));
    }
    lines
}

/// Wrap text to fit within the given width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line.push_str(word);
            } else if current_line.chars().count() + word.chars().count() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line.push_str(word);
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert_eq!(wrap_text("", 10), vec![String::new()]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
    }

    #[test]
    fn headers_name_the_speaker() {
        let lines = render_message(&ChatMessage::assistant("hello there"), "Phi-3 Mini (4K)", 40);
        assert_eq!(lines, vec!["Phi-3 Mini (4K):", "  hello there"]);

        let lines = render_message(&ChatMessage::user("hi"), "ignored", 40);
        assert_eq!(lines[0], "You:");
    }

    #[test]
    fn empty_history_has_a_hint() {
        assert!(render_history(&[], "x", 80).starts_with("No messages yet"));
    }
}
