//! Conversation history display component

use crate::events::{ConversationLog, ConversationMessage};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::collections::VecDeque;

/// Out-of-band note shown in the history (help text, memory listings, errors)
#[derive(Debug, Clone)]
pub struct SystemNotice {
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
enum HistoryEntry {
    Message(ConversationMessage),
    Notice(SystemNotice),
}

/// Conversation log backing the chat screen
#[derive(Clone)]
pub struct ConversationHistory {
    entries: VecDeque<HistoryEntry>,
    max_messages: usize,
    streaming_message: Option<ConversationMessage>,
    is_generating: bool,
    assistant_name: String,
}

impl ConversationHistory {
    pub fn new(max_messages: usize, assistant_name: impl Into<String>) -> Self {
        Self {
            entries: VecDeque::new(),
            max_messages,
            streaming_message: None,
            is_generating: false,
            assistant_name: assistant_name.into(),
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);

        // Limit message count
        if self.entries.len() > self.max_messages {
            self.entries.pop_front();
        }
    }

    /// Add a system notice
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.push_entry(HistoryEntry::Notice(SystemNotice {
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }));
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.entries.clear();
        self.streaming_message = None;
    }

    /// Get message count, notices excluded
    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.entries.iter().filter_map(|entry| match entry {
            HistoryEntry::Message(message) => Some(message),
            HistoryEntry::Notice(_) => None,
        })
    }
}

impl ConversationLog for ConversationHistory {
    fn append(&mut self, message: ConversationMessage) {
        self.push_entry(HistoryEntry::Message(message));
    }

    fn last_message(&self) -> Option<&ConversationMessage> {
        self.entries.iter().rev().find_map(|entry| match entry {
            HistoryEntry::Message(message) => Some(message),
            HistoryEntry::Notice(_) => None,
        })
    }

    fn set_streaming(&mut self, message: Option<&ConversationMessage>) {
        self.streaming_message = message.cloned();
    }

    fn set_generating(&mut self, generating: bool) {
        self.is_generating = generating;
    }
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("💬 {}", self.assistant_name));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.entries.is_empty() && self.streaming_message.is_none() {
            // Show welcome message
            let welcome_lines = vec![
                Line::from(vec![Span::styled(
                    format!("Hi, I'm {} ✨", self.assistant_name),
                    Style::default().fg(Color::Magenta),
                )]),
                Line::from(vec![Span::raw("")]),
                Line::from(vec![Span::styled("Say hello below to start chatting.", Style::default().fg(Color::Gray))]),
                Line::from(vec![Span::raw("")]),
                Line::from(vec![Span::styled(
                    "Enter to send, Shift+Enter for a new line, Esc to stop a reply, /help for commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let width = inner_area.width.saturating_sub(2) as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for entry in self.entries.iter() {
            let mut lines = match entry {
                HistoryEntry::Message(message) => self.render_message(message, width, false),
                HistoryEntry::Notice(notice) => render_notice(notice, width),
            };
            all_lines.append(&mut lines);
            // spacing between messages
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        if let Some(ref streaming) = self.streaming_message {
            let mut streaming_lines = self.render_message(streaming, width, true);
            all_lines.append(&mut streaming_lines);
        }

        // Keep the newest lines in view
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);

        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

impl ConversationHistory {
    /// Render a single message into lines, with a cursor glyph while it streams
    fn render_message(&self, message: &ConversationMessage, width: usize, streaming: bool) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let (icon, name) = if message.is_user {
            ("👤", "You".to_string())
        } else {
            ("✨", self.assistant_name.clone())
        };
        let timestamp = message.created_at.format("%H:%M:%S").to_string();
        let mut header = vec![Span::styled(
            format!("{} {} {} {}", icon, name, timestamp, "─".repeat(12)),
            Style::default().fg(Color::DarkGray),
        )];
        if let Some(tags) = &message.memory_tags {
            for tag in tags {
                header.push(Span::styled(
                    format!(" #{}", tag),
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
                ));
            }
        }
        lines.push(Line::from(header));

        let style = if message.is_user {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::Green)
        };

        let content_lines = wrap_text(&message.text, width);
        let last = content_lines.len().saturating_sub(1);
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let mut spans = vec![Span::raw("  "), Span::styled(content_line, style)];
            if streaming && i == last {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(spans));
        }

        lines
    }
}

fn render_notice(notice: &SystemNotice, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![Span::styled(
        format!("⚙️ {} {}", notice.timestamp.format("%H:%M:%S"), "─".repeat(12)),
        Style::default().fg(Color::DarkGray),
    )])];

    for raw_line in notice.content.lines() {
        for content_line in wrap_text(raw_line, width) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, Style::default().fg(Color::Yellow)),
            ]));
        }
    }

    lines
}

/// Wrap text to fit within the given width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let current_width = current_line.chars().count();
        let word_width = word.chars().count();
        if current_width == 0 || current_width + word_width + 1 <= width {
            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line.push_str(word);
        }
    }

    if !current_line.is_empty() {
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
    fn last_message_skips_notices() {
        let mut history = ConversationHistory::new(10, "AiRA");
        history.append(ConversationMessage::user("hi"));
        history.add_system_message("help text");

        assert_eq!(history.last_message().unwrap().text, "hi");
        assert_eq!(history.message_count(), 1);
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let mut history = ConversationHistory::new(2, "AiRA");
        for text in ["one", "two", "three"] {
            history.append(ConversationMessage::user(text));
        }
        let texts: Vec<_> = history.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["two", "three"]);
    }

    #[test]
    fn streaming_slot_is_separate_from_log() {
        let mut history = ConversationHistory::new(10, "AiRA");
        let mut reply = ConversationMessage::streaming_reply(None);
        reply.text.push_str("Hey");
        history.set_streaming(Some(&reply));
        history.set_generating(true);

        assert_eq!(history.message_count(), 0);
        assert_eq!(history.streaming_message.as_ref().unwrap().text, "Hey");
        assert!(history.is_generating);

        history.set_streaming(None);
        assert!(history.streaming_message.is_none());
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(wrap_text("supercalifragilistic", 5), vec!["supercalifragilistic"]);
    }

    #[test]
    fn renders_streaming_cursor() {
        let mut history = ConversationHistory::new(10, "AiRA");
        let mut reply = ConversationMessage::streaming_reply(Some(vec!["career".to_string()]));
        reply.text.push_str("I remember");
        history.set_streaming(Some(&reply));

        let area = Rect::new(0, 0, 40, 8);
        let mut buf = Buffer::empty(area);
        (&history).render(area, &mut buf);

        let rendered: String = buf.content.iter().map(|cell| cell.symbol()).collect();
        assert!(rendered.contains("#career"));
        assert!(rendered.contains("I remember▋"));
    }
}
