use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::Instant;

/// "AiRA is thinking..." line shown during the think-delay, before any text streams in
pub struct TypingIndicator {
    assistant_name: String,
    started: Instant,
}

impl TypingIndicator {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
            started: Instant::now(),
        }
    }

    /// Restart the dot animation
    pub fn restart(&mut self) {
        self.started = Instant::now();
    }

    fn dots(&self) -> &'static str {
        match (self.started.elapsed().as_millis() / 300) % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }
}

impl Widget for &TypingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let indicator = Line::from(vec![
            Span::styled("✨ ", Style::default().fg(Color::Magenta)),
            Span::styled(
                format!("{} is thinking", self.assistant_name),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}
