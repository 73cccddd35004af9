use crate::config::Config;
use crate::events::ConversationLog;
use crate::memory::{format_relative_date, MemoryCategory, MemoryStore};
use crate::scheduler::{Scheduler, Tick};
use crate::streaming::ReplyController;
use crate::ui::conversation::composer::ConversationResult;
use crate::ui::conversation::{
    get_help_text, ConversationComposer, ConversationHistory, ParsedCommand, SlashCommand, TypingIndicator,
};
use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use std::str::FromStr;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Wires the composer, the reply controller and the memory store into one chat screen
pub struct ConversationManager<S: Scheduler> {
    controller: ReplyController<ConversationHistory, S>,
    composer: ConversationComposer,
    typing: TypingIndicator,
    memories: MemoryStore,
}

impl<S: Scheduler> ConversationManager<S> {
    pub fn new(config: &Config, scheduler: S, memories: MemoryStore) -> Self {
        let history = ConversationHistory::new(config.ui.max_messages, config.ui.assistant_name.clone());

        Self {
            controller: ReplyController::new(config.streaming.clone(), history, scheduler),
            composer: ConversationComposer::new(format!("Message {}...", config.ui.assistant_name)),
            typing: TypingIndicator::new(config.ui.assistant_name.clone()),
            memories,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        match self.composer.handle_key(key) {
            ConversationResult::Submitted(input) => {
                self.handle_input(&input);
                ConversationAction::None
            }
            ConversationResult::Command(command) => self.handle_slash_command(command),
            ConversationResult::StopRequested => {
                self.stop_generation();
                ConversationAction::None
            }
            ConversationResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.composer.paste(text);
    }

    /// Send a prompt to the reply controller
    pub fn handle_input(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            return;
        }

        if let Err(err) = self.controller.submit(input) {
            self.history_mut().add_system_message(err.to_string());
        } else {
            self.typing.restart();
        }
        self.sync_generating();
    }

    /// Forward a timer tick to the reply controller
    pub fn handle_tick(&mut self, tick: Tick) {
        let was_generating = self.controller.is_generating();
        self.controller.handle_tick(tick);
        self.after_reply_step(was_generating);
    }

    pub fn stop_generation(&mut self) {
        let was_generating = self.controller.is_generating();
        self.controller.cancel();
        self.after_reply_step(was_generating);
    }

    pub fn history(&self) -> &ConversationHistory {
        self.controller.log()
    }

    fn history_mut(&mut self) -> &mut ConversationHistory {
        self.controller.log_mut()
    }

    pub fn is_generating(&self) -> bool {
        self.controller.is_generating()
    }

    fn sync_generating(&mut self) {
        let generating = self.controller.is_generating();
        self.composer.set_generating(generating);
    }

    /// Once a reply is finalized, remember what it was tagged with
    fn after_reply_step(&mut self, was_generating: bool) {
        self.sync_generating();
        if !was_generating || self.controller.is_generating() {
            return;
        }

        let tags = match self.history().last_message() {
            Some(message) if !message.is_user => message.memory_tags.clone().unwrap_or_default(),
            _ => return,
        };
        if tags.is_empty() {
            return;
        }

        self.memories.add(
            MemoryCategory::Conversations,
            format!("Talked about {}", tags.join(", ")),
            "chat",
        );
        tracing::info!(tags = ?tags, "reply remembered");
        self.history_mut()
            .add_system_message(format!("🧠 Remembered: {}", tags.join(", ")));
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        if self.is_generating() && !command.command.available_during_streaming() {
            self.history_mut().add_system_message(format!(
                "/{} is not available while a reply is being generated",
                command.command.command()
            ));
            return ConversationAction::None;
        }

        match command.command {
            SlashCommand::Stop => {
                self.stop_generation();
                ConversationAction::None
            }
            SlashCommand::Clear => {
                self.history_mut().clear();
                ConversationAction::None
            }
            SlashCommand::Memories => {
                let listing = self.memory_listing(command.argument());
                self.history_mut().add_system_message(listing);
                ConversationAction::None
            }
            SlashCommand::Forget => {
                let notice = self.forget_memory(command.argument());
                self.history_mut().add_system_message(notice);
                ConversationAction::None
            }
            SlashCommand::Help => {
                let help_text = get_help_text();
                self.history_mut().add_system_message(help_text);
                ConversationAction::None
            }
            SlashCommand::Bye => {
                self.stop_generation();
                ConversationAction::Exit
            }
        }
    }

    fn forget_memory(&mut self, id: Option<&str>) -> String {
        let Some(id) = id else {
            return "Usage: /forget <id>. Use /memories to see ids.".to_string();
        };

        if self.memories.remove(id) {
            tracing::info!(memory_id = %id, "memory forgotten");
            format!("🧹 Forgot memory {}", id)
        } else {
            format!("No memory with id '{}'", id)
        }
    }

    fn memory_listing(&self, category: Option<&str>) -> String {
        let filter = match category.map(MemoryCategory::from_str) {
            Some(Ok(category)) => Some(category),
            Some(Err(_)) => {
                return format!(
                    "Unknown memory category '{}'. Try: about, preferences, conversations",
                    category.unwrap_or_default()
                );
            }
            None => None,
        };

        let now = chrono::Utc::now();
        let mut listing = String::from("What I remember:\n");
        for (category, memories) in self.memories.grouped() {
            if filter.is_some_and(|wanted| wanted != category) {
                continue;
            }
            listing.push_str(&format!("\n{} {}\n", category.icon(), category.display_name()));
            if memories.is_empty() {
                listing.push_str("  (nothing yet)\n");
            }
            for memory in memories {
                listing.push_str(&format!(
                    "  • {} ({}) [{}]\n",
                    memory.text,
                    format_relative_date(memory.date, now),
                    memory.id
                ));
            }
        }
        listing
    }

    /// Render the chat screen
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // History
                Constraint::Length(1), // Typing indicator
                Constraint::Length(3), // Composer
            ])
            .split(area);

        self.history().render(chunks[0], buf);

        if self.is_generating() && self.controller.streaming_message().is_none() {
            self.typing.render(chunks[1], buf);
        }

        self.composer.render(chunks[2], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::{CAREER_REPLY, GREETING_REPLY};
    use crate::scheduler::manual::ManualScheduler;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn manager() -> (ConversationManager<ManualScheduler>, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let manager = ConversationManager::new(&Config::default(), scheduler.clone(), MemoryStore::default());
        (manager, scheduler)
    }

    fn send(manager: &mut ConversationManager<ManualScheduler>, text: &str) -> ConversationAction {
        manager.handle_paste(text);
        manager.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    fn drain(manager: &mut ConversationManager<ManualScheduler>, scheduler: &ManualScheduler) {
        while let Some(tick) = scheduler.next_tick() {
            manager.handle_tick(tick);
        }
    }

    #[test]
    fn typed_prompt_gets_streamed_reply() {
        let (mut manager, scheduler) = manager();
        send(&mut manager, "hello");
        assert!(manager.is_generating());

        drain(&mut manager, &scheduler);

        let texts: Vec<_> = manager.history().messages().map(|m| m.text.clone()).collect();
        assert_eq!(texts, ["hello".to_string(), GREETING_REPLY.to_string()]);
        assert!(!manager.is_generating());
    }

    #[test]
    fn tagged_reply_is_remembered() {
        let (mut manager, scheduler) = manager();
        send(&mut manager, "my company");
        drain(&mut manager, &scheduler);

        assert_eq!(manager.history().last_message().unwrap().text, CAREER_REPLY);
        let remembered = manager.memories.by_category(MemoryCategory::Conversations);
        assert_eq!(remembered.len(), 1);
        assert_eq!(remembered[0].text, "Talked about career");
    }

    #[test]
    fn escape_stops_generation() {
        let (mut manager, scheduler) = manager();
        send(&mut manager, "hello");
        manager.handle_tick(scheduler.next_tick().unwrap());
        manager.handle_tick(scheduler.next_tick().unwrap());

        manager.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));

        assert!(!manager.is_generating());
        assert_eq!(manager.history().last_message().unwrap().text, "H");
        assert_eq!(scheduler.next_tick(), None);
    }

    #[test]
    fn clear_is_refused_while_generating() {
        let (mut manager, scheduler) = manager();
        send(&mut manager, "hello");
        send(&mut manager, "/clear");
        assert_eq!(manager.history().message_count(), 1);

        drain(&mut manager, &scheduler);
        send(&mut manager, "/clear");
        assert_eq!(manager.history().message_count(), 0);
    }

    #[test]
    fn memories_command_lists_requested_category() {
        let scheduler = ManualScheduler::new();
        let manager = ConversationManager::new(&Config::default(), scheduler, MemoryStore::with_seed_data());
        let listing = manager.memory_listing(Some("preferences"));
        assert!(listing.contains("Prefers detailed technical discussions"));
        assert!(!listing.contains("Building AiRA"));

        let listing = manager.memory_listing(Some("hobbies"));
        assert!(listing.starts_with("Unknown memory category 'hobbies'"));
    }

    #[test]
    fn forget_removes_listed_memory() {
        let scheduler = ManualScheduler::new();
        let mut manager = ConversationManager::new(&Config::default(), scheduler, MemoryStore::with_seed_data());
        assert!(manager.memory_listing(Some("preferences")).contains("[3]"));

        send(&mut manager, "/forget 3");
        assert_eq!(manager.memories.all().len(), 5);
        assert!(!manager.memory_listing(None).contains("Prefers detailed technical discussions"));

        send(&mut manager, "/forget 3");
        send(&mut manager, "/forget");
        assert_eq!(manager.memories.all().len(), 5);
    }

    #[test]
    fn bye_exits() {
        let (mut manager, _scheduler) = manager();
        assert_eq!(send(&mut manager, "/bye"), ConversationAction::Exit);
    }
}
