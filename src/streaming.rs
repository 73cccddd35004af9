use crate::config::{IncrementMode, StreamingConfig};
use crate::error::ChatError;
use crate::events::{ConversationLog, ConversationMessage};
use crate::responses::{select_response, ResponseTemplate};
use crate::scheduler::{Scheduler, Tick, TickKind, TimerHandle};
use uuid::Uuid;

/// Reveal cursor over a reply's full text
///
/// Increments are stored as byte offsets into `full_text`, so whatever has
/// been revealed is always `&full_text[..ends[cursor - 1]]`.
#[derive(Debug, Clone)]
pub struct RevealState {
    full_text: String,
    ends: Vec<usize>,
    cursor: usize,
}

impl RevealState {
    pub fn new(full_text: &str, mode: IncrementMode) -> Self {
        let ends = match mode {
            IncrementMode::Char => full_text
                .char_indices()
                .map(|(start, c)| start + c.len_utf8())
                .collect(),
            IncrementMode::Word => word_ends(full_text),
        };

        Self {
            full_text: full_text.to_string(),
            ends,
            cursor: 0,
        }
    }

    /// Next increment to reveal, advancing the cursor
    pub fn next_increment(&mut self) -> Option<&str> {
        let end = *self.ends.get(self.cursor)?;
        let start = self.revealed_len();
        self.cursor += 1;
        Some(&self.full_text[start..end])
    }

    /// Text revealed so far, always a prefix of the full text
    pub fn revealed(&self) -> &str {
        &self.full_text[..self.revealed_len()]
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.ends.len()
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    #[cfg(test)]
    pub fn total_increments(&self) -> usize {
        self.ends.len()
    }

    fn revealed_len(&self) -> usize {
        match self.cursor {
            0 => 0,
            n => self.ends[n - 1],
        }
    }
}

/// End offset of every word. Each increment carries the whitespace in front
/// of its word; the last one also takes any trailing whitespace.
fn word_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut in_word = false;

    for (index, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                ends.push(index);
            }
            in_word = false;
        } else {
            in_word = true;
        }
    }
    if in_word {
        ends.push(text.len());
    }

    match ends.last_mut() {
        Some(last) => *last = text.len(),
        // whitespace-only text still reveals in one step
        None if !text.is_empty() => ends.push(text.len()),
        None => {}
    }
    ends
}

/// Reply currently occupying the streaming slot
struct ActiveStream {
    message: ConversationMessage,
    reveal: RevealState,
}

enum ReplyPhase {
    Idle,
    /// Prompt accepted, waiting out the think-delay
    Thinking { reply_id: Uuid, prompt: String },
    Streaming(ActiveStream),
}

/// Drives simulated assistant replies: think-delay, incremental reveal, finalize or cancel.
///
/// The controller is the only writer of the conversation log it owns. Timers
/// come from the injected [`Scheduler`]; their ticks are handed back through
/// [`ReplyController::handle_tick`].
pub struct ReplyController<L: ConversationLog, S: Scheduler> {
    config: StreamingConfig,
    log: L,
    scheduler: S,
    phase: ReplyPhase,
    timer: Option<TimerHandle>,
}

impl<L: ConversationLog, S: Scheduler> ReplyController<L, S> {
    pub fn new(config: StreamingConfig, log: L, scheduler: S) -> Self {
        Self {
            config,
            log,
            scheduler,
            phase: ReplyPhase::Idle,
            timer: None,
        }
    }

    /// Accept a prompt: log it as a user message and schedule the reply.
    ///
    /// The caller trims and drops empty input. Rejected while a reply is
    /// pending or streaming.
    pub fn submit(&mut self, prompt: &str) -> Result<(), ChatError> {
        if self.is_generating() {
            tracing::warn!("submit rejected, reply already in progress");
            return Err(ChatError::ReplyInProgress);
        }

        self.log.append(ConversationMessage::user(prompt));

        let reply_id = Uuid::new_v4();
        self.replace_timer(
            self.scheduler
                .schedule_once(self.config.think_delay(), Tick::think_delay(reply_id)),
        );
        self.phase = ReplyPhase::Thinking {
            reply_id,
            prompt: prompt.to_string(),
        };
        self.log.set_generating(true);

        tracing::debug!(reply_id = %reply_id, "prompt accepted, thinking");
        Ok(())
    }

    /// Install a new streaming reply for `template` and start revealing it.
    ///
    /// Whatever occupied the streaming slot before is finalized first, so at
    /// most one message is ever streaming.
    pub fn begin_streaming(&mut self, template: ResponseTemplate) {
        if matches!(self.phase, ReplyPhase::Streaming(_)) {
            tracing::warn!("streaming slot replaced before completion");
            self.cancel();
        }
        self.clear_timer();

        let message = ConversationMessage::streaming_reply(template.memory_tags);
        let reveal = RevealState::new(&template.full_text, self.config.increment_mode);
        let message_id = message.id;

        self.log.set_streaming(Some(&message));
        self.log.set_generating(true);
        self.phase = ReplyPhase::Streaming(ActiveStream { message, reveal });

        tracing::info!(message_id = %message_id, "reply streaming started");

        if self.active_reveal_complete() {
            self.finish_stream();
            return;
        }

        self.replace_timer(
            self.scheduler
                .schedule_repeating(self.config.increment_interval(), Tick::increment(message_id)),
        );
    }

    /// Stop the current reply, keeping whatever has been revealed so far.
    /// Does nothing when no reply is pending or streaming.
    pub fn cancel(&mut self) {
        self.clear_timer();

        match std::mem::replace(&mut self.phase, ReplyPhase::Idle) {
            ReplyPhase::Idle => {}
            ReplyPhase::Thinking { reply_id, .. } => {
                tracing::info!(reply_id = %reply_id, "reply cancelled before streaming");
                self.log.set_generating(false);
            }
            ReplyPhase::Streaming(active) => {
                tracing::info!(
                    message_id = %active.message.id,
                    revealed = active.reveal.revealed().len(),
                    "reply cancelled"
                );
                self.commit(active.message);
            }
        }
    }

    /// Feed a timer tick back in. Ticks for replies that are no longer active are ignored.
    pub fn handle_tick(&mut self, tick: Tick) {
        let expected = match &self.phase {
            ReplyPhase::Thinking { reply_id, .. } => Some((*reply_id, TickKind::ThinkDelayElapsed)),
            ReplyPhase::Streaming(active) => Some((active.message.id, TickKind::Increment)),
            ReplyPhase::Idle => None,
        };

        if expected != Some((tick.reply_id, tick.kind)) {
            tracing::trace!(reply_id = %tick.reply_id, kind = ?tick.kind, "stale tick ignored");
            return;
        }

        match tick.kind {
            TickKind::ThinkDelayElapsed => self.start_reply(),
            TickKind::Increment => self.reveal_next(),
        }
    }

    /// Whether a reply is pending or streaming
    pub fn is_generating(&self) -> bool {
        !matches!(self.phase, ReplyPhase::Idle)
    }

    /// The reply in the streaming slot, if any
    pub fn streaming_message(&self) -> Option<&ConversationMessage> {
        match &self.phase {
            ReplyPhase::Streaming(active) => Some(&active.message),
            _ => None,
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut L {
        &mut self.log
    }

    fn start_reply(&mut self) {
        let prompt = match std::mem::replace(&mut self.phase, ReplyPhase::Idle) {
            ReplyPhase::Thinking { prompt, .. } => prompt,
            other => {
                self.phase = other;
                return;
            }
        };
        self.clear_timer();
        self.begin_streaming(select_response(&prompt));
    }

    fn reveal_next(&mut self) {
        let ReplyPhase::Streaming(active) = &mut self.phase else {
            return;
        };

        if let Some(increment) = active.reveal.next_increment() {
            active.message.push_text(increment);
            self.log.set_streaming(Some(&active.message));
        }

        if self.active_reveal_complete() {
            self.finish_stream();
        }
    }

    fn active_reveal_complete(&self) -> bool {
        match &self.phase {
            ReplyPhase::Streaming(active) => active.reveal.is_complete(),
            _ => false,
        }
    }

    /// Natural completion: the finalized text is the template's full text
    fn finish_stream(&mut self) {
        self.clear_timer();
        if let ReplyPhase::Streaming(mut active) = std::mem::replace(&mut self.phase, ReplyPhase::Idle) {
            active.message.text = active.reveal.full_text().to_string();
            tracing::info!(message_id = %active.message.id, "reply complete");
            self.commit(active.message);
        }
    }

    fn commit(&mut self, message: ConversationMessage) {
        self.log.set_streaming(None);
        self.log.append(message.finalize());
        self.log.set_generating(false);
    }

    fn replace_timer(&mut self, handle: TimerHandle) {
        self.clear_timer();
        self.timer = Some(handle);
    }

    fn clear_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.cancel();
        }
    }
}
