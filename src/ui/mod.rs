//! Terminal chat screen

pub mod conversation;

use crate::config::Config;
use crate::events::TuiEvent;
use crate::memory::MemoryStore;
use crate::scheduler::{Tick, TokioScheduler};
use anyhow::{Context, Result};
use conversation::{ConversationAction, ConversationManager};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

type ChatTerminal = Terminal<CrosstermBackend<io::Stdout>>;

/// Redraw cadence for the typing indicator animation
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Run the chat screen until the user leaves
pub async fn run_chat(config: Config, memories: MemoryStore) -> Result<()> {
    let (scheduler, tick_rx) = TokioScheduler::new();
    let mut manager = ConversationManager::new(&config, scheduler, memories);

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut manager, tick_rx).await;
    restore_terminal(&mut terminal)?;

    result
}

fn setup_terminal() -> Result<ChatTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_loop(
    terminal: &mut ChatTerminal,
    manager: &mut ConversationManager<TokioScheduler>,
    mut tick_rx: mpsc::UnboundedReceiver<Tick>,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        terminal.draw(|frame| manager.render(frame.size(), frame.buffer_mut()))?;

        let event = tokio::select! {
            Some(tick) = tick_rx.recv() => TuiEvent::Tick(tick),
            maybe_event = input.next() => match maybe_event {
                Some(Ok(event)) => match into_tui_event(event) {
                    Some(event) => event,
                    None => continue,
                },
                Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                None => return Ok(()),
            },
            _ = frames.tick() => continue,
        };

        match event {
            TuiEvent::Tick(tick) => manager.handle_tick(tick),
            TuiEvent::Key(key) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    tracing::info!("chat closed");
                    return Ok(());
                }
            }
            TuiEvent::Paste(text) => manager.handle_paste(&text),
            TuiEvent::Resize(width, height) => {
                tracing::debug!(width, height, "terminal resized");
            }
        }
    }
}

fn into_tui_event(event: Event) -> Option<TuiEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(TuiEvent::Key(key)),
        Event::Paste(text) => Some(TuiEvent::Paste(text)),
        Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
        _ => None,
    }
}
