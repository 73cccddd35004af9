mod config;
mod error;
mod events;
mod memory;
mod responses;
mod scheduler;
mod streaming;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, IncrementMode};
use memory::{format_relative_date, MemoryCategory, MemoryStore};
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aira")]
#[command(version = "0.1.0")]
#[command(about = "Chat with AiRA, a companion that remembers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start chatting (the default)
    Chat {
        /// Reveal replies word by word instead of character by character
        #[arg(long)]
        word_mode: bool,
    },
    /// Show what AiRA remembers about you
    Memories {
        /// Only show one category (about, preferences, conversations)
        #[arg(long)]
        category: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the configuration to ~/.aira/config.toml
        #[arg(long)]
        init: bool,
    },
}

/// Logs go to a file because the chat screen owns the terminal
fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_env("AIRA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
        .context("Failed to open log file")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

fn print_memories(category: Option<&str>, json: bool) -> Result<()> {
    let store = MemoryStore::with_seed_data();
    let filter = category
        .map(|name| {
            MemoryCategory::from_str(name)
                .map_err(|_| anyhow::anyhow!("Unknown memory category '{}'", name))
        })
        .transpose()?;

    if json {
        let memories: Vec<_> = store
            .all()
            .iter()
            .filter(|memory| filter.is_none_or(|wanted| memory.category == wanted))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&memories).context("Failed to serialize memories")?
        );
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("🧠 What AiRA remembers:");
    for (category, memories) in store.grouped() {
        if filter.is_some_and(|wanted| wanted != category) {
            continue;
        }
        println!();
        println!("{} {}", category.icon(), category.display_name());
        for memory in memories {
            println!("  • {} ({})", memory.text, format_relative_date(memory.date, now));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    init_logging(&config)?;

    match cli.command {
        None => {
            tracing::info!("starting chat");
            ui::run_chat(config, MemoryStore::with_seed_data()).await
        }
        Some(Commands::Chat { word_mode }) => {
            if word_mode {
                config.streaming.increment_mode = IncrementMode::Word;
            }
            tracing::info!(mode = ?config.streaming.increment_mode, "starting chat");
            ui::run_chat(config, MemoryStore::with_seed_data()).await
        }
        Some(Commands::Memories { category, json }) => print_memories(category.as_deref(), json),
        Some(Commands::Config { init }) => {
            if init {
                config.save()?;
                println!("✅ Wrote {}", config.aira_home.join("config.toml").display());
            }
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
