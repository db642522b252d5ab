//! Replay a recorded event history and print the resulting chat messages.
//!
//! Usage:
//!   cargo run --example replay -- history.json
//!   cargo run --example replay -- history.json --system "You are helpful." --cache --vision
//!   RUST_LOG=conversation_memory=debug cargo run --example replay -- history.json
//!
//! The history file is a JSON array of events.

use std::path::PathBuf;

use clap::Parser;
use conversation_memory::{
    ConversationConfig, ConversationMemory, Event, StaticSystemPrompt, WireOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "replay", about = "Render an agent event history as chat messages")]
struct Cli {
    /// JSON file holding the event history
    history: PathBuf,

    /// System prompt for the opening message
    #[arg(long, short = 's', default_value = "You are a helpful assistant.")]
    system: String,

    /// Truncate observations longer than this many characters
    #[arg(long)]
    max_message_chars: Option<usize>,

    /// Keep image content
    #[arg(long)]
    vision: bool,

    /// Attach set-of-marks screenshots to browsing results
    #[arg(long)]
    som: bool,

    /// Mark a prompt-caching breakpoint
    #[arg(long)]
    cache: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let raw = match std::fs::read_to_string(&cli.history) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", cli.history.display());
            std::process::exit(1);
        }
    };
    let history: Vec<Event> = match serde_json::from_str(&raw) {
        Ok(history) => history,
        Err(e) => {
            eprintln!("error: invalid history: {e}");
            std::process::exit(1);
        }
    };

    let mut config = ConversationConfig::default()
        .with_vision(cli.vision)
        .with_som_visual_browsing(cli.som);
    if let Some(max) = cli.max_message_chars {
        config = config.with_max_message_chars(max);
    }

    let memory = ConversationMemory::new(StaticSystemPrompt::new(cli.system.as_str()));
    let initial = memory.process_initial_messages(cli.cache);
    let mut messages = match memory.process_events(&history, initial, &config) {
        Ok(messages) => messages,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    if cli.cache {
        memory.apply_prompt_caching(&mut messages);
    }

    let opts = WireOptions {
        cache_enabled: cli.cache,
        vision_enabled: cli.vision,
        function_calling_enabled: true,
    };
    let wire: Vec<_> = messages.iter().map(|m| m.to_chat_value(&opts)).collect();
    match serde_json::to_string_pretty(&wire) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
