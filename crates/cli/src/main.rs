//! Composition root: wires the Registry, Session Manager, Memory Plane,
//! Context Builder, Orchestrator, Broadcaster and Call Logger together, then
//! drives `on_new_message` from a pre-seeded group so the core can be
//! exercised end-to-end without a real chat front-end (spec.md §1, §6).

mod seed;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use arena_broadcast::Broadcaster;
use arena_calllog::CallLogger;
use arena_config::AppConfig;
use arena_context::ContextBuilder;
use arena_memory::MemoryPlane;
use arena_orchestrator::Orchestrator;
use arena_registry::Registry;
use arena_session::SessionManager;
use arena_types::{ArenaEvent, AuthorKind, StoredMessage};

#[derive(Debug, Parser)]
#[command(name = "arena", version, about = "Multi-agent group-chat orchestrator")]
struct Cli {
    /// Path to the TOML config file (created with defaults if absent).
    #[arg(long, default_value = "arena.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seed a demo group with a fixed agent roster and start an interactive
    /// send loop: each stdin line becomes a human message in the group.
    Send {
        /// Path to a TOML roster file describing the group and its agents.
        #[arg(long)]
        roster: PathBuf,
        /// Human author id attributed to each line read from stdin.
        #[arg(long, default_value = "operator")]
        author: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_from(&cli.config).context("loading config")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.telemetry.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Commands::Send { roster, author } => run_send(config, roster, author).await,
    }
}

async fn run_send(config: AppConfig, roster_path: PathBuf, author: String) -> Result<()> {
    let registry = Arc::new(Registry::new());
    let sessions = Arc::new(SessionManager::open(&config.storage.database_path).context("opening session store")?);
    let memory = Arc::new(MemoryPlane::new(&config.storage.memory_dir));
    let broadcaster = Arc::new(Broadcaster::new());
    let call_logger = Arc::new(CallLogger::new(&config.storage.logs_dir));
    let context_builder = Arc::new(ContextBuilder::new(registry.clone(), sessions.clone(), memory.clone(), config.context.clone()));

    let roster = seed::Roster::load(&roster_path).context("loading roster file")?;
    let group_id = seed::apply(&roster, &registry, &sessions, &config.default_group_config)?;
    tracing::info!(group_id, "seeded group from roster");

    let orchestrator = Arc::new(Orchestrator::new(registry, sessions.clone(), memory, context_builder, broadcaster.clone(), call_logger));

    let mut events = broadcaster.subscribe(&group_id);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    println!("group '{group_id}' ready. Type a message and press enter (Ctrl-D to exit).");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let message = StoredMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.clone(),
            turn_id: String::new(),
            author_id: author.clone(),
            author_kind: AuthorKind::Human,
            author_name: author.clone(),
            content: line.clone(),
            mentions: Vec::new(),
            attachments: Vec::new(),
            timestamp: chrono::Utc::now(),
            metadata: Default::default(),
        };
        let saved = sessions.save_message(message).context("persisting human message")?;
        broadcaster.publish(ArenaEvent::UserMessage {
            group_id: group_id.clone(),
            message_id: saved.message_id.clone(),
            content: saved.content.clone(),
        });

        orchestrator.on_new_message(&group_id, &line, &author, None).await;
        io::stdout().flush().ok();
    }
    Ok(())
}

fn print_event(event: &ArenaEvent) {
    match event {
        ArenaEvent::AgentMessage { agent_id, content, .. } => println!("[{agent_id}] {content}"),
        ArenaEvent::AgentStatus { agent_id, status, .. } => println!("  ({agent_id} is {status:?})"),
        ArenaEvent::TurnLog { agent_id, duration_ms, is_error, .. } => {
            println!("  · {agent_id} responded in {duration_ms}ms{}", if *is_error { " [error]" } else { "" })
        }
        ArenaEvent::SystemMessage { content, .. } => println!("*** {content}"),
        ArenaEvent::UserMessage { content, .. } => println!("> {content}"),
    }
}
