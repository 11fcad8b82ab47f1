mod agent;
mod cli;
mod config;
mod db;
mod entities;
mod orm;
mod server;
mod speech;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "copydesk", version, about = "Conversational copywriting backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the chat server
    Serve,
    /// Generate one piece of copy from the terminal
    Generate {
        /// The brief to write from
        prompt: String,
        /// Persona record id or exact name
        #[arg(long)]
        persona: Option<String>,
        /// Attach an image as a data: URL (repeatable)
        #[arg(long)]
        attach: Vec<String>,
    },
    /// List stored copy, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        skip: u64,
    },
    /// Show one stored record in full
    Inspect { id: String },
    /// Print one random stored text
    Sample,
    /// Show store statistics
    Stats,
    /// Check the backing services
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::CopydeskConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            let db_path = config.resolved_sessions_db_path();
            let conn = db::open_database(&db_path)?;
            let sessions = agent::sessions::SessionStore::new(conn);
            let runner = Arc::new(agent::ollama::OllamaRunner::new(
                config.agent.ollama_url.clone(),
                sessions.clone(),
            ));
            let state = server::AppState::new(Arc::new(config), runner, sessions);
            server::serve(state).await?;
        }
        Command::Generate {
            prompt,
            persona,
            attach,
        } => {
            cli::generate::generate(&config, &prompt, persona.as_deref(), &attach).await?;
        }
        Command::List { limit, skip } => {
            cli::list::list(&config, limit, skip).await?;
        }
        Command::Inspect { id } => {
            cli::inspect::inspect(&config, &id).await?;
        }
        Command::Sample => {
            cli::sample::sample(&config).await?;
        }
        Command::Stats => {
            cli::stats::stats(&config).await?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config).await?;
        }
    }

    Ok(())
}
