use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::SentinelConfig;
use sentinel_core::{Diagnostics, Orchestrator};
use sentinel_store::SqliteStore;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version)]
#[command(about = "Sentinel: multi-agent security request router")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,

    /// Route a single message and print the response
    Ask {
        /// The message to route
        message: String,

        #[arg(long, default_value = "cli")]
        user: String,

        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Run the router, reading one message per line from stdin
    Start {
        #[arg(long, default_value = "cli")]
        user: String,

        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Print orchestrator and agent health
    Status,

    /// Print the conversation log of a session
    History {
        session: String,

        /// Maximum number of exchanges to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs on stderr, JSON on stdout
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Ask {
            message,
            user,
            session,
        } => cmd_ask(&cli.config, &message, &user, &session).await,
        Commands::Start { user, session } => cmd_start(&cli.config, &user, &session).await,
        Commands::Status => cmd_status(&cli.config).await,
        Commands::History { session, limit } => cmd_history(&cli.config, &session, limit).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("Sentinel initialized at {}", config_dir.display());
    println!("Edit {} to adjust routing rules and health checks.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SentinelConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

fn open_store(cfg: &SentinelConfig) -> Result<Arc<SqliteStore>> {
    let db_path = cfg.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
    }
    Ok(Arc::new(SqliteStore::open(&db_path)?))
}

/// Build and initialize an orchestrator over the configured store
async fn start_orchestrator(cfg: &SentinelConfig) -> Result<Orchestrator> {
    let store = open_store(cfg)?;
    let orchestrator = Orchestrator::new(cfg.orchestrator(), store, Diagnostics::new());
    orchestrator
        .initialize()
        .await
        .context("Failed to initialize orchestrator")?;
    Ok(orchestrator)
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    message: &str,
    user: &str,
    session: &str,
) -> Result<()> {
    let cfg = SentinelConfig::load(config_path)?;
    let orchestrator = start_orchestrator(&cfg).await?;

    let outcome = orchestrator.process_message(message, user, session).await;
    orchestrator.shutdown().await;

    let response = outcome?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn cmd_start(config_path: &Option<PathBuf>, user: &str, session: &str) -> Result<()> {
    let cfg = SentinelConfig::load(config_path)?;
    info!("Starting Sentinel...");
    let orchestrator = start_orchestrator(&cfg).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Ready. One message per line; Ctrl+C or EOF to stop.");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let message = line.trim();
                        if message.is_empty() {
                            continue;
                        }
                        match orchestrator.process_message(message, user, session).await {
                            Ok(response) => println!("{}", serde_json::to_string(&response)?),
                            Err(e) => {
                                error!("Failed to process message: {}", e);
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        info!("Input closed, shutting down...");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        }
    }

    orchestrator.shutdown().await;
    println!("Sentinel stopped.");
    Ok(())
}

async fn cmd_status(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SentinelConfig::load(config_path)?;
    let orchestrator = start_orchestrator(&cfg).await?;

    let status = orchestrator.get_status().await;
    orchestrator.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn cmd_history(config_path: &Option<PathBuf>, session: &str, limit: usize) -> Result<()> {
    let cfg = SentinelConfig::load(config_path)?;
    let store = open_store(&cfg)?;
    let orchestrator = Orchestrator::new(cfg.orchestrator(), store, Diagnostics::new());

    let records = orchestrator.history(session, limit).await?;
    if records.is_empty() {
        println!("No conversation history for session '{}'.", session);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
