//! namehist - member name history ledger
//!
//! Records every name a guild member has used and keeps one history
//! message per member in a configured channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use namehist_core::{ChannelId, UserId};
use namehist_store::{JsonFileStore, MemoryStore, RecordStore};
use namehist_sync::NameLedger;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod discord;

use config::LedgerConfig;
use discord::DiscordHttpSink;

/// namehist - member name history ledger
#[derive(Parser, Debug)]
#[command(name = "namehist")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "namehist.toml")]
    config: PathBuf,

    /// Override the data file from the configuration
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Keep records in memory only
    #[arg(long, conflicts_with = "data_file")]
    ephemeral: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply member updates read as JSON lines from stdin
    Run,

    /// Set the history channel and re-render every message there
    SetChannel {
        /// Channel id
        channel: ChannelId,
    },

    /// Re-render every message in the current history channel
    Resync,

    /// Show the recorded names of a member
    History {
        /// User id
        user_id: UserId,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let mut config = LedgerConfig::load(&cli.config)?;
    if let Some(data_file) = cli.data_file {
        config = config.with_data_file(data_file);
    }
    let store = open_store(&config, cli.ephemeral).await?;

    match cli.command {
        Commands::Run => {
            let ledger = connect(&config, store)?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            commands::run(&ledger, stdin).await?;
        }
        Commands::SetChannel { channel } => {
            let ledger = connect(&config, store)?;
            let report = ledger
                .set_destination(channel)
                .await
                .context("failed to set history channel")?;
            println!("{}", commands::format_report(&report));
            commands::check_report(&report)?;
        }
        Commands::Resync => {
            let ledger = connect(&config, store)?;
            let report = ledger.resync().await.context("failed to resync")?;
            println!("{}", commands::format_report(&report));
            commands::check_report(&report)?;
        }
        Commands::History { user_id, json } => {
            println!("{}", commands::history(store.as_ref(), user_id, json).await?);
        }
    }

    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn open_store(config: &LedgerConfig, ephemeral: bool) -> Result<Arc<dyn RecordStore>> {
    if ephemeral {
        tracing::info!("Using in-memory store; nothing will be saved");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = JsonFileStore::open(&config.data_file)
        .await
        .with_context(|| format!("failed to open {}", config.data_file.display()))?;
    Ok(Arc::new(store))
}

fn connect(config: &LedgerConfig, store: Arc<dyn RecordStore>) -> Result<NameLedger> {
    let token = config.discord.token()?;
    let sink = DiscordHttpSink::new(&config.discord, &token)?;
    Ok(NameLedger::with_settings(
        store,
        Arc::new(sink),
        config.ledger_settings(),
    ))
}
