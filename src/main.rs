//! FraudGuard - AI-assisted fraud scoring for payment transactions
//!
//! Combines an anomaly classifier, a sequence classifier and two generative
//! narratives into a single verdict per transaction.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use fraudguard::cli::commands;
use fraudguard::config::{Config, LogFormat, LoggingConfig};

/// FraudGuard - transaction fraud scoring
#[derive(Parser)]
#[command(name = "fraudguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a transaction and print the assessment as JSON
    Assess {
        /// Transaction JSON file
        #[arg(short, long)]
        transaction: PathBuf,

        /// JSON array of prior transactions, most recent first
        #[arg(long)]
        history: Option<PathBuf>,

        /// Query providers one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check provider reachability (Hugging Face, Gemini)
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging)?;
    config.warn_missing_keys();

    let result = match cli.command {
        Commands::Assess {
            transaction,
            history,
            sequential,
        } => commands::assess(&config, &transaction, history.as_deref(), sequential).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing; RUST_LOG takes precedence over the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraudguard={}", logging.level.to_lowercase()).parse()?);

    // Logs go to stderr so assessment JSON on stdout stays machine-readable
    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init(),
    }

    Ok(())
}
