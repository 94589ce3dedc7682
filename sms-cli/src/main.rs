//! SMS CLI - Command-line interface for the SMS message store.
//!
//! Saves, inspects and deletes stored messages, runs filtered queries, and
//! maintains the database file from the terminal.

mod commands;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use sms_core::config::{AppConfig, ConfigHandle};
use sms_core::error::SmsResult;
use sms_core::logging;

/// sms - Local SMS message store.
#[derive(Parser)]
#[command(
    name = "sms",
    version,
    about = "SMS message store CLI",
    long_about = "A command-line interface for the local SMS message store.\n\
                   Record sent and received messages and query them by time, direction and address."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Messages(commands::messages::MessagesAction),
    /// Database management commands.
    Db {
        #[command(subcommand)]
        action: commands::db::DbAction,
    },
}

#[tokio::main]
async fn main() -> SmsResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(std::path::Path::new(path))?,
        None => AppConfig::load_default()?,
    };

    // Initialize logging
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let _guard = if cli.verbose {
        logging::init_logging("debug", &log_dir, config.logging.json_output)?
    } else {
        logging::init_from_config(&config.logging, &log_dir)?
    };

    if !config.is_own_address_configured() {
        warn!("no own address configured; set [sms] own_address to record messages");
    }

    let config_handle = ConfigHandle::new(config);

    info!("sms CLI v{}", sms_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Messages(action) => {
            commands::messages::run(config_handle, action, cli.format).await
        }
        Commands::Db { action } => {
            commands::db::run(config_handle, action, cli.format).await
        }
    }
}
