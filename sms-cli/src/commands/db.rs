//! Database management commands.

use clap::Subcommand;
use comfy_table::{Table, presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, ContentArrangement};
use console::style;

use sms_core::config::ConfigHandle;
use sms_core::error::SmsResult;
use sms_models::db::db_err;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum DbAction {
    /// Show database statistics.
    Stats,
    /// Run an integrity check.
    Check,
    /// Reset the database (WARNING: destroys all messages).
    Reset {
        /// Confirm that all stored messages should be deleted.
        #[arg(long)]
        yes: bool,
    },
    /// Show the database file path.
    Path,
}

pub async fn run(config: ConfigHandle, action: DbAction, format: OutputFormat) -> SmsResult<()> {
    let db_path = config.read().await.effective_db_path()?;

    match action {
        DbAction::Stats => {
            let db = super::init_database(&config).await?;
            let stats = db.stats()?;

            let file_size = std::fs::metadata(&db_path).ok().map(|m| m.len());

            // Get WAL file size if it exists
            let wal_path = db_path.with_extension("db-wal");
            let wal_size = std::fs::metadata(&wal_path).ok().map(|m| m.len());

            let conn = db.conn()?;
            let journal_mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_else(|_| "unknown".to_string());

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "path": db_path.display().to_string(),
                        "schema_version": stats.schema_version,
                        "messages": {
                            "total": stats.messages,
                            "sent": stats.sent,
                            "received": stats.received,
                        },
                        "file_size_bytes": file_size,
                        "wal_size_bytes": wal_size,
                        "journal_mode": journal_mode,
                    }));
                }
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:            {}", db_path.display());
                    println!("  Journal mode:    {}", journal_mode);
                    println!("  Schema version:  {}", stats.schema_version);
                    println!();

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);

                    table.set_header(vec!["Delivery", "Messages"]);
                    table.add_row(vec!["sent".to_string(), stats.sent.to_string()]);
                    table.add_row(vec!["received".to_string(), stats.received.to_string()]);
                    table.add_row(vec!["total".to_string(), stats.messages.to_string()]);

                    println!("{table}");

                    println!();
                    println!("{}", style("Storage").bold().underlined());
                    if let Some(size) = file_size {
                        println!("  Database:        {}", super::format_bytes(size));
                    }
                    if let Some(size) = wal_size {
                        println!("  WAL file:        {}", super::format_bytes(size));
                    }
                }
            }
        }
        DbAction::Check => {
            println!(
                "  {} Running integrity check...",
                style("...").dim()
            );
            let db = super::init_database(&config).await?;

            let conn = db.conn()?;
            let quick_result: String = conn
                .query_row("PRAGMA quick_check", [], |row| row.get(0))
                .map_err(db_err)?;

            if quick_result == "ok" {
                println!(
                    "  {} Quick check passed.",
                    style("OK").green().bold()
                );
            } else {
                println!(
                    "  {} Quick check issue: {}",
                    style("WARN").yellow().bold(),
                    quick_result
                );
            }

            match db.run_integrity_check() {
                Ok(()) => {
                    println!(
                        "  {} Full integrity check passed.",
                        style("OK").green().bold()
                    );
                }
                Err(e) => {
                    println!(
                        "  {} Integrity check failed: {}",
                        style("FAIL").red().bold(),
                        e
                    );
                }
            }
        }
        DbAction::Reset { yes } => {
            if !yes {
                println!(
                    "  {} This will delete ALL stored messages.",
                    style("WARNING").red().bold()
                );
                println!("  Database: {}", db_path.display());
                println!("  Re-run with --yes to confirm.");
                return Ok(());
            }

            let db = super::init_database(&config).await?;
            db.reset()?;
            println!(
                "  {} Database reset complete.",
                style("OK").green().bold()
            );
        }
        DbAction::Path => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({"path": db_path.display().to_string()}));
                }
                OutputFormat::Text => {
                    println!("{}", db_path.display());
                }
            }
        }
    }

    Ok(())
}
