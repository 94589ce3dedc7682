//! Message commands.

use chrono::Utc;
use clap::Subcommand;
use comfy_table::{Table, presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, ContentArrangement};
use console::style;

use sms_core::config::ConfigHandle;
use sms_core::error::SmsResult;
use sms_models::{Delivery, Message, MessageFilter};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum MessagesAction {
    /// Record a message sent from this device.
    Send {
        /// Receiver address.
        #[arg(short, long)]
        to: String,
        /// Message body.
        body: String,
        /// Time of the message (RFC 3339 or epoch ms). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
    /// Record a message received by this device.
    Receive {
        /// Sender address.
        #[arg(short = 'F', long)]
        from: String,
        /// Message body.
        body: String,
        /// Time of the message (RFC 3339 or epoch ms). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
    /// Show a stored message.
    Get {
        /// Message ID.
        id: String,
    },
    /// Delete a stored message.
    Delete {
        /// Message ID.
        id: String,
    },
    /// List all stored messages, oldest first.
    List,
    /// Query messages by time range, direction and address.
    Query {
        /// Only messages at or after this time (RFC 3339 or epoch ms).
        #[arg(long)]
        since: Option<String>,
        /// Only messages at or before this time (RFC 3339 or epoch ms).
        #[arg(long)]
        until: Option<String>,
        /// Only sent or only received messages.
        #[arg(short, long)]
        delivery: Option<Delivery>,
        /// Only messages from or to this address. Repeatable.
        #[arg(short = 'a', long = "address")]
        numbers: Vec<String>,
        /// Newest first.
        #[arg(short, long)]
        reverse: bool,
        /// Maximum number of messages to show.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

pub async fn run(config: ConfigHandle, action: MessagesAction, format: OutputFormat) -> SmsResult<()> {
    let service = super::init_service(&config).await?;

    match action {
        MessagesAction::Send { to, body, at } => {
            let timestamp = match at {
                Some(value) => super::parse_timestamp(&value)?,
                None => Utc::now(),
            };
            let id = service.save_sent_message(&to, &body, timestamp).await?;
            print_saved(&id, format);
        }
        MessagesAction::Receive { from, body, at } => {
            let timestamp = match at {
                Some(value) => super::parse_timestamp(&value)?,
                None => Utc::now(),
            };
            let id = service.save_received_message(&from, &body, timestamp).await?;
            print_saved(&id, format);
        }
        MessagesAction::Get { id } => {
            let message = service.get_message(&id).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&message)?);
                }
                OutputFormat::Text => print_message_detail(&message),
            }
        }
        MessagesAction::Delete { id } => {
            service.delete_message(&id).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": id })),
                OutputFormat::Text => {
                    println!("  {} Deleted message {id}", style("OK").green().bold());
                }
            }
        }
        MessagesAction::List => {
            let messages = service.get_all_messages().await?;
            print_messages(&messages, format)?;
        }
        MessagesAction::Query { since, until, delivery, numbers, reverse, limit } => {
            let mut filter = MessageFilter::new();
            if let Some(since) = since {
                filter = filter.since(super::parse_timestamp(&since)?);
            }
            if let Some(until) = until {
                filter = filter.until(super::parse_timestamp(&until)?);
            }
            if let Some(delivery) = delivery {
                filter = filter.with_delivery(delivery);
            }
            if !numbers.is_empty() {
                filter = filter.with_numbers(numbers);
            }

            // Page through the list instead of loading every match.
            let (handle, first) = service.create_message_list(&filter, reverse).await?;
            let limit = limit.unwrap_or(usize::MAX);
            let mut messages: Vec<Message> = first.into_iter().take(limit).collect();
            while messages.len() < limit {
                match service.get_next_message_in_list(&handle).await? {
                    Some(message) => messages.push(message),
                    None => break,
                }
            }
            let more = service.lists().remaining(&handle).await?;
            service.clear_message_list(&handle).await?;

            print_messages(&messages, format)?;
            if more > 0 {
                if let OutputFormat::Text = format {
                    println!("  {} more not shown", more);
                }
            }
        }
    }

    Ok(())
}

fn print_saved(id: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "id": id })),
        OutputFormat::Text => println!("  {} Saved message {id}", style("OK").green().bold()),
    }
}

fn print_message_detail(message: &Message) {
    println!("{}", style("Message").bold().underlined());
    println!("  ID:        {}", message.id);
    println!("  Delivery:  {}", message.delivery);
    println!("  From:      {}", message.sender);
    println!("  To:        {}", message.receiver);
    println!("  Time:      {}", message.timestamp.to_rfc3339());
    println!();
    println!("{}", message.body);
}

fn print_messages(messages: &[Message], format: OutputFormat) -> SmsResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(messages)?);
        }
        OutputFormat::Text => {
            if messages.is_empty() {
                println!("  No messages found.");
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(vec!["ID", "Delivery", "From", "To", "Time", "Body"]);
            for message in messages {
                table.add_row(vec![
                    super::truncate(&message.id, 13),
                    message.delivery.to_string(),
                    message.sender.clone(),
                    message.receiver.clone(),
                    message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    super::truncate(&message.body, 40),
                ]);
            }

            println!("{table}");
            println!("  {} message(s)", messages.len());
        }
    }
    Ok(())
}
