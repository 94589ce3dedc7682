//! Message entity model.
//!
//! `Message` is the caller-facing value; `MessageRecord` is the stored
//! shape, whose identifier stays empty until the first save.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sms_core::constants::delivery;
use sms_core::error::{SmsError, SmsResult};

use crate::db::db_err;

/// Direction in which a message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Received,
}

impl Delivery {
    /// The stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Delivery::Sent => delivery::SENT,
            Delivery::Received => delivery::RECEIVED,
        }
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Delivery {
    type Err = SmsError;

    fn from_str(s: &str) -> SmsResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            delivery::SENT => Ok(Delivery::Sent),
            delivery::RECEIVED => Ok(Delivery::Received),
            other => Err(SmsError::InvalidArgument(format!("unknown delivery '{other}'"))),
        }
    }
}

impl ToSql for Delivery {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Delivery {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: SmsError| FromSqlError::Other(Box::new(e)))
    }
}

/// A stored SMS message as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub delivery: Delivery,
    pub sender: String,
    pub receiver: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// A message in its stored shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Assigned exactly once, on first save.
    pub id: Option<String>,
    pub delivery: Delivery,
    pub sender: String,
    pub receiver: String,
    pub body: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl MessageRecord {
    /// Build a record that has not been saved yet.
    pub fn from_wire_fields(
        delivery: Delivery,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            delivery,
            sender: sender.into(),
            receiver: receiver.into(),
            body: body.into(),
            timestamp: timestamp.timestamp_millis(),
        }
    }

    /// Generate an identifier if the record has none yet.
    ///
    /// An existing identifier is never replaced, so re-saving a stored
    /// message keeps its identity.
    pub fn assign_identifier_on_first_save(&mut self) -> &str {
        self.id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .as_str()
    }

    /// The record's timestamp as a UTC instant.
    pub fn timestamp_utc(&self) -> SmsResult<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .ok_or_else(|| SmsError::Internal(format!("timestamp out of range: {}", self.timestamp)))
    }

    /// Convert to the caller-facing message. Fails for a record that was
    /// never saved.
    pub fn to_wire_message(&self) -> SmsResult<Message> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| SmsError::Internal("record has no identifier".into()))?;
        Ok(Message {
            id,
            delivery: self.delivery,
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            body: self.body.clone(),
            timestamp: self.timestamp_utc()?,
        })
    }

    /// Construct a record from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            delivery: row.get("delivery")?,
            sender: row.get("sender")?,
            receiver: row.get("receiver")?,
            body: row.get("body")?,
            timestamp: row.get("timestamp")?,
        })
    }

    /// Look up a record by identifier.
    pub fn find_by_id(conn: &Connection, id: &str) -> SmsResult<Option<Self>> {
        conn.query_row("SELECT * FROM messages WHERE id = ?1", [id], Self::from_row)
            .optional()
            .map_err(db_err)
    }

    /// Insert or replace this record, assigning an identifier on first save.
    pub fn save(&mut self, conn: &Connection) -> SmsResult<String> {
        let id = self.assign_identifier_on_first_save().to_string();
        conn.execute(
            "INSERT INTO messages (id, delivery, sender, receiver, body, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                delivery = excluded.delivery,
                sender = excluded.sender,
                receiver = excluded.receiver,
                body = excluded.body,
                timestamp = excluded.timestamp",
            params![id, self.delivery, self.sender, self.receiver, self.body, self.timestamp],
        )
        .map_err(db_err)?;
        Ok(id)
    }

    /// Delete a record by identifier. Returns false if nothing was stored under it.
    pub fn delete(conn: &Connection, id: &str) -> SmsResult<bool> {
        let affected = conn
            .execute("DELETE FROM messages WHERE id = ?1", [id])
            .map_err(db_err)?;
        Ok(affected > 0)
    }
}

impl From<Message> for MessageRecord {
    fn from(message: Message) -> Self {
        Self {
            id: Some(message.id),
            delivery: message.delivery,
            sender: message.sender,
            receiver: message.receiver,
            body: message.body,
            timestamp: message.timestamp.timestamp_millis(),
        }
    }
}

impl TryFrom<MessageRecord> for Message {
    type Error = SmsError;

    fn try_from(record: MessageRecord) -> SmsResult<Self> {
        let timestamp = record.timestamp_utc()?;
        let id = record
            .id
            .ok_or_else(|| SmsError::Internal("record has no identifier".into()))?;
        Ok(Message {
            id,
            delivery: record.delivery,
            sender: record.sender,
            receiver: record.receiver,
            body: record.body,
            timestamp,
        })
    }
}
