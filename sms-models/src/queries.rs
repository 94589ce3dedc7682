//! Index range scans over the message collection.
//!
//! Each scan is a single ordered `SELECT` over an indexed column. Rows are
//! ordered by the indexed value and then by primary key, so a scan over
//! unchanged data always yields the same sequence.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use sms_core::error::{SmsError, SmsResult};

use crate::db::db_err;
use crate::store::{IndexKey, IndexName, KeyRange, ScanEntry, SortDirection};

fn key_to_value(key: &IndexKey) -> Value {
    match key {
        IndexKey::Text(s) => Value::Text(s.clone()),
        IndexKey::Integer(i) => Value::Integer(*i),
    }
}

fn value_to_key(value: Value) -> SmsResult<IndexKey> {
    match value {
        Value::Text(s) => Ok(IndexKey::Text(s)),
        Value::Integer(i) => Ok(IndexKey::Integer(i)),
        other => Err(SmsError::Internal(format!("unexpected index value: {other:?}"))),
    }
}

/// Scan `index` over `range`, returning (index key, primary key) pairs.
pub fn scan_index(
    conn: &Connection,
    index: IndexName,
    range: &KeyRange,
    direction: SortDirection,
) -> SmsResult<Vec<ScanEntry>> {
    let column = index.column();
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    match range {
        KeyRange::Only(key) => {
            values.push(key_to_value(key));
            conditions.push(format!("{column} = ?{}", values.len()));
        }
        KeyRange::Bound { lower, upper } => {
            if let Some(lower) = lower {
                values.push(key_to_value(lower));
                conditions.push(format!("{column} >= ?{}", values.len()));
            }
            if let Some(upper) = upper {
                values.push(key_to_value(upper));
                conditions.push(format!("{column} <= ?{}", values.len()));
            }
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let order = direction.as_sql();
    let sql = format!(
        "SELECT {column}, id FROM messages {where_clause} ORDER BY {column} {order}, id {order}"
    );

    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, Value>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(db_err)?;

    let mut entries = Vec::new();
    for row in rows {
        let (value, primary_key) = row.map_err(db_err)?;
        entries.push(ScanEntry {
            key: value_to_key(value)?,
            primary_key,
        });
    }
    Ok(entries)
}

/// All primary keys in primary key order.
pub fn scan_all(conn: &Connection) -> SmsResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT id FROM messages ORDER BY id ASC")
        .map_err(db_err)?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(ids)
}
