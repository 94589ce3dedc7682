//! Versioned schema upgrades.
//!
//! The stored schema version is compared with `DB_SCHEMA_VERSION` when the
//! database is opened. Every version bump runs inside one transaction: a
//! failed step leaves the database at its previous version.

use rusqlite::Connection;
use tracing::{info, error};
use sms_core::error::{SmsError, SmsResult};
use sms_core::constants::DB_SCHEMA_VERSION;

use crate::db::db_err;
use crate::schema;

/// Bring the database schema up to `DB_SCHEMA_VERSION`.
pub fn run_migrations(conn: &mut Connection) -> SmsResult<()> {
    let tx = conn.transaction().map_err(db_err)?;
    let current_version = get_schema_version(&tx)?;

    if current_version == DB_SCHEMA_VERSION {
        info!("database schema is up to date (version {current_version})");
        return Ok(());
    }

    info!("upgrading schema from version {current_version} to {DB_SCHEMA_VERSION}");

    // Dropping `tx` on error rolls the upgrade back.
    upgrade_schema(&tx, current_version, DB_SCHEMA_VERSION)?;
    set_schema_version(&tx, DB_SCHEMA_VERSION)?;
    tx.commit().map_err(db_err)?;

    info!("schema upgrade complete, now at version {DB_SCHEMA_VERSION}");
    Ok(())
}

/// Upgrade the schema from `old_version` to `new_version`, one version at a time.
///
/// Fails with `NotSupported` when no upgrade path exists from `old_version`,
/// including a database written by a newer release.
pub fn upgrade_schema(conn: &Connection, old_version: i32, new_version: i32) -> SmsResult<()> {
    if old_version < 0 || old_version > new_version {
        error!("no upgrade path from schema version {old_version} to {new_version}");
        return Err(SmsError::NotSupported(format!(
            "cannot upgrade schema from version {old_version} to {new_version}"
        )));
    }

    for version in (old_version + 1)..=new_version {
        info!("applying schema version {version}");
        match version {
            1 => schema::create_object_store(conn)?,
            _ => {
                return Err(SmsError::NotSupported(format!(
                    "unknown schema version {version}"
                )))
            }
        }
    }

    Ok(())
}

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> SmsResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .map_err(db_err)?;

    match version {
        Some(version) => Ok(version),
        None => {
            // First run
            conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
                .map_err(db_err)?;
            Ok(0)
        }
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> SmsResult<()> {
    conn.execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(db_err)?;
    Ok(())
}
