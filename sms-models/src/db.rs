//! Database initialization, connection pooling, and lifecycle management.
//!
//! Uses SQLite in WAL mode with r2d2 connection pooling.
//! Runs integrity checks on startup and brings the schema up to date.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode};
use tracing::{info, warn, error};

use sms_core::config::DatabaseConfig;
use sms_core::constants::delivery;
use sms_core::error::{SmsError, SmsResult};

use crate::schema;
use crate::migrations;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a connection checked out of the pool.
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Map a SQLite error onto the store error kinds.
///
/// A busy or locked database is reported as a pending operation, everything
/// else as a database failure.
pub fn db_err(e: rusqlite::Error) -> SmsError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            SmsError::PendingOperation(e.to_string())
        }
        _ => SmsError::Database(e.to_string()),
    }
}

/// Database wrapper providing initialization, pooling, and lifecycle management.
#[derive(Clone, Debug)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Open the database at the given path with the provided configuration.
    ///
    /// This:
    /// 1. Creates the database file and parent directories if needed
    /// 2. Sets up connection pooling with WAL mode and performance pragmas
    /// 3. Runs integrity checks if configured
    /// 4. Upgrades the schema to the current version
    pub fn open(db_path: &Path, config: &DatabaseConfig) -> SmsResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("opening database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| SmsError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        {
            let mut conn = db.conn()?;
            schema::create_tables(&conn)?;
            migrations::run_migrations(&mut conn)?;
        }

        info!("database ready");
        Ok(db)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> SmsResult<DbConn> {
        self.pool.get().map_err(|e| SmsError::Pool(e.to_string()))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> SmsResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(db_err)?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(SmsError::IntegrityCheck(result));
        }

        info!("database integrity check passed");
        Ok(())
    }

    /// Get database statistics (message counts per delivery direction).
    pub fn stats(&self) -> SmsResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |delivery: Option<&str>| -> SmsResult<i64> {
            match delivery {
                Some(value) => conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE delivery = ?1",
                    [value],
                    |row| row.get(0),
                ),
                None => conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0)),
            }
            .map_err(db_err)
        };

        Ok(DatabaseStats {
            messages: count(None)?,
            sent: count(Some(delivery::SENT))?,
            received: count(Some(delivery::RECEIVED))?,
            schema_version: migrations::get_schema_version(&conn)?,
        })
    }

    /// Reset the database by dropping and recreating all tables.
    pub fn reset(&self) -> SmsResult<()> {
        warn!("resetting database - all messages will be lost");
        let mut conn = self.conn()?;
        schema::drop_tables(&conn)?;
        schema::create_tables(&conn)?;
        migrations::run_migrations(&mut conn)?;
        info!("database reset complete");
        Ok(())
    }
}

/// Database row count statistics.
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub messages: i64,
    pub sent: i64,
    pub received: i64,
    pub schema_version: i32,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "messages={}, sent={}, received={}, schema_version={}",
            self.messages, self.sent, self.received, self.schema_version
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA cache_size=-16000;
             PRAGMA busy_timeout=5000;",
        )?;

        Ok(())
    }
}
