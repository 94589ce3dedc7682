//! SQLite implementation of the record store.
//!
//! Each scope checks one connection out of the pool and holds an open
//! transaction on it. Store calls run on tokio's blocking pool so callers
//! suspend at every scope boundary instead of blocking the runtime.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use sms_core::config::DatabaseConfig;
use sms_core::error::{SmsError, SmsResult};

use crate::db::{db_err, Database, DbConn};
use crate::models::message::MessageRecord;
use crate::queries;
use crate::store::{IndexName, KeyRange, RecordStore, ScanEntry, Scope, ScopeMode, SortDirection};

/// Run a blocking store call on the blocking thread pool.
async fn blocking<T, F>(f: F) -> SmsResult<T>
where
    F: FnOnce() -> SmsResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SmsError::Database(format!("store task failed: {e}")))?
}

/// Record store backed by a SQLite database file.
///
/// The database is opened lazily by the first operation (or an explicit
/// `open`) and kept for the lifetime of the store.
pub struct SqliteStore {
    path: PathBuf,
    config: DatabaseConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the database at `path`. Nothing is opened yet.
    pub fn new(path: impl AsRef<Path>, config: DatabaseConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            path: PathBuf::new(),
            config: DatabaseConfig::default(),
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Path of the database file, empty when built from an open database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the database has been opened.
    pub fn is_open(&self) -> bool {
        self.db.initialized()
    }

    /// The opened database, opening it on first use.
    pub async fn database(&self) -> SmsResult<&Database> {
        self.db
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let config = self.config.clone();
                blocking(move || Database::open(&path, &config)).await
            })
            .await
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn open(&self) -> SmsResult<()> {
        if self.is_open() {
            debug!("store already open");
        }
        self.database().await.map(|_| ())
    }

    async fn begin(&self, mode: ScopeMode) -> SmsResult<Box<dyn Scope>> {
        let db = self.database().await?.clone();
        let conn = blocking(move || {
            let conn = db.conn()?;
            let begin = match mode {
                ScopeMode::ReadOnly => "BEGIN DEFERRED",
                ScopeMode::ReadWrite => "BEGIN IMMEDIATE",
            };
            conn.execute_batch(begin).map_err(db_err)?;
            Ok(conn)
        })
        .await?;

        debug!(?mode, "scope started");
        Ok(Box::new(SqliteScope {
            conn: Arc::new(Mutex::new(conn)),
            mode,
            finished: false,
        }))
    }
}

/// A transaction on one pooled connection.
pub struct SqliteScope {
    conn: Arc<Mutex<DbConn>>,
    mode: ScopeMode,
    finished: bool,
}

impl SqliteScope {
    async fn run<T, F>(&self, f: F) -> SmsResult<T>
    where
        F: FnOnce(&Connection) -> SmsResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| SmsError::Internal("scope connection poisoned".into()))?;
            f(&guard)
        })
        .await
    }

    fn require_write(&self) -> SmsResult<()> {
        match self.mode {
            ScopeMode::ReadWrite => Ok(()),
            ScopeMode::ReadOnly => Err(SmsError::PermissionDenied(
                "write attempted in a read-only scope".into(),
            )),
        }
    }
}

#[async_trait]
impl Scope for SqliteScope {
    fn mode(&self) -> ScopeMode {
        self.mode
    }

    async fn get(&self, id: &str) -> SmsResult<Option<MessageRecord>> {
        let id = id.to_string();
        self.run(move |conn| MessageRecord::find_by_id(conn, &id)).await
    }

    async fn put(&self, record: &MessageRecord) -> SmsResult<()> {
        self.require_write()?;
        if record.id.is_none() {
            return Err(SmsError::InvalidArgument("record has no identifier".into()));
        }
        let mut record = record.clone();
        self.run(move |conn| record.save(conn).map(|_| ())).await
    }

    async fn delete(&self, id: &str) -> SmsResult<bool> {
        self.require_write()?;
        let id = id.to_string();
        self.run(move |conn| MessageRecord::delete(conn, &id)).await
    }

    async fn scan_index(
        &self,
        index: IndexName,
        range: KeyRange,
        direction: SortDirection,
    ) -> SmsResult<Vec<ScanEntry>> {
        let entries = self
            .run(move |conn| queries::scan_index(conn, index, &range, direction))
            .await?;
        debug!(%index, ?direction, count = entries.len(), "index scan complete");
        Ok(entries)
    }

    async fn scan_all(&self) -> SmsResult<Vec<String>> {
        self.run(queries::scan_all).await
    }

    async fn commit(self: Box<Self>) -> SmsResult<()> {
        let mut scope = self;
        scope
            .run(|conn| conn.execute_batch("COMMIT").map_err(db_err))
            .await?;
        scope.finished = true;
        debug!(mode = ?scope.mode, "scope committed");
        Ok(())
    }
}

fn rollback(conn: &Mutex<DbConn>, mode: ScopeMode) {
    // Return the connection to the pool without an open transaction.
    match conn.lock() {
        Ok(conn) => {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!("failed to roll back abandoned scope: {e}");
            } else {
                debug!(?mode, "scope rolled back");
            }
        }
        Err(_) => warn!("scope connection poisoned, skipping rollback"),
    }
}

impl Drop for SqliteScope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let conn = Arc::clone(&self.conn);
        let mode = self.mode;
        // Never wait on the connection lock or the database from a runtime thread.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || rollback(&conn, mode));
            }
            Err(_) => rollback(&conn, mode),
        }
    }
}
