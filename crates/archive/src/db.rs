//! Opening the archive database.
//!
//! Only the crawler writes to the archive. Every other command opens it
//! read-only, so that a mistyped path or a missing data directory is reported
//! instead of silently producing a fresh, empty archive.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One writer (the crawler) plus a few readers.
const MAX_CONNECTIONS: u32 = 5;
// Readers wait this long for the crawler's write transaction to finish.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Connection pool for the archive's metadata tables.
///
/// The [`ArtifactStore`](crate::ArtifactStore) and
/// [`OriginLedger`](crate::OriginLedger) are built from it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    read_only: bool,
}

impl Database {
    /// Open the archive at `path` for writing.
    ///
    /// Creates the file if it doesn't exist and brings the schema up to date.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            // WAL so readers aren't blocked while the crawler writes.
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let db = Self::open(options, MAX_CONNECTIONS, false).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Open an existing archive at `path` without write access.
    ///
    /// Fails if the file doesn't exist. No migrations are run, so the schema
    /// is whatever the last writer left behind.
    pub async fn connect_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(BUSY_TIMEOUT);
        Self::open(options, MAX_CONNECTIONS, true).await
    }

    /// Open a fresh, migrated in-memory archive.
    ///
    /// Not gated behind `#[cfg(test)]` so that other crates can use it in
    /// their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:");
        // Every connection to ":memory:" is a separate database.
        let db = Self::open(options, 1, false).await?;
        db.migrate().await?;
        Ok(db)
    }

    async fn open(options: SqliteConnectOptions, max: u32, read_only: bool) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool, read_only })
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Whether this handle was opened with
    /// [`connect_read_only`](Self::connect_read_only).
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to be returned, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
