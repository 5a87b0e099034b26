//! Pooled SQLite connections for the tank logs.
//!
//! Every request that appends a sample or reads the newest one borrows a
//! connection from a shared r2d2 pool. SQLite admits one writer at a time,
//! so the pool is tuned for many short appends racing each other:
//!
//! - the journal runs in WAL mode, letting readers of the latest values
//!   proceed while an append is being committed;
//! - each connection carries a busy timeout, so an appender that finds the
//!   write lock taken waits for it instead of failing with `SQLITE_BUSY`.
//!   Concurrent appends to the three logs are thereby serialised by SQLite
//!   itself rather than surfacing as store errors.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Connection settings shared by every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long an append waits for another writer to release the database,
    /// in milliseconds, before it fails.
    pub busy_timeout_ms: u64,

    /// Upper bound on simultaneously open connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens (creating if needed) the log database at `db_path` behind a pool.
///
/// `:memory:` is accepted, but each pooled connection then sees its own
/// private database, so it only makes sense with `pool_max_size = 1`.
///
/// # Errors
///
/// Returns [`PoolError::PoolInit`] if no connection can be opened or
/// configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| configure_connection(conn, settings.busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        pool_max_size = settings.pool_max_size,
        busy_timeout_ms = settings.busy_timeout_ms,
        "created database pool"
    );

    Ok(pool)
}

fn configure_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    // In-memory databases answer "memory".
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("log database refused WAL journal mode, got: {journal_mode}")),
        ));
    }
    conn.execute_batch(&format!(
        "PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}
