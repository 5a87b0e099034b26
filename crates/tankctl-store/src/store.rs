//! Persistence operations for the quantity logs.
//!
//! Writes go through [`append_record`], which inserts a single row and
//! checks that exactly one row was written. Ids come from SQLite's
//! `AUTOINCREMENT`, and SQLite admits one writer at a time, so ids within
//! a log are strictly increasing in append order even under concurrent
//! appenders.
//!
//! Reads go through [`latest_value`] and [`query_records`].

use rusqlite::types::FromSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tankctl_db::DbPool;
use tankctl_types::Quantity;

use crate::error::StoreError;
use crate::record::{LogRecord, RecordId, SampleValue};

/// Number of records [`query_records`] returns when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Upper bound on the number of records one history query returns.
pub const MAX_HISTORY_LIMIT: u32 = 1_000;

/// Appends `value` to the log of its quantity.
///
/// Returns the id assigned to the new record.
///
/// # Errors
///
/// Returns `StoreError::Write` if the insert fails and
/// `StoreError::AppendCount` if it did not write exactly one row.
pub fn append_record(conn: &Connection, value: &SampleValue) -> Result<RecordId, StoreError> {
    let quantity = value.quantity();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES (?1)",
        quantity.as_str(),
        quantity.value_column()
    );

    let changed = match *value {
        SampleValue::WaterLevel(level) => conn.execute(&sql, params![level]),
        SampleValue::ValvePosition(position) => conn.execute(&sql, params![position]),
        SampleValue::TriggerThreshold(threshold) => conn.execute(&sql, params![threshold]),
    }
    .map_err(|source| StoreError::Write { quantity, source })?;

    if changed != 1 {
        return Err(StoreError::AppendCount { quantity, changed });
    }

    let id = conn.last_insert_rowid();
    tracing::debug!(quantity = %quantity, record_id = id, "appended log record");
    Ok(id)
}

/// Returns the value of the newest record in `quantity`'s log.
///
/// `Ok(None)` means the log is empty.
///
/// # Errors
///
/// Returns `StoreError::Read` on SQL failure, including stored values that
/// do not fit the quantity's type.
pub fn latest_value(
    conn: &Connection,
    quantity: Quantity,
) -> Result<Option<SampleValue>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id DESC LIMIT 1",
        quantity.value_column(),
        quantity.as_str()
    );

    conn.query_row(&sql, [], |row| read_value(row, 0, quantity))
        .optional()
        .map_err(|source| StoreError::Read { quantity, source })
}

/// Returns the newest value of `quantity`'s log decoded as `T`.
///
/// Typed counterpart of [`latest_value`]; `Ok(None)` means the log is empty.
///
/// # Errors
///
/// Returns `StoreError::Read` on SQL failure or if the stored value does
/// not convert to `T`.
pub fn latest_scalar<T: FromSql>(
    conn: &Connection,
    quantity: Quantity,
) -> Result<Option<T>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id DESC LIMIT 1",
        quantity.value_column(),
        quantity.as_str()
    );

    conn.query_row(&sql, [], |row| row.get(0))
        .optional()
        .map_err(|source| StoreError::Read { quantity, source })
}

/// Returns up to `limit` records of `quantity`'s log, newest first.
///
/// `limit` is clamped to `1..=MAX_HISTORY_LIMIT`.
///
/// # Errors
///
/// Returns `StoreError::Read` on SQL failure.
pub fn query_records(
    conn: &Connection,
    quantity: Quantity,
    limit: u32,
) -> Result<Vec<LogRecord>, StoreError> {
    let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
    let sql = format!(
        "SELECT id, timestamp, {} FROM {} ORDER BY id DESC LIMIT ?1",
        quantity.value_column(),
        quantity.as_str()
    );

    let read_err = |source| StoreError::Read { quantity, source };

    let mut stmt = conn.prepare(&sql).map_err(read_err)?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(LogRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                value: read_value(row, 2, quantity)?,
            })
        })
        .map_err(read_err)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(read_err)?);
    }

    Ok(records)
}

/// Returns the number of records in `quantity`'s log.
///
/// # Errors
///
/// Returns `StoreError::Read` on SQL failure.
pub fn count_records(conn: &Connection, quantity: Quantity) -> Result<u64, StoreError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quantity.as_str());
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(|source| StoreError::Read { quantity, source })?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn read_value(row: &Row<'_>, idx: usize, quantity: Quantity) -> rusqlite::Result<SampleValue> {
    Ok(match quantity {
        Quantity::WaterLevel => SampleValue::WaterLevel(row.get(idx)?),
        Quantity::ValvePosition => SampleValue::ValvePosition(row.get(idx)?),
        Quantity::TriggerThreshold => SampleValue::TriggerThreshold(row.get(idx)?),
    })
}

/// Pooled handle to the quantity logs.
///
/// Cloning is cheap; every call checks out its own connection, so a
/// `LogStore` can be shared across threads.
#[derive(Clone)]
pub struct LogStore {
    pool: DbPool,
}

impl LogStore {
    /// Wraps an already migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// See [`append_record`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if no connection is available, or
    /// any error of [`append_record`].
    pub fn append(&self, value: &SampleValue) -> Result<RecordId, StoreError> {
        let conn = self.pool.get()?;
        append_record(&conn, value)
    }

    /// See [`latest_value`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if no connection is available, or
    /// any error of [`latest_value`].
    pub fn latest(&self, quantity: Quantity) -> Result<Option<SampleValue>, StoreError> {
        let conn = self.pool.get()?;
        latest_value(&conn, quantity)
    }

    /// Newest fill level, in percent.
    ///
    /// # Errors
    ///
    /// See [`latest_scalar`].
    pub fn latest_level(&self) -> Result<Option<f64>, StoreError> {
        let conn = self.pool.get()?;
        latest_scalar(&conn, Quantity::WaterLevel)
    }

    /// Newest raw valve position (0 closed, nonzero open).
    ///
    /// # Errors
    ///
    /// See [`latest_scalar`].
    pub fn latest_valve_position(&self) -> Result<Option<i64>, StoreError> {
        let conn = self.pool.get()?;
        latest_scalar(&conn, Quantity::ValvePosition)
    }

    /// Newest trigger threshold.
    ///
    /// # Errors
    ///
    /// See [`latest_scalar`].
    pub fn latest_threshold(&self) -> Result<Option<i32>, StoreError> {
        let conn = self.pool.get()?;
        latest_scalar(&conn, Quantity::TriggerThreshold)
    }

    /// See [`query_records`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if no connection is available, or
    /// any error of [`query_records`].
    pub fn history(&self, quantity: Quantity, limit: u32) -> Result<Vec<LogRecord>, StoreError> {
        let conn = self.pool.get()?;
        query_records(&conn, quantity, limit)
    }

    /// See [`count_records`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if no connection is available, or
    /// any error of [`count_records`].
    pub fn count(&self, quantity: Quantity) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        count_records(&conn, quantity)
    }
}
