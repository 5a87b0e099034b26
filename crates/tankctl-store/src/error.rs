//! Error types for the quantity logs.

use tankctl_types::Quantity;

/// Errors that can occur during log operations.
///
/// An empty log is not an error: [`crate::latest_value`] returns `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading a log failed.
    #[error("failed to read {quantity} log: {source}")]
    Read {
        quantity: Quantity,
        #[source]
        source: rusqlite::Error,
    },

    /// Appending to a log failed.
    #[error("failed to append to {quantity} log: {source}")]
    Write {
        quantity: Quantity,
        #[source]
        source: rusqlite::Error,
    },

    /// The append statement did not write exactly one record.
    #[error("append to {quantity} log wrote {changed} records, expected 1")]
    AppendCount { quantity: Quantity, changed: usize },

    /// No pooled connection could be checked out.
    #[error("store connection unavailable: {0}")]
    Connection(#[from] r2d2::Error),
}

impl StoreError {
    /// Returns `true` for failures on the write path.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::AppendCount { .. })
    }
}
