//! Append-only quantity logs for the tank control server.
//!
//! Each [`Quantity`](tankctl_types::Quantity) has its own table of
//! timestamped records. Records are only ever appended; the current value
//! of a quantity is the value of its record with the greatest id, and an
//! empty log has no current value at all.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tankctl_store::{LogStore, SampleValue};
//! use tankctl_types::Quantity;
//!
//! let store = LogStore::new(pool);
//! store.append(&SampleValue::TriggerThreshold(10))?;
//! assert_eq!(
//!     store.latest(Quantity::TriggerThreshold)?,
//!     Some(SampleValue::TriggerThreshold(10)),
//! );
//! ```
//!
//! The free functions ([`append_record`], [`latest_value`], [`count_records`],
//! [`query_records`]) operate on a borrowed connection; [`LogStore`] wraps
//! them with pool checkout.

mod error;
mod record;
mod store;

pub use error::StoreError;
pub use record::{LogRecord, RecordId, SampleValue};
pub use store::{
    append_record, count_records, latest_scalar, latest_value, query_records, LogStore,
    DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
