//! Record and value types for the quantity logs.

use serde::{Deserialize, Serialize};
use tankctl_types::Quantity;

/// Identifier of a log record. Strictly increasing within one log.
pub type RecordId = i64;

/// A value belonging to one of the three logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "quantity", content = "value")]
pub enum SampleValue {
    /// Fill level in percent.
    #[serde(rename = "waterlevel")]
    WaterLevel(f64),
    /// Raw valve position as stored; nonzero means open.
    #[serde(rename = "valveposition")]
    ValvePosition(i64),
    /// Trigger threshold.
    #[serde(rename = "triggerthreshold")]
    TriggerThreshold(i32),
}

impl SampleValue {
    /// Encodes a valve state the way the log stores it (0 or 1).
    pub fn valve(open: bool) -> Self {
        Self::ValvePosition(i64::from(open))
    }

    /// The log this value belongs to.
    pub fn quantity(&self) -> Quantity {
        match self {
            Self::WaterLevel(_) => Quantity::WaterLevel,
            Self::ValvePosition(_) => Quantity::ValvePosition,
            Self::TriggerThreshold(_) => Quantity::TriggerThreshold,
        }
    }
}

/// An immutable entry in a quantity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Auto-assigned record id.
    pub id: RecordId,
    /// SQLite `CURRENT_TIMESTAMP` at insertion (UTC, `YYYY-MM-DD HH:MM:SS`).
    pub timestamp: Option<String>,
    /// The recorded value.
    #[serde(flatten)]
    pub value: SampleValue,
}
