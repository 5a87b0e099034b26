//! Failure outcomes of tank operations.

use tankctl_store::StoreError;
use tankctl_types::{Operation, Quantity, StatusCode};

/// Why a tank operation failed.
///
/// Each variant maps to exactly one [`StatusCode`] reported to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Arguments had the wrong count or type. Raised before any side effect.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller holds none of the roles the operation requires. Raised
    /// before any store access.
    #[error("{caller} is not authorized to invoke {operation}")]
    Unauthorized { operation: Operation, caller: String },

    /// A required log is still empty. No attribute was updated.
    #[error("no recorded value for {0}")]
    DataUnavailable(Quantity),

    /// The store failed. Reported to callers as an internal error.
    #[error("{operation} failed: {source}")]
    Internal {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ControlError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BadInvalidArgument,
            Self::Unauthorized { .. } => StatusCode::BadUserAccessDenied,
            Self::DataUnavailable(_) => StatusCode::BadOutOfRange,
            Self::Internal { .. } => StatusCode::BadInternalError,
        }
    }
}
