//! Shared types for the tank control workspace.
//!
//! This crate holds the vocabulary every other crate speaks: the well-known
//! roles a principal can hold, the three tracked quantities, attribute data
//! types, the typed [`Variant`] used for method arguments, protocol status
//! codes, and the per-operation [`AccessPolicy`].
//!
//! It has no dependency on any other workspace crate.

pub mod policy;
pub mod variant;

pub use policy::{AccessPolicy, Operation, ParseOperationError};
pub use variant::{Variant, VariantError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Well-known roles a principal may be assigned.
///
/// The set mirrors the standard roles of industrial control servers. A role
/// carries no permission by itself; [`AccessPolicy`] decides which roles may
/// invoke which [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Granted to sessions that did not present credentials.
    Anonymous,
    /// Any principal whose credentials were verified.
    AuthenticatedUser,
    /// May browse and read, nothing else.
    Observer,
    /// Runs the process day to day.
    Operator,
    /// Tunes the process.
    Engineer,
    /// Oversees operators.
    Supervisor,
    /// May change configuration of the tank system.
    ConfigureAdmin,
    /// May change security settings.
    SecurityAdmin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 8] = [
        Self::Anonymous,
        Self::AuthenticatedUser,
        Self::Observer,
        Self::Operator,
        Self::Engineer,
        Self::Supervisor,
        Self::ConfigureAdmin,
        Self::SecurityAdmin,
    ];

    /// Returns the canonical name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::AuthenticatedUser => "AuthenticatedUser",
            Self::Observer => "Observer",
            Self::Operator => "Operator",
            Self::Engineer => "Engineer",
            Self::Supervisor => "Supervisor",
            Self::ConfigureAdmin => "ConfigureAdmin",
            Self::SecurityAdmin => "SecurityAdmin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

/// One of the three measured quantities, each backed by its own log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    /// Tank fill level in percent.
    #[serde(rename = "waterlevel")]
    WaterLevel,
    /// Outlet valve position, stored as 0 (closed) or 1 (open).
    #[serde(rename = "valveposition")]
    ValvePosition,
    /// Configured trigger threshold.
    #[serde(rename = "triggerthreshold")]
    TriggerThreshold,
}

impl Quantity {
    /// Every quantity.
    pub const ALL: [Quantity; 3] = [
        Self::WaterLevel,
        Self::ValvePosition,
        Self::TriggerThreshold,
    ];

    /// Name of the table holding this quantity's log.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaterLevel => "waterlevel",
            Self::ValvePosition => "valveposition",
            Self::TriggerThreshold => "triggerthreshold",
        }
    }

    /// Name of the value column in this quantity's table.
    pub fn value_column(self) -> &'static str {
        match self {
            Self::WaterLevel => "level",
            Self::ValvePosition => "position",
            Self::TriggerThreshold => "threshold",
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waterlevel" => Ok(Self::WaterLevel),
            "valveposition" => Ok(Self::ValvePosition),
            "triggerthreshold" => Ok(Self::TriggerThreshold),
            _ => Err(ParseQuantityError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown quantity name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quantity: {0}")]
pub struct ParseQuantityError(pub String);

/// Data type of a tank attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Double,
    Boolean,
    Int32,
}

/// Result status reported to the caller of a tank operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Good,
    BadInvalidArgument,
    BadUserAccessDenied,
    /// A required quantity has no recorded value yet.
    BadOutOfRange,
    BadInternalError,
}

impl StatusCode {
    /// Returns the canonical status name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::BadInvalidArgument => "BadInvalidArgument",
            Self::BadUserAccessDenied => "BadUserAccessDenied",
            Self::BadOutOfRange => "BadOutOfRange",
            Self::BadInternalError => "BadInternalError",
        }
    }

    /// Returns `true` for [`StatusCode::Good`].
    pub fn is_good(self) -> bool {
        matches!(self, Self::Good)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity on whose behalf an operation is invoked.
///
/// An anonymous caller has no username and no roles, so every operation
/// gated by an [`AccessPolicy`] denies it unless the policy lists
/// [`Role::Anonymous`] and the transport grants that role explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Authenticated username, `None` for anonymous callers.
    pub username: Option<String>,
    /// Roles resolved for this caller.
    pub roles: BTreeSet<Role>,
}

impl CallerIdentity {
    /// A caller that presented no credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A caller whose credentials were verified.
    pub fn authenticated(username: impl Into<String>, roles: BTreeSet<Role>) -> Self {
        Self {
            username: Some(username.into()),
            roles,
        }
    }

    /// Name used in logs.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("<anonymous>")
    }

    /// Returns `true` if the caller holds at least one of `roles`.
    pub fn holds_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }
}
