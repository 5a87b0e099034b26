//! Role requirements per tank operation.

use serde::{Deserialize, Serialize};

use crate::{CallerIdentity, Role};

/// Operations a caller can invoke on the tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Read all three quantities from the store and refresh the cache.
    GetTankSystemParams,
    /// Append a new trigger threshold.
    SetThreshold,
    /// Record a fill level reading and run the valve controller.
    ReportFillLevel,
    /// Read the cached attribute values.
    ReadAttributes,
    /// Read recorded history of one quantity.
    ReadHistory,
}

impl Operation {
    /// Returns the method name exposed to callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetTankSystemParams => "getTankSystemParams",
            Self::SetThreshold => "setThreshold",
            Self::ReportFillLevel => "reportFillLevel",
            Self::ReadAttributes => "readAttributes",
            Self::ReadHistory => "readHistory",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getTankSystemParams" => Ok(Self::GetTankSystemParams),
            "setThreshold" => Ok(Self::SetThreshold),
            "reportFillLevel" => Ok(Self::ReportFillLevel),
            "readAttributes" => Ok(Self::ReadAttributes),
            "readHistory" => Ok(Self::ReadHistory),
            _ => Err(ParseOperationError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct ParseOperationError(pub String);

/// Minimum-role table for tank operations.
///
/// Each field lists the roles that authorise the corresponding operation.
/// A caller holding any one of them is allowed; an empty list denies every
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessPolicy {
    #[serde(default = "default_read_roles")]
    pub get_tank_system_params: Vec<Role>,
    #[serde(default = "default_admin_roles")]
    pub set_threshold: Vec<Role>,
    #[serde(default = "default_operator_roles")]
    pub report_fill_level: Vec<Role>,
    #[serde(default = "default_read_roles")]
    pub read_attributes: Vec<Role>,
    #[serde(default = "default_read_roles")]
    pub read_history: Vec<Role>,
}

fn default_read_roles() -> Vec<Role> {
    vec![Role::AuthenticatedUser]
}

fn default_admin_roles() -> Vec<Role> {
    vec![Role::ConfigureAdmin]
}

fn default_operator_roles() -> Vec<Role> {
    vec![Role::Operator]
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            get_tank_system_params: default_read_roles(),
            set_threshold: default_admin_roles(),
            report_fill_level: default_operator_roles(),
            read_attributes: default_read_roles(),
            read_history: default_read_roles(),
        }
    }
}

impl AccessPolicy {
    /// Roles that authorise `operation`.
    pub fn required_roles(&self, operation: Operation) -> &[Role] {
        match operation {
            Operation::GetTankSystemParams => &self.get_tank_system_params,
            Operation::SetThreshold => &self.set_threshold,
            Operation::ReportFillLevel => &self.report_fill_level,
            Operation::ReadAttributes => &self.read_attributes,
            Operation::ReadHistory => &self.read_history,
        }
    }

    /// Returns `true` if `caller` may invoke `operation`.
    pub fn permits(&self, operation: Operation, caller: &CallerIdentity) -> bool {
        caller.holds_any(self.required_roles(operation))
    }
}
