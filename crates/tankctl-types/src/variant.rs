//! Typed values carried as method arguments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single typed argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
}

/// Error returned when a JSON value has no scalar variant form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported argument shape: {0}")]
pub struct VariantError(pub &'static str);

impl Variant {
    /// Name of the variant's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
        }
    }

    /// Converts a scalar JSON value.
    ///
    /// Integers that fit in `i32` become [`Variant::Int32`], other integers
    /// [`Variant::Int64`], remaining numbers [`Variant::Double`].
    ///
    /// # Errors
    ///
    /// Returns [`VariantError`] for arrays, objects, and unsigned integers
    /// above `i64::MAX`.
    pub fn from_json(value: &Value) -> Result<Self, VariantError> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i32::try_from(i).map_or(Self::Int64(i), Self::Int32))
                } else if n.is_u64() {
                    Err(VariantError("integer out of range"))
                } else {
                    n.as_f64()
                        .map(Self::Double)
                        .ok_or(VariantError("number not representable"))
                }
            }
            Value::Array(_) => Err(VariantError("array")),
            Value::Object(_) => Err(VariantError("object")),
        }
    }
}
