//! The tank object and its cached attributes.

use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use tankctl_types::DataType;

/// Names of the attributes every tank carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttributeName {
    FillPercentage,
    ValvePosition,
    Threshold,
}

impl AttributeName {
    pub const ALL: [AttributeName; 3] = [
        Self::FillPercentage,
        Self::ValvePosition,
        Self::Threshold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FillPercentage => "FillPercentage",
            Self::ValvePosition => "ValvePosition",
            Self::Threshold => "Threshold",
        }
    }
}

impl std::fmt::Display for AttributeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttributeName {
    type Err = ParseAttributeNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ParseAttributeNameError(s.to_string()))
    }
}

/// Error returned when parsing an unknown attribute name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attribute: {0}")]
pub struct ParseAttributeNameError(pub String);

/// A cached attribute value of any of the supported data types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Double(f64),
    Boolean(bool),
    Int32(i32),
}

impl AttributeValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Double(_) => DataType::Double,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
        }
    }
}

/// Rust types that can back an attribute.
pub trait AttributeType: Copy + Send + Sync + 'static {
    /// Declared data type of attributes holding this type.
    const DATA_TYPE: DataType;
    /// Value an attribute holds before its first update.
    const ZERO: Self;

    fn into_value(self) -> AttributeValue;
}

impl AttributeType for f64 {
    const DATA_TYPE: DataType = DataType::Double;
    const ZERO: Self = 0.0;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Double(self)
    }
}

impl AttributeType for bool {
    const DATA_TYPE: DataType = DataType::Boolean;
    const ZERO: Self = false;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Boolean(self)
    }
}

impl AttributeType for i32 {
    const DATA_TYPE: DataType = DataType::Int32;
    const ZERO: Self = 0;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Int32(self)
    }
}

/// A named, typed value cached on the tank.
///
/// The type parameter fixes the data type for the attribute's whole life;
/// updates overwrite the value in place under a lock, so readers always see
/// either the old or the new value.
#[derive(Debug)]
pub struct Attribute<T> {
    name: AttributeName,
    value: RwLock<T>,
}

impl<T: AttributeType> Attribute<T> {
    fn new(name: AttributeName) -> Self {
        Self {
            name,
            value: RwLock::new(T::ZERO),
        }
    }

    pub fn name(&self) -> AttributeName {
        self.name
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Current cached value. Never touches the store.
    pub fn get(&self) -> T {
        // A writer cannot leave a `Copy` value half-written, so a poisoned
        // lock still holds a valid value.
        *self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites the cached value. Only the dispatcher calls this, after
    /// validation and a successful store access.
    pub(crate) fn set_from_source(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn state(&self) -> AttributeState {
        AttributeState {
            name: self.name,
            data_type: T::DATA_TYPE,
            value: self.get().into_value(),
        }
    }
}

/// A point-in-time view of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeState {
    pub name: AttributeName,
    pub data_type: DataType,
    pub value: AttributeValue,
}

/// A point-in-time view of a whole tank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankSnapshot {
    pub name: String,
    pub attributes: Vec<AttributeState>,
}

/// The tank object exposed to callers.
#[derive(Debug)]
pub struct Tank {
    name: String,
    pub fill_percentage: Attribute<f64>,
    pub valve_position: Attribute<bool>,
    pub threshold: Attribute<i32>,
}

impl Tank {
    /// Creates a tank whose attributes hold their zero values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fill_percentage: Attribute::new(AttributeName::FillPercentage),
            valve_position: Attribute::new(AttributeName::ValvePosition),
            threshold: Attribute::new(AttributeName::Threshold),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cached value of the named attribute.
    pub fn attribute(&self, name: AttributeName) -> AttributeValue {
        match name {
            AttributeName::FillPercentage => self.fill_percentage.get().into_value(),
            AttributeName::ValvePosition => self.valve_position.get().into_value(),
            AttributeName::Threshold => self.threshold.get().into_value(),
        }
    }

    pub fn snapshot(&self) -> TankSnapshot {
        TankSnapshot {
            name: self.name.clone(),
            attributes: vec![
                self.fill_percentage.state(),
                self.valve_position.state(),
                self.threshold.state(),
            ],
        }
    }
}
