//! Tank object model and control operations.
//!
//! [`Tank`] is the object exposed to callers: three typed attributes
//! (`FillPercentage`, `ValvePosition`, `Threshold`) whose values are an
//! in-memory mirror of the quantity logs. [`Dispatcher`] is the only
//! writer of those attributes. Every operation it offers runs the same
//! short sequence:
//!
//! 1. validate the arguments,
//! 2. check the caller's roles against the [`AccessPolicy`](tankctl_types::AccessPolicy),
//! 3. read from or append to the [`LogStore`](tankctl_store::LogStore),
//! 4. update the cached attributes.
//!
//! A failure at any step ends the operation with a [`ControlError`] and
//! skips every later step. Nothing is retried.

mod controller;
mod dispatcher;
mod error;
mod model;

pub use controller::{HysteresisError, ValveHysteresis};
pub use dispatcher::{Dispatcher, FillLevelReport, TankSystemParams};
pub use error::ControlError;
pub use model::{
    Attribute, AttributeName, AttributeState, AttributeType, AttributeValue, ParseAttributeNameError,
    Tank, TankSnapshot,
};
