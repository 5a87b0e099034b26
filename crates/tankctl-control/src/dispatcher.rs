//! Validation, authorization, and store access for tank operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tankctl_store::{LogRecord, LogStore, SampleValue, StoreError, DEFAULT_HISTORY_LIMIT};
use tankctl_types::{AccessPolicy, CallerIdentity, Operation, Quantity, Variant};

use crate::controller::ValveHysteresis;
use crate::error::ControlError;
use crate::model::{Tank, TankSnapshot};

/// Output of `getTankSystemParams`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TankSystemParams {
    pub valve_position: bool,
    pub fill_percentage: f64,
    pub threshold: i32,
}

/// Output of `reportFillLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillLevelReport {
    pub fill_percentage: f64,
    pub valve_position: bool,
    /// Whether this report moved the valve.
    pub valve_changed: bool,
}

/// Runs tank operations against the store and keeps the tank's cached
/// attributes in step with it.
pub struct Dispatcher {
    store: LogStore,
    tank: Arc<Tank>,
    policy: AccessPolicy,
    valve_band: ValveHysteresis,
    // Held from the first store access to the last cache write of every
    // operation that touches both, so the cache always ends on the newest
    // records.
    sync_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        store: LogStore,
        tank: Arc<Tank>,
        policy: AccessPolicy,
        valve_band: ValveHysteresis,
    ) -> Self {
        Self {
            store,
            tank,
            policy,
            valve_band,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn tank(&self) -> &Arc<Tank> {
        &self.tank
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Reads the newest value of all three logs, refreshes every attribute,
    /// and returns the values.
    ///
    /// All-or-nothing: if any log is empty the call fails with
    /// [`ControlError::DataUnavailable`] and no attribute changes.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `DataUnavailable`, or `Internal`.
    pub fn get_tank_system_params(
        &self,
        caller: &CallerIdentity,
    ) -> Result<TankSystemParams, ControlError> {
        self.authorize(Operation::GetTankSystemParams, caller)?;
        self.read_all(Operation::GetTankSystemParams.as_str())
    }

    /// Appends a new trigger threshold and mirrors it into the `Threshold`
    /// attribute.
    ///
    /// Expects exactly one `Int32` argument. If the append fails, or does
    /// not write exactly one record, the attribute keeps its old value.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `Unauthorized`, or `Internal`.
    pub fn set_threshold(
        &self,
        caller: &CallerIdentity,
        args: &[Variant],
    ) -> Result<(), ControlError> {
        let operation = Operation::SetThreshold;
        let threshold = match args {
            [Variant::Int32(value)] => *value,
            [other] => {
                return Err(self.invalid(
                    operation,
                    format!("threshold must be Int32, got {}", other.type_name()),
                ))
            }
            _ => {
                return Err(self.invalid(
                    operation,
                    format!("expected 1 argument, got {}", args.len()),
                ))
            }
        };

        self.authorize(operation, caller)?;

        let _guard = self.lock_sync();
        let record_id = self
            .store
            .append(&SampleValue::TriggerThreshold(threshold))
            .map_err(|source| self.store_failure(operation.as_str(), source))?;

        self.tank.threshold.set_from_source(threshold);

        tracing::info!(
            user = caller.display_name(),
            threshold,
            record_id,
            "trigger threshold updated"
        );
        Ok(())
    }

    /// Records a fill level reading and runs the valve controller on it.
    ///
    /// Expects exactly one finite numeric argument. The valve's current
    /// state is the newest valve log record (closed if the log is empty);
    /// when the controller moves the valve, the new position is appended
    /// too. Attributes are updated only after every append succeeded.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `Unauthorized`, or `Internal`.
    pub fn report_fill_level(
        &self,
        caller: &CallerIdentity,
        args: &[Variant],
    ) -> Result<FillLevelReport, ControlError> {
        let operation = Operation::ReportFillLevel;
        let level = match args {
            [Variant::Double(value)] => *value,
            [Variant::Int32(value)] => f64::from(*value),
            [other] => {
                return Err(self.invalid(
                    operation,
                    format!("fill level must be Double, got {}", other.type_name()),
                ))
            }
            _ => {
                return Err(self.invalid(
                    operation,
                    format!("expected 1 argument, got {}", args.len()),
                ))
            }
        };
        if !level.is_finite() {
            return Err(self.invalid(operation, "fill level must be finite".to_string()));
        }

        self.authorize(operation, caller)?;

        let op = operation.as_str();
        let _guard = self.lock_sync();

        let was_open = self
            .store
            .latest_valve_position()
            .map_err(|source| self.store_failure(op, source))?
            .is_some_and(|position| position != 0);

        self.store
            .append(&SampleValue::WaterLevel(level))
            .map_err(|source| self.store_failure(op, source))?;

        let open = self.valve_band.next_state(was_open, level);
        if open != was_open {
            self.store
                .append(&SampleValue::valve(open))
                .map_err(|source| self.store_failure(op, source))?;
            tracing::info!(level, open, "valve position changed");
        }

        self.tank.fill_percentage.set_from_source(level);
        self.tank.valve_position.set_from_source(open);

        Ok(FillLevelReport {
            fill_percentage: level,
            valve_position: open,
            valve_changed: open != was_open,
        })
    }

    /// Current cached attribute values. Never touches the store.
    ///
    /// # Errors
    ///
    /// `Unauthorized`.
    pub fn read_attributes(&self, caller: &CallerIdentity) -> Result<TankSnapshot, ControlError> {
        self.authorize(Operation::ReadAttributes, caller)?;
        Ok(self.tank.snapshot())
    }

    /// Newest-first records of one log; `limit` defaults to
    /// [`DEFAULT_HISTORY_LIMIT`].
    ///
    /// # Errors
    ///
    /// `Unauthorized` or `Internal`.
    pub fn read_history(
        &self,
        caller: &CallerIdentity,
        quantity: Quantity,
        limit: Option<u32>,
    ) -> Result<Vec<LogRecord>, ControlError> {
        let operation = Operation::ReadHistory;
        self.authorize(operation, caller)?;
        self.store
            .history(quantity, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .map_err(|source| self.store_failure(operation.as_str(), source))
    }

    /// Same read as [`Dispatcher::get_tank_system_params`] without a
    /// caller, for the server's own periodic cache refresh.
    ///
    /// # Errors
    ///
    /// `DataUnavailable` or `Internal`.
    pub fn refresh_attributes(&self) -> Result<TankSystemParams, ControlError> {
        self.read_all("refreshAttributes")
    }

    fn read_all(&self, op: &'static str) -> Result<TankSystemParams, ControlError> {
        let _guard = self.lock_sync();
        let fill_percentage = self
            .store
            .latest_level()
            .map_err(|source| self.store_failure(op, source))?
            .ok_or_else(|| self.unavailable(op, Quantity::WaterLevel))?;
        let valve_position = self
            .store
            .latest_valve_position()
            .map_err(|source| self.store_failure(op, source))?
            .ok_or_else(|| self.unavailable(op, Quantity::ValvePosition))?
            != 0;
        let threshold = self
            .store
            .latest_threshold()
            .map_err(|source| self.store_failure(op, source))?
            .ok_or_else(|| self.unavailable(op, Quantity::TriggerThreshold))?;

        self.tank.fill_percentage.set_from_source(fill_percentage);
        self.tank.valve_position.set_from_source(valve_position);
        self.tank.threshold.set_from_source(threshold);

        tracing::debug!(
            operation = op,
            fill_percentage,
            valve_position,
            threshold,
            "tank attributes refreshed from store"
        );

        Ok(TankSystemParams {
            valve_position,
            fill_percentage,
            threshold,
        })
    }

    fn lock_sync(&self) -> MutexGuard<'_, ()> {
        self.sync_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, operation: Operation, caller: &CallerIdentity) -> Result<(), ControlError> {
        if self.policy.permits(operation, caller) {
            return Ok(());
        }
        tracing::warn!(
            operation = operation.as_str(),
            user = caller.display_name(),
            "caller lacks a required role"
        );
        Err(ControlError::Unauthorized {
            operation,
            caller: caller.display_name().to_string(),
        })
    }

    fn invalid(&self, operation: Operation, message: String) -> ControlError {
        tracing::warn!(operation = operation.as_str(), "{}", message);
        ControlError::InvalidArgument(message)
    }

    fn unavailable(&self, op: &'static str, quantity: Quantity) -> ControlError {
        tracing::warn!(operation = op, quantity = %quantity, "no data recorded yet");
        ControlError::DataUnavailable(quantity)
    }

    fn store_failure(&self, op: &'static str, source: StoreError) -> ControlError {
        tracing::error!(operation = op, error = %source, "store access failed");
        ControlError::Internal {
            operation: op,
            source,
        }
    }
}
