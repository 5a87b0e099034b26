//! Two-point valve control on the fill level.

/// Error returned for an unusable hysteresis band.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HysteresisError {
    #[error("valve band bounds must be finite")]
    NonFinite,
    #[error("open level {open_above} must be above close level {close_below}")]
    Inverted { open_above: f64, close_below: f64 },
}

/// Opens the outlet valve when the tank fills past an upper level and
/// closes it once the level drops below a lower one. Between the two
/// levels the valve keeps its current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveHysteresis {
    open_above: f64,
    close_below: f64,
}

impl Default for ValveHysteresis {
    fn default() -> Self {
        Self {
            open_above: 75.0,
            close_below: 25.0,
        }
    }
}

impl ValveHysteresis {
    /// # Errors
    ///
    /// Returns [`HysteresisError`] unless both bounds are finite and
    /// `open_above > close_below`.
    pub fn new(open_above: f64, close_below: f64) -> Result<Self, HysteresisError> {
        if !open_above.is_finite() || !close_below.is_finite() {
            return Err(HysteresisError::NonFinite);
        }
        if open_above <= close_below {
            return Err(HysteresisError::Inverted {
                open_above,
                close_below,
            });
        }
        Ok(Self {
            open_above,
            close_below,
        })
    }

    pub fn open_above(&self) -> f64 {
        self.open_above
    }

    pub fn close_below(&self) -> f64 {
        self.close_below
    }

    /// Valve state after observing `level` with the valve currently `open`.
    pub fn next_state(&self, open: bool, level: f64) -> bool {
        if open {
            level >= self.close_below
        } else {
            level > self.open_above
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_valve_opens_only_above_upper_level() {
        let band = ValveHysteresis::default();
        assert!(!band.next_state(false, 50.0));
        assert!(!band.next_state(false, 75.0));
        assert!(band.next_state(false, 75.1));
    }

    #[test]
    fn open_valve_closes_only_below_lower_level() {
        let band = ValveHysteresis::default();
        assert!(band.next_state(true, 50.0));
        assert!(band.next_state(true, 25.0));
        assert!(!band.next_state(true, 24.9));
    }

    #[test]
    fn band_must_be_ordered_and_finite() {
        assert!(ValveHysteresis::new(80.0, 20.0).is_ok());
        assert_eq!(
            ValveHysteresis::new(20.0, 20.0),
            Err(HysteresisError::Inverted {
                open_above: 20.0,
                close_below: 20.0
            })
        );
        assert_eq!(
            ValveHysteresis::new(f64::INFINITY, 20.0),
            Err(HysteresisError::NonFinite)
        );
    }
}
