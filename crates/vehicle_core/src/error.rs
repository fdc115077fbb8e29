//! Error types for parameter construction and simulation ticks.

use thiserror::Error;

/// Fatal failures raised while advancing the simulation.
///
/// Every variant halts the run: the tick that produced it is abandoned and the
/// driver stops advancing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A non-finite value was written into the tracked vehicle state.
    #[error("{field} was set as {value}")]
    InvalidState { field: &'static str, value: f64 },

    /// A table lookup was requested outside the table's abscissa range.
    #[error("{table} lookup at {x} is outside the table domain [{min}, {max}]")]
    OutOfDomain {
        table: &'static str,
        x: f64,
        min: f64,
        max: f64,
    },

    /// A tick was requested after the simulation already failed.
    #[error("simulation halted after a previous failure")]
    Halted,
}

/// Failures detected while building parameters, initial state or manoeuvres.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{table} has {actual} entries, expected {expected}")]
    TableLength {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{table} needs at least two points")]
    TooFewPoints { table: &'static str },

    #[error("{table} abscissae must be strictly increasing")]
    NonIncreasing { table: &'static str },

    #[error("lock-up ratio must lie in (0, 1], got {0}")]
    LockUpRatio(f64),

    #[error("torque converter table {table} must cover [0, {lock_up_ratio}]")]
    ConverterDomain {
        table: &'static str,
        lock_up_ratio: f64,
    },

    #[error("gearbox needs at least one drive gear after the neutral slot")]
    NoDriveGears,

    #[error("initial forward speed must not be negative, got {0}")]
    NegativeSpeed(f64),

    #[error("initial gear {gear} is outside [1, {top}]")]
    InitialGear { gear: usize, top: usize },

    #[error("manoeuvre channel {channel} has {actual} samples, expected {expected}")]
    ManoeuvreLength {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("manoeuvre {channel} sample {index} = {value} is outside [{min}, {max}]")]
    InputOutOfRange {
        channel: &'static str,
        index: usize,
        value: f64,
        min: f64,
        max: f64,
    },
}

pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}
