//! Error types for the synapse simulation core.

use crate::stage::Stage;
use thiserror::Error;

/// Rejected stage transitions.
///
/// The controller never reports these to a user; they mark an ordering
/// invariant violation and are counted so tests can assert there are none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StageError {
    /// Attempted to enter a stage that is not the direct successor
    #[error("Stage skipped: {from} -> {to}")]
    Skipped {
        /// Stage active when the transition was attempted
        from: Stage,
        /// Stage that was requested
        to: Stage,
    },
}

/// Invalid simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric parameter lies outside its allowed range
    #[error("Config field `{field}` out of range: {value}")]
    OutOfRange {
        /// Field name as it appears in the serialized config
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Pulse start and trigger thresholds are not strictly increasing
    #[error("Thresholds must satisfy start < calcium < release < travel bound")]
    ThresholdOrder,

    /// Config document could not be parsed
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an out-of-range error.
    pub fn out_of_range(field: &'static str, value: impl Into<f64>) -> Self {
        Self::OutOfRange {
            field,
            value: value.into(),
        }
    }
}
