//! Error types for the synapse environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Display rate of zero frames per second
    #[error("Invalid frame rate: {0} fps")]
    InvalidFrameRate(u32),
}
