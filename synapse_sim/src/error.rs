//! Error types for the simulation harness.

use synapse_core::ConfigError;
use synapse_env::EnvError;
use thiserror::Error;

/// Errors surfaced by the harness and CLI.
#[derive(Debug, Error)]
pub enum SimError {
    /// Reading a config or writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config document invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Environment could not be constructed
    #[error(transparent)]
    Env(#[from] EnvError),
}
