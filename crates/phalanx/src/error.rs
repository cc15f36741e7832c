//! Errors of the runtime.

use phalanx_core::GridError;
use thiserror::Error;

use crate::config::ConfigError;

/// Anything that can stop the runtime from starting or running a soak.
#[derive(Debug, Error)]
pub enum PhalanxError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured region could not be registered.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// A worker thread could not be spawned.
    #[error("cannot spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
