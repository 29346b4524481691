//! Error types and result alias for the keylisten crate.
use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The OS hook could not be installed or stopped with an error.
    #[error("Keyboard listener failed: {0}")]
    Listen(String),
    /// The listener thread could not be created.
    #[error("Failed to start listener thread: {0}")]
    ThreadSpawn(#[from] io::Error),
    /// `start` was called on a listener that is already running.
    #[error("Listener already running")]
    AlreadyRunning,
}
