use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for engine construction and queue management.
///
/// Action failures are not represented here: they are [`ActionError`]s and
/// are always recovered by the executor.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or validated.
    #[error("Config error: {0}")]
    Config(#[from] config::Error),

    /// A binding names an action the action provider does not know.
    #[error("Unknown action '{0}' in bindings")]
    UnknownAction(String),

    /// A queue worker thread could not be started.
    #[error("Failed to start worker thread: {0}")]
    WorkerSpawn(#[from] io::Error),
}

/// Failure outcome of a single action invocation.
///
/// The executor maps each variant to a fixed user-facing reaction; none of
/// them stops a queue.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The remote service or network could not be reached.
    #[error("Connection error: {0}")]
    Connectivity(String),

    /// The action already told the user what went wrong.
    #[error("Already notified")]
    AlreadyNotified,

    /// Anything else. Carries the cause chain (and a backtrace when enabled).
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ActionError {
    /// Shorthand for a connectivity failure.
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Shorthand for an unclassified failure with a message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(anyhow::anyhow!(msg.into()))
    }
}
