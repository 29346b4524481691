//! Error types for the player crate.
use std::{io, result::Result as StdResult};

use spotkeys_engine::ActionError;
use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors raised while talking to the player.
#[derive(Debug, Error)]
pub enum Error {
    /// The network or remote service could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The user has already been told what went wrong.
    #[error("Already notified")]
    Notified,

    /// The remote API answered with an unexpected status.
    #[error("Request to {endpoint} failed with status {status}: {message}")]
    Http {
        /// Endpoint path relative to the API root.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or the raw body.
        message: String,
    },

    /// A response body lacked an expected field.
    #[error("Unexpected response from {endpoint}: missing {field}")]
    Missing {
        /// Endpoint path relative to the API root.
        endpoint: String,
        /// Dotted path of the missing field.
        field: &'static str,
    },

    /// Stored credentials are missing or unusable.
    #[error("Token error: {0}")]
    Token(String),

    /// A local control command failed.
    #[error("Local control failed: {0}")]
    Local(String),

    /// Filesystem or process error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Error> for ActionError {
    fn from(e: Error) -> Self {
        match e {
            Error::Connection(msg) => ActionError::Connectivity(msg),
            Error::Notified => ActionError::AlreadyNotified,
            other => ActionError::Failed(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_onto_action_taxonomy() {
        assert!(matches!(
            ActionError::from(Error::Connection("dns".into())),
            ActionError::Connectivity(_)
        ));
        assert!(matches!(
            ActionError::from(Error::Notified),
            ActionError::AlreadyNotified
        ));
        assert!(matches!(
            ActionError::from(Error::Token("gone".into())),
            ActionError::Failed(_)
        ));
    }
}
