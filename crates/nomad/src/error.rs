//! Error types for the Nomad API client.

use thiserror::Error;

/// Errors returned by [`crate::NomadClient`].
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Nomad answered with a non-success status
    #[error("Nomad API returned {status} for {endpoint}: {body}")]
    Api {
        status: u16,
        endpoint: String,
        body: String,
    },

    /// The requested variable does not exist
    #[error("Variable not found: {path}")]
    VariableNotFound { path: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Client could not be constructed from the given configuration
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` when Nomad reported the target as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::VariableNotFound { .. } => true,
            Error::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}

/// Type alias for client results
pub type Result<T> = std::result::Result<T, Error>;
