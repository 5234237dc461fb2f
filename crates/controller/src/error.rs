//! Error types for the reconciliation engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reconciling resources.
///
/// Almost every variant is scoped to a single resource or file: the caller
/// logs it and moves on to the next item in the pass.
#[derive(Debug, Error)]
pub enum Error {
    /// A stored record does not match its kind's schema
    #[error("Failed to decode record '{path}': {reason}")]
    Decode { path: String, reason: String },

    /// A job group references a repository that is not owned or does not exist
    #[error("No GitRepository '{repository}' found for NomadJobGroup '{job_group}'")]
    MissingRepository {
        job_group: String,
        repository: String,
    },

    /// Discovery found nothing to work with
    #[error("Directory '{}' is inaccessible or empty", .directory.display())]
    DirectoryUnavailable { directory: PathBuf },

    /// The path filter is not a valid regular expression
    #[error("Invalid path filter '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Cloning or copying the repository content failed
    #[error("Failed to synchronize GitRepository '{repository}': {reason}")]
    Sync { repository: String, reason: String },

    /// A file could not be decoded as a job spec or group descriptor
    #[error("Failed to parse '{file}': {reason}")]
    Parse { file: String, reason: String },

    /// A group descriptor would make a job group generate one of its ancestors
    #[error("Refusing to generate NomadJobGroup '{path}' from '{generator}': cycle detected")]
    Cycle { path: String, generator: String },

    /// A group descriptor names a record this controller may not write
    #[error("Refusing to generate NomadJobGroup '{path}' from '{generator}': {reason}")]
    OutOfScope {
        path: String,
        generator: String,
        reason: String,
    },

    /// Reading or writing the resource store failed
    #[error("Resource store error for '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: nomad::Error,
    },

    /// Registering a job with the orchestrator failed
    #[error("Failed to register job '{job}': {reason}")]
    Register { job: String, reason: String },

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable category, used as a structured log field.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Error::Decode { .. } => "decode",
            Error::MissingRepository { .. } => "missing_repository",
            Error::DirectoryUnavailable { .. } | Error::InvalidPattern { .. } => "discovery",
            Error::Sync { .. } => "sync",
            Error::Parse { .. } => "parse",
            Error::Cycle { .. } => "cycle",
            Error::OutOfScope { .. } => "scope",
            Error::Store { .. } => "store",
            Error::Register { .. } => "register",
            Error::Config(_) => "config",
            Error::Io { .. } => "io",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
