//! Common error types for signscan

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for signscan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the signscan client
///
/// Every failure belongs to one of two recoverable categories: a local
/// validation failure (wrong media kind, missing selection) that never
/// reaches the network, or a service failure (transport error, non-2xx
/// response, malformed body). Neither is fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    /// Local validation failure (never reaches the network)
    #[error("{0}")]
    Validation(String),

    /// Transport failure, non-2xx response, or malformed response body
    #[error("{0}")]
    Service(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error category surfaced to the user and carried on events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Wrong media kind or missing selection; recoverable by re-selecting
    Validation,
    /// Network/server failure; recoverable by resubmitting or resetting
    Service,
}

impl Error {
    /// Category of this error for display and event purposes
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            _ => ErrorCategory::Service,
        }
    }
}
