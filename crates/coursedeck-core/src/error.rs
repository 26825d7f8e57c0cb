//! Error types
//!
//! `StoreError` covers everything that can go wrong at the remote store
//! boundary. `ValidationError` covers locally invalid input and is never
//! sent over the wire.

use thiserror::Error;

/// Errors raised by the remote course store or the transport to it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No connection to the store (never connected, or dropped mid-request)
    #[error("Not connected to the course store")]
    Disconnected,

    /// The store did not answer in time
    #[error("Course store did not respond within {seconds}s")]
    Timeout { seconds: u64 },

    /// The session is not allowed to read or write this document
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The addressed document does not exist
    #[error("Course not found: {0}")]
    NotFound(String),

    /// WebSocket or I/O failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server sent something we did not expect
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A document could not be decoded into a course
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// The store refused the write for another reason
    #[error("Store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Map a server error code onto the taxonomy
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "permission-denied" => StoreError::PermissionDenied(message),
            "not-found" => StoreError::NotFound(message),
            "unavailable" => StoreError::Disconnected,
            _ => StoreError::Rejected(message),
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Disconnected | StoreError::Timeout { .. } | StoreError::Transport(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StoreError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Locally invalid input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Progress must be a percentage
    #[error("Progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    /// Input is not a whole number
    #[error("'{0}' is not a whole number")]
    InvalidNumber(String),

    /// Nothing was entered
    #[error("A value is required")]
    Empty,

    /// Session identity is incomplete
    #[error("Session {0} is not configured")]
    MissingSessionField(&'static str),
}
