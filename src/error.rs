//! Error types for tty-share.

use thiserror::Error;

/// Main error type for tty-share operations.
#[derive(Error, Debug)]
pub enum TtyShareError {
    /// Session with the given ID already exists.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Invalid connection state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::receiver::ConnectionState,
        to: crate::receiver::ConnectionState,
    },

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Envelope or payload was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload was not valid base64.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Frame was well-formed JSON but violated the wire contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection is closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl From<tokio_tungstenite::tungstenite::Error> for TtyShareError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

/// Convenience Result type for tty-share operations.
pub type Result<T> = std::result::Result<T, TtyShareError>;
