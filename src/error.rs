//! Error types for sumwire-client.

use thiserror::Error;

/// Main error type for a checksum exchange.
///
/// Every variant is fatal: the exchange is one-shot and nothing is retried.
#[derive(Debug, Error)]
pub enum SumwireError {
    /// The TCP connection could not be opened.
    #[error("Failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A read delivered fewer bytes than the frame requires.
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Scanning stopped before the marker appeared.
    #[error("Marker not found: {reason}")]
    MarkerNotFound { reason: String },

    /// Framing is malformed (excess bytes, bad trailer).
    #[error("Protocol format error: {0}")]
    ProtocolFormat(String),

    /// Client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Peer closed the connection before sending its final line.
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (report output only).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using SumwireError.
pub type Result<T> = std::result::Result<T, SumwireError>;
