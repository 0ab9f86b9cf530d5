//! Client Error Types

use thiserror::Error;

/// Result type used across the SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the delivery client.
#[derive(Error, Debug)]
pub enum Error {
    /// Dialing the collector agent failed or hit the connect deadline.
    #[error("failed to connect to {transport}://{address}: {source}")]
    Connect {
        transport: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// A payload could not be serialized to its wire form.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing to the connection failed or hit the write deadline.
    #[error("failed to write to connection: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },

    /// The circuit breaker is rejecting traffic.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Every retry attempt failed; wraps the last underlying cause.
    #[error("send failed after {attempts} attempts: {source}")]
    SendExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The async queue is full; the request was dropped.
    #[error("async queue full, request dropped")]
    QueueFull,

    /// An async-only API was called on a client without async mode enabled.
    #[error("async mode not enabled")]
    AsyncDisabled,

    /// The client is shutting down; the request was not sent.
    #[error("client is shutting down")]
    ShuttingDown,

    /// The operation is not supported on the configured transport.
    #[error("{message}")]
    TransportUnsupported { message: String },
}

impl Error {
    pub(crate) fn transport_unsupported(message: impl Into<String>) -> Self {
        Self::TransportUnsupported {
            message: message.into(),
        }
    }
}
