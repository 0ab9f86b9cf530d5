//! # logrelay
//!
//! Rust SDK for the LogRelay collector agent. Ships log entries,
//! batches, health pings, and authentication requests as
//! newline-delimited JSON over a persistent Unix-socket or TCP
//! connection.
//!
//! The send path tolerates transient connection loss: bounded retries
//! with exponential backoff and jitter, reconnects folded into the retry
//! loop, and a circuit breaker that stops hammering a dead agent. Async
//! mode decouples producers from network latency through a bounded queue
//! drained by a single background worker, and [`BatchClient`] amortizes
//! per-message overhead by batching entries.
//!
//! Delivery is fire-and-forget: a successful write is the only success
//! signal the protocol offers. Callers that need per-send outcomes in
//! async mode use the `_with_result` variants.
//!
//! ```no_run
//! use logrelay::{Client, Config};
//!
//! # async fn example() -> logrelay::Result<()> {
//! let client = Client::new(Config::unix(""));
//! client.send_log("service started", "my-service").await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod batch;
pub mod breaker;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

mod dispatch;

#[cfg(feature = "log-compat")]
pub mod compat;

// Re-export key types
pub use batch::{BatchClient, BatchStats};
pub use breaker::{BreakerState, BreakerStats};
pub use client::Client;
pub use config::{BatchConfig, Config, Transport};
pub use error::{Error, Result};
pub use transport::agent_running;
pub use types::{
    AuthRequest, AuthResponse, LogBatch, LogEntry, PayloadType, PingRequest, PongResponse,
    Severity, PROTOCOL_VERSION,
};

#[cfg(feature = "log-compat")]
pub use compat::RelayLogger;
