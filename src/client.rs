//! Delivery Client
//!
//! The client facade and its send pipeline: circuit breaker gate,
//! connect-if-needed, serialize-and-write with deadlines, bounded retry
//! with backoff, and outcome reporting back into the breaker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tokio::time::sleep;
use tracing::debug;

use crate::backoff::delay_for_attempt;
use crate::breaker::{BreakerStats, CircuitBreaker};
use crate::config::{Config, Transport};
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::{Error, Result};
use crate::transport::{self, Connection};
use crate::types::{
    AuthRequest, AuthResponse, LogBatch, LogEntry, Payload, PingRequest, PongResponse,
};

/// Shared state driving the send pipeline.
///
/// Split from [`Client`] so the dispatch worker can run sends without
/// holding the client itself.
pub(crate) struct SendCore {
    pub(crate) config: Config,
    /// The single live connection behind the send mutex. One writer at a
    /// time owns connect+write; the slot is emptied after a failed write
    /// so the next attempt reconnects.
    conn: Mutex<Option<Connection>>,
    breaker: CircuitBreaker,
    /// Set at close; checked between retry attempts.
    closed: AtomicBool,
}

impl SendCore {
    fn new(config: Config) -> Self {
        let breaker = CircuitBreaker::new(config.breaker_threshold, config.breaker_open_duration);
        Self {
            config,
            conn: Mutex::new(None),
            breaker,
            closed: AtomicBool::new(false),
        }
    }

    /// Runs the full retry pipeline for one payload.
    ///
    /// The breaker is consulted once up front and charged once at the
    /// end: a rejection costs nothing, a success after any number of
    /// attempts counts as one success, exhaustion counts as one failure.
    pub(crate) async fn send_with_retry(&self, payload: &Payload) -> Result<()> {
        self.breaker.can_execute()?;

        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                if self.closed.load(Ordering::SeqCst) {
                    // Aborted mid-retry; the breaker is not charged.
                    return Err(Error::ShuttingDown);
                }
                let delay = delay_for_attempt(&self.config, attempt);
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying send"
                );
                sleep(delay).await;
            }

            let mut slot = self.conn.lock().await;

            let mut conn = match slot.take() {
                Some(conn) => conn,
                None => match transport::connect(&self.config).await {
                    Ok(conn) => conn,
                    Err(error) => {
                        debug!(attempt = attempt, error = %error, "connect failed");
                        last_error = Some(error);
                        continue;
                    }
                },
            };

            let frame = match payload.encode() {
                Ok(frame) => frame,
                Err(error) => {
                    // The connection is discarded along with the attempt.
                    last_error = Some(error);
                    continue;
                }
            };

            match conn.write_frame(&frame, self.config.timeout).await {
                Ok(()) => {
                    *slot = Some(conn);
                    self.breaker.on_success();
                    return Ok(());
                }
                Err(error) => {
                    debug!(attempt = attempt, error = %error, "write failed, dropping connection");
                    last_error = Some(error);
                }
            }
        }

        self.breaker.on_failure();
        Err(Error::SendExhausted {
            attempts: self.config.max_retries + 1,
            source: Box::new(last_error.unwrap_or_else(|| Error::Write {
                source: std::io::Error::new(std::io::ErrorKind::Other, "no send attempt completed"),
            })),
        })
    }
}

/// Client for the LogRelay collector agent.
///
/// Supports Unix socket and TCP transports, synchronous and asynchronous
/// sending, bounded retries with exponential backoff, and circuit breaker
/// protection. Concurrent callers are safe: the send path is serialized
/// by an internal mutex, and async-mode sends flow through a single
/// background worker in submission order.
pub struct Client {
    core: Arc<SendCore>,
    dispatcher: Option<Dispatcher>,
}

impl Client {
    /// Creates a client. Async mode starts the dispatch worker
    /// immediately, so this must run inside a tokio runtime.
    pub fn new(config: Config) -> Self {
        let core = Arc::new(SendCore::new(config));
        let dispatcher = if core.config.async_mode {
            Some(Dispatcher::start(core.clone(), core.config.queue_capacity))
        } else {
            None
        };
        Self { core, dispatcher }
    }

    /// Client for an agent on a Unix socket; empty path uses the default.
    pub fn unix(socket_path: impl Into<String>) -> Self {
        Self::new(Config::unix(socket_path))
    }

    /// Client for an agent over TCP; see [`Config::tcp`] for fallbacks.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new(Config::tcp(host, port))
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &Config {
        &self.core.config
    }

    /// Eagerly establishes the connection, replacing any previous one.
    ///
    /// Optional: sends connect on demand. The dial honors the configured
    /// timeout; wrap in `tokio::time::timeout` for a shorter deadline.
    pub async fn connect(&self) -> Result<()> {
        let conn = transport::connect(&self.core.config).await?;
        *self.core.conn.lock().await = Some(conn);
        Ok(())
    }

    /// Sends one log message with default entry settings.
    pub async fn send_log(
        &self,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<()> {
        self.send_entry(LogEntry::new(message, source)).await
    }

    /// Sends a log entry, stamping the timestamp when absent.
    ///
    /// In async mode the entry is queued fire-and-forget: a full queue
    /// fails with [`Error::QueueFull`], and a send failure after queueing
    /// is never surfaced. Use [`Client::send_entry_with_result`] to
    /// observe the outcome.
    pub async fn send_entry(&self, mut entry: LogEntry) -> Result<()> {
        entry.ensure_timestamp();
        let payload = Payload::Entry(entry);
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.enqueue(DispatchRequest {
                payload,
                reply: None,
            }),
            None => self.core.send_with_retry(&payload).await,
        }
    }

    /// Sends multiple entries as one batch document.
    pub async fn send_batch(&self, mut entries: Vec<LogEntry>) -> Result<()> {
        for entry in &mut entries {
            entry.ensure_timestamp();
        }
        let payload = Payload::Batch(LogBatch::new(entries));
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.enqueue(DispatchRequest {
                payload,
                reply: None,
            }),
            None => self.core.send_with_retry(&payload).await,
        }
    }

    /// Queues an entry and returns a receiver resolving with the send
    /// outcome once the worker has processed it.
    ///
    /// Fails synchronously with [`Error::AsyncDisabled`] when async mode
    /// is off and [`Error::QueueFull`] when the queue is full.
    pub fn send_entry_with_result(
        &self,
        mut entry: LogEntry,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        entry.ensure_timestamp();
        self.enqueue_with_result(Payload::Entry(entry))
    }

    /// Batch variant of [`Client::send_entry_with_result`].
    pub fn send_batch_with_result(
        &self,
        mut entries: Vec<LogEntry>,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        for entry in &mut entries {
            entry.ensure_timestamp();
        }
        self.enqueue_with_result(Payload::Batch(LogBatch::new(entries)))
    }

    fn enqueue_with_result(&self, payload: Payload) -> Result<oneshot::Receiver<Result<()>>> {
        let dispatcher = self.dispatcher.as_ref().ok_or(Error::AsyncDisabled)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        dispatcher.enqueue(DispatchRequest {
            payload,
            reply: Some(reply_tx),
        })?;
        Ok(reply_rx)
    }

    /// Non-blocking fire-and-forget enqueue, callable outside async
    /// contexts.
    ///
    /// Requires async mode; used by logging adapters that cannot await.
    pub fn try_send_entry(&self, mut entry: LogEntry) -> Result<()> {
        let dispatcher = self.dispatcher.as_ref().ok_or(Error::AsyncDisabled)?;
        entry.ensure_timestamp();
        dispatcher.enqueue(DispatchRequest {
            payload: Payload::Entry(entry),
            reply: None,
        })
    }

    /// Health check: writes a ping document and synthesizes the pong.
    ///
    /// The protocol has no reply channel, so a successful write is the
    /// entire check. Always uses the synchronous pipeline, even in async
    /// mode.
    pub async fn ping(&self) -> Result<PongResponse> {
        self.core
            .send_with_retry(&Payload::Ping(PingRequest::new()))
            .await?;
        Ok(PongResponse {
            status: "pong".to_string(),
        })
    }

    /// Authenticates with the configured shared secret.
    ///
    /// Rejected locally before any network activity unless the transport
    /// is TCP and a shared secret is configured. Fire-and-forget like
    /// ping: a successful write synthesizes the success response.
    pub async fn authenticate(&self) -> Result<AuthResponse> {
        if self.core.config.transport != Transport::Tcp {
            return Err(Error::transport_unsupported(
                "authentication is only supported on TCP transports",
            ));
        }
        if self.core.config.shared_secret.is_empty() {
            return Err(Error::transport_unsupported(
                "a shared secret is required for TCP authentication",
            ));
        }

        let request = AuthRequest::new(self.core.config.shared_secret.clone());
        self.core.send_with_retry(&Payload::Auth(request)).await?;
        Ok(AuthResponse {
            status: "success".to_string(),
            message: "authentication successful".to_string(),
        })
    }

    /// Current circuit breaker snapshot, for observability only.
    pub fn breaker_stats(&self) -> BreakerStats {
        self.core.breaker.stats()
    }

    /// Closes the client.
    ///
    /// Stops the dispatch worker (draining its queue with
    /// [`Error::ShuttingDown`]), aborts in-flight retry loops at their
    /// next attempt boundary, then releases the connection. Idempotent; a
    /// second close is a no-op.
    pub async fn close(&self) -> Result<()> {
        self.core.closed.store(true, Ordering::SeqCst);
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown().await;
        }
        *self.core.conn.lock().await = None;
        Ok(())
    }
}
