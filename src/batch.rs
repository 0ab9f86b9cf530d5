//! Batching Layer
//!
//! Wraps a client with a pending buffer that amortizes per-message
//! overhead: entries accumulate until a size threshold, the auto-flush
//! timer, a manual flush, or close pushes them out as one batch document.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::client::Client;
use crate::config::BatchConfig;
use crate::error::Result;
use crate::types::{AuthResponse, LogEntry, PongResponse};

/// Snapshot of batcher state.
#[derive(Debug, Clone, Copy)]
pub struct BatchStats {
    /// Entries currently buffered.
    pub pending_entries: usize,
    /// Size threshold that forces a flush.
    pub max_batch_size: usize,
    /// Auto-flush interval.
    pub flush_interval: Duration,
    /// Whether the auto-flush timer is enabled.
    pub auto_flush: bool,
}

/// Buffer plus timer bookkeeping, all under one lock so a flush, an
/// append, and a timer callback can never observe torn state.
struct BatchState {
    buffer: Vec<LogEntry>,
    /// Identifies the currently armed timer. Stale timers observe a newer
    /// generation and do nothing, so rearming never cancels an in-flight
    /// flush. Bumped on every rearm and on close.
    timer_generation: u64,
    stopped: bool,
}

struct BatchInner {
    client: Client,
    config: BatchConfig,
    state: Mutex<BatchState>,
}

impl BatchInner {
    fn timer_enabled(&self) -> bool {
        self.config.auto_flush && !self.config.flush_interval.is_zero()
    }

    /// Arms a fresh auto-flush timer; must hold the state lock.
    fn arm_timer(inner: &Arc<Self>, state: &mut BatchState) {
        state.timer_generation += 1;
        Self::spawn_timer(inner, state.timer_generation);
    }

    fn spawn_timer(inner: &Arc<Self>, generation: u64) {
        let inner = inner.clone();
        tokio::spawn(async move {
            sleep(inner.config.flush_interval).await;
            let mut state = inner.state.lock().await;
            if state.timer_generation != generation || state.stopped || state.buffer.is_empty() {
                return;
            }
            if let Err(error) = Self::flush_locked(&inner, &mut state).await {
                // Timer-driven flushes are best-effort; callers that need
                // delivery guarantees flush manually and handle the error.
                debug!(error = %error, "auto-flush failed");
            }
        });
    }

    /// Flushes the buffer; must hold the state lock.
    ///
    /// The buffer is cleared before the network call, so a failed flush
    /// never retains data, and the timer is rearmed before the call so a
    /// slow send cannot delay the next cycle.
    async fn flush_locked(inner: &Arc<Self>, state: &mut BatchState) -> Result<()> {
        if state.buffer.is_empty() {
            return Ok(());
        }

        let pending = mem::take(&mut state.buffer);

        if inner.timer_enabled() && !state.stopped {
            Self::arm_timer(inner, state);
        }

        trace!(entries = pending.len(), "flushing batch");
        inner.client.send_batch(pending).await
    }
}

/// Client wrapper that batches log entries.
///
/// The buffer, the auto-flush timer, and the closed flag share one lock:
/// at most one flush is in flight at a time, and timer callbacks can
/// never run concurrently with an append or a close.
pub struct BatchClient {
    inner: Arc<BatchInner>,
}

impl BatchClient {
    /// Wraps a client with batching.
    ///
    /// Arms the auto-flush timer immediately when enabled, so this must
    /// run inside a tokio runtime.
    pub fn new(client: Client, config: BatchConfig) -> Self {
        let arm = config.auto_flush && !config.flush_interval.is_zero();
        let inner = Arc::new(BatchInner {
            client,
            config,
            state: Mutex::new(BatchState {
                buffer: Vec::new(),
                timer_generation: u64::from(arm),
                stopped: false,
            }),
        });

        if arm {
            BatchInner::spawn_timer(&inner, 1);
        }

        Self { inner }
    }

    /// Batching client for an agent on a Unix socket.
    pub fn unix(socket_path: impl Into<String>, config: BatchConfig) -> Self {
        Self::new(Client::unix(socket_path), config)
    }

    /// Batching client for an agent over TCP.
    pub fn tcp(host: impl Into<String>, port: u16, config: BatchConfig) -> Self {
        Self::new(Client::tcp(host, port), config)
    }

    /// Eagerly connects the wrapped client.
    pub async fn connect(&self) -> Result<()> {
        self.inner.client.connect().await
    }

    /// Buffers one log message; see [`BatchClient::send_entry`].
    pub async fn send_log(
        &self,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<()> {
        self.send_entry(LogEntry::new(message, source)).await
    }

    /// Buffers an entry, flushing synchronously when the buffer reaches
    /// the configured maximum size.
    ///
    /// After close, entries bypass the buffer and go straight through the
    /// wrapped client.
    pub async fn send_entry(&self, entry: LogEntry) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        if state.stopped {
            drop(state);
            return self.inner.client.send_entry(entry).await;
        }

        state.buffer.push(entry);

        if state.buffer.len() >= self.inner.config.max_batch_size {
            return BatchInner::flush_locked(&self.inner, &mut state).await;
        }

        Ok(())
    }

    /// Flushes buffered entries now. An empty buffer is an Ok no-op.
    ///
    /// The buffer is cleared whether or not the send succeeds; on error
    /// the entries are gone and the error is returned to the caller.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        BatchInner::flush_locked(&self.inner, &mut state).await
    }

    /// Batcher state snapshot.
    pub async fn stats(&self) -> BatchStats {
        let state = self.inner.state.lock().await;
        BatchStats {
            pending_entries: state.buffer.len(),
            max_batch_size: self.inner.config.max_batch_size,
            flush_interval: self.inner.config.flush_interval,
            auto_flush: self.inner.config.auto_flush,
        }
    }

    /// Health check through the wrapped client, bypassing the buffer.
    pub async fn ping(&self) -> Result<PongResponse> {
        self.inner.client.ping().await
    }

    /// TCP authentication through the wrapped client, bypassing the
    /// buffer.
    pub async fn authenticate(&self) -> Result<AuthResponse> {
        self.inner.client.authenticate().await
    }

    /// Closes the batcher.
    ///
    /// Stops the timer, flushes any remaining entries best-effort, then
    /// closes the wrapped client. Idempotent; a second close finds an
    /// empty buffer and a stopped timer.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.stopped = true;
        state.timer_generation += 1; // disarms any pending timer

        if !state.buffer.is_empty() {
            if let Err(error) = BatchInner::flush_locked(&self.inner, &mut state).await {
                debug!(error = %error, "final flush failed during close");
            }
        }
        drop(state);

        self.inner.client.close().await
    }
}
