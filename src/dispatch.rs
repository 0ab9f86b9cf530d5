//! Async Dispatch Worker
//!
//! Decouples producers from network latency: enqueue is a non-blocking
//! try-send onto a bounded queue, and a single background worker drains
//! it through the send pipeline in submission order. A full queue drops
//! the request rather than blocking the producer.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::SendCore;
use crate::error::{Error, Result};
use crate::types::Payload;

/// One queued send plus the optional channel its result is delivered on.
pub(crate) struct DispatchRequest {
    pub(crate) payload: Payload,
    /// `None` makes the request fire-and-forget.
    pub(crate) reply: Option<oneshot::Sender<Result<()>>>,
}

pub(crate) struct Dispatcher {
    queue: mpsc::Sender<DispatchRequest>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Starts the worker and returns the producer handle.
    pub(crate) fn start(core: Arc<SendCore>, capacity: usize) -> Self {
        // tokio channels reject zero capacity.
        let (queue_tx, queue_rx) = mpsc::channel(capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let worker = tokio::spawn(run_worker(core, queue_rx, stop_rx));
        Self {
            queue: queue_tx,
            stop: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Attempts to queue a request without blocking.
    ///
    /// A full queue drops the request and fails with `QueueFull`; a queue
    /// whose worker has stopped fails with `ShuttingDown`. Either way the
    /// request's reply channel is dropped, never left dangling.
    pub(crate) fn enqueue(&self, request: DispatchRequest) -> Result<()> {
        match self.queue.try_send(request) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("async queue full, dropping request");
                Err(Error::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::ShuttingDown),
        }
    }

    /// Signals the worker to stop and waits for it to finish draining.
    ///
    /// Idempotent; later calls find nothing to stop.
    pub(crate) async fn shutdown(&self) {
        if let Some(stop) = self.stop.lock().await.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.lock().await.take() {
            let _ = worker.await;
        }
    }
}

/// Worker loop: one request at a time, in submission order.
async fn run_worker(
    core: Arc<SendCore>,
    mut queue: mpsc::Receiver<DispatchRequest>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!("async dispatch worker started");
    loop {
        tokio::select! {
            request = queue.recv() => {
                match request {
                    Some(request) => {
                        let result = core.send_with_retry(&request.payload).await;
                        if let Some(reply) = request.reply {
                            let _ = reply.send(result);
                        }
                    }
                    None => break,
                }
            }
            _ = &mut stop => {
                // Closing the queue fails further enqueues; whatever is
                // already buffered is drained undelivered.
                queue.close();
                while let Ok(request) = queue.try_recv() {
                    if let Some(reply) = request.reply {
                        let _ = reply.send(Err(Error::ShuttingDown));
                    }
                }
                break;
            }
        }
    }
    debug!("async dispatch worker stopped");
}
