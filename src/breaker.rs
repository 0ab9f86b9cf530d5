//! Circuit Breaker
//!
//! Lock-free guard against hammering a dead collector. Every send asks
//! for permission before touching the network and reports its outcome
//! after; repeated failures open the circuit, and a single half-open
//! trial per open period decides whether it closes again. All state
//! lives in atomics so the hot-path check allocates nothing and takes no
//! lock.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const HALF_OPEN: u8 = 2;

/// Observable circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// All sends permitted.
    Closed,
    /// Sends rejected until the open duration elapses.
    Open,
    /// One trial send in flight.
    HalfOpen,
}

impl BreakerState {
    fn from_tag(tag: u8) -> Self {
        match tag {
            OPEN => BreakerState::Open,
            HALF_OPEN => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }

    /// Lowercase label for logs and stats.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

/// Read-only breaker snapshot, for observability only.
#[derive(Debug, Clone, Copy)]
pub struct BreakerStats {
    /// Current state.
    pub state: BreakerState,
    /// Consecutive failures recorded since the last success.
    pub failure_count: u32,
    /// Whether the breaker is currently rejecting all traffic.
    pub is_open: bool,
}

pub(crate) struct CircuitBreaker {
    threshold: u32,
    open_duration: Duration,
    /// Origin of the monotonic last-failure timestamp.
    origin: Instant,
    state: AtomicU8,
    failure_count: AtomicU32,
    last_failure_nanos: AtomicU64,
}

impl CircuitBreaker {
    pub(crate) fn new(threshold: u32, open_duration: Duration) -> Self {
        Self {
            threshold,
            open_duration,
            origin: Instant::now(),
            state: AtomicU8::new(CLOSED),
            failure_count: AtomicU32::new(0),
            last_failure_nanos: AtomicU64::new(0),
        }
    }

    /// Asks permission to attempt a send.
    ///
    /// While open, the first caller past the open duration wins the
    /// compare-and-swap into half-open and runs the trial; every other
    /// caller is rejected, including ones that observe the trial still in
    /// flight.
    pub(crate) fn can_execute(&self) -> Result<()> {
        match BreakerState::from_tag(self.state.load(Ordering::SeqCst)) {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let last = Duration::from_nanos(self.last_failure_nanos.load(Ordering::SeqCst));
                if self.origin.elapsed().saturating_sub(last) >= self.open_duration
                    && self
                        .state
                        .compare_exchange(OPEN, HALF_OPEN, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    debug!("circuit breaker half-open, allowing trial send");
                    return Ok(());
                }
                Err(Error::CircuitOpen)
            }
            BreakerState::HalfOpen => Err(Error::CircuitOpen),
        }
    }

    /// Records a successful send.
    pub(crate) fn on_success(&self) {
        match BreakerState::from_tag(self.state.load(Ordering::SeqCst)) {
            BreakerState::HalfOpen => {
                self.state.store(CLOSED, Ordering::SeqCst);
                self.failure_count.store(0, Ordering::SeqCst);
                debug!("circuit breaker closed after successful trial");
            }
            BreakerState::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            BreakerState::Open => {}
        }
    }

    /// Records a failed send (reported once per pipeline call, after
    /// retries are exhausted).
    pub(crate) fn on_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_failure_nanos
            .store(self.origin.elapsed().as_nanos() as u64, Ordering::SeqCst);

        match BreakerState::from_tag(self.state.load(Ordering::SeqCst)) {
            BreakerState::HalfOpen => {
                self.state.store(OPEN, Ordering::SeqCst);
                warn!("circuit breaker re-opened after failed trial");
            }
            BreakerState::Closed if failures >= self.threshold => {
                self.state.store(OPEN, Ordering::SeqCst);
                warn!(failures = failures, "circuit breaker opened");
            }
            _ => {}
        }
    }

    /// Snapshot for observability; never used for control decisions.
    pub(crate) fn stats(&self) -> BreakerStats {
        let state = BreakerState::from_tag(self.state.load(Ordering::SeqCst));
        BreakerStats {
            state,
            failure_count: self.failure_count.load(Ordering::SeqCst),
            is_open: state == BreakerState::Open,
        }
    }
}
