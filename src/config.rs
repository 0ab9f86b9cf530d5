//! Client Configuration
//!
//! Connection, retry, async, and circuit breaker settings for the
//! delivery client, plus batching settings for [`crate::BatchClient`].
//! A `Config` is immutable once a client has been constructed with it.

use std::fmt;
use std::time::Duration;

/// Default Unix socket path of the collector agent.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/logrelay-agent.sock";
/// Host used when a TCP configuration omits one.
pub const DEFAULT_TCP_HOST: &str = "localhost";
/// Port used when a TCP configuration has an invalid one.
pub const DEFAULT_TCP_PORT: u16 = 8080;

/// Default deadline applied to connects and writes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default initial retry delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Default upper bound on the retry delay.
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Default backoff multiplier.
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
/// Default jitter fraction.
pub const DEFAULT_JITTER_FRACTION: f64 = 0.1;
/// Default maximum retry attempts after the initial one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default capacity of the async request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
/// Default consecutive failures before the circuit opens.
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
/// Default duration the circuit stays open.
pub const DEFAULT_BREAKER_OPEN_DURATION: Duration = Duration::from_secs(30);
/// Default maximum entries buffered before a batch flush is forced.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
/// Default auto-flush interval for partial batches.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Transport used to reach the collector agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Unix domain socket, addressed by filesystem path.
    #[default]
    Unix,
    /// TCP, addressed as host:port.
    Tcp,
}

impl Transport {
    /// Scheme label used in addresses and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Unix => "unix",
            Transport::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the delivery client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Transport used to reach the agent.
    pub transport: Transport,
    /// Socket path for unix, host:port for tcp.
    pub address: String,
    /// Shared secret for TCP authentication; empty means unauthenticated.
    pub shared_secret: String,
    /// Deadline applied to connects and writes. Zero disables deadlines.
    pub timeout: Duration,
    /// Maximum retry attempts after the initial one.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub retry_delay: Duration,
    /// Upper bound on the retry delay.
    pub max_retry_delay: Duration,
    /// Backoff multiplier applied per attempt, e.g. 2.0 for doubling.
    pub retry_multiplier: f64,
    /// Jitter fraction (0.0-1.0) applied to backoff delays.
    pub jitter_fraction: f64,
    /// Route sends through the background dispatch worker.
    pub async_mode: bool,
    /// Capacity of the async request queue.
    pub queue_capacity: usize,
    /// Consecutive failures before the circuit opens.
    pub breaker_threshold: u32,
    /// How long the circuit stays open before a half-open trial.
    pub breaker_open_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Unix,
            address: DEFAULT_SOCKET_PATH.to_string(),
            shared_secret: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            retry_multiplier: DEFAULT_RETRY_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
            async_mode: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_open_duration: DEFAULT_BREAKER_OPEN_DURATION,
        }
    }
}

impl Config {
    /// Configuration for an agent listening on a Unix socket.
    ///
    /// An empty path falls back to [`DEFAULT_SOCKET_PATH`].
    pub fn unix(socket_path: impl Into<String>) -> Self {
        let path = socket_path.into();
        Self {
            transport: Transport::Unix,
            address: if path.is_empty() {
                DEFAULT_SOCKET_PATH.to_string()
            } else {
                path
            },
            ..Self::default()
        }
    }

    /// Configuration for an agent listening on TCP.
    ///
    /// An empty host falls back to [`DEFAULT_TCP_HOST`] and port 0 to
    /// [`DEFAULT_TCP_PORT`]; invalid inputs never fail construction.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let host = if host.is_empty() {
            DEFAULT_TCP_HOST.to_string()
        } else {
            host
        };
        let port = if port == 0 { DEFAULT_TCP_PORT } else { port };
        Self {
            transport: Transport::Tcp,
            address: format!("{}:{}", host, port),
            ..Self::default()
        }
    }
}

/// Configuration for the batching layer.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Entries buffered before a flush is forced.
    pub max_batch_size: usize,
    /// How long a partial batch waits before the auto-flush timer fires.
    pub flush_interval: Duration,
    /// Whether the auto-flush timer runs at all.
    pub auto_flush: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            auto_flush: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_unix_socket() {
        let config = Config::default();
        assert_eq!(config.transport, Transport::Unix);
        assert_eq!(config.address, DEFAULT_SOCKET_PATH);
        assert!(config.async_mode);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn unix_config_defaults_empty_path() {
        let config = Config::unix("");
        assert_eq!(config.address, DEFAULT_SOCKET_PATH);

        let config = Config::unix("/run/agent.sock");
        assert_eq!(config.address, "/run/agent.sock");
    }

    #[test]
    fn tcp_config_falls_back_on_invalid_inputs() {
        let config = Config::tcp("", 0);
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.address, "localhost:8080");

        let config = Config::tcp("10.0.0.7", 9090);
        assert_eq!(config.address, "10.0.0.7:9090");
    }

    #[test]
    fn transport_labels() {
        assert_eq!(Transport::Unix.as_str(), "unix");
        assert_eq!(Transport::Tcp.to_string(), "tcp");
    }
}
