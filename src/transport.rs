//! Transport Layer
//!
//! Dials the collector agent over a Unix domain socket or TCP and writes
//! newline-framed JSON documents with per-operation deadlines.

use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UnixStream};
use tokio::time::timeout;
use tracing::debug;

use crate::config::{Config, Transport};
use crate::error::{Error, Result};

/// A single live duplex stream to the agent.
///
/// Exclusively owned by one client and never reused after a failed write.
pub(crate) enum Connection {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Connection {
    /// Writes one wire frame, honoring the given write deadline.
    ///
    /// A zero deadline disables the write timeout.
    pub(crate) async fn write_frame(&mut self, frame: &[u8], deadline: Duration) -> Result<()> {
        let write = async {
            match self {
                Connection::Unix(stream) => stream.write_all(frame).await,
                Connection::Tcp(stream) => stream.write_all(frame).await,
            }
        };

        let written = if deadline > Duration::ZERO {
            match timeout(deadline, write).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "write deadline exceeded",
                )),
            }
        } else {
            write.await
        };

        written.map_err(|source| Error::Write { source })
    }
}

/// Dials the configured transport.
///
/// The deadline is derived from `config.timeout` when it is non-zero. A
/// caller needing a shorter deadline wraps the returned future in
/// `tokio::time::timeout`; dropping the future cancels the dial.
pub(crate) async fn connect(config: &Config) -> Result<Connection> {
    let dial = async {
        match config.transport {
            Transport::Unix => UnixStream::connect(&config.address)
                .await
                .map(Connection::Unix),
            Transport::Tcp => TcpStream::connect(&config.address)
                .await
                .map(Connection::Tcp),
        }
    };

    let dialed = if config.timeout > Duration::ZERO {
        match timeout(config.timeout, dial).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "connect deadline exceeded",
            )),
        }
    } else {
        dial.await
    };

    match dialed {
        Ok(conn) => {
            debug!(
                transport = config.transport.as_str(),
                address = %config.address,
                "connected to agent"
            );
            Ok(conn)
        }
        Err(source) => Err(Error::Connect {
            transport: config.transport.as_str(),
            address: config.address.clone(),
            source,
        }),
    }
}

/// Returns true when a collector agent socket exists at the given path.
///
/// A cheap liveness probe; it does not attempt a connection.
pub fn agent_running(socket_path: impl AsRef<Path>) -> bool {
    socket_path.as_ref().exists()
}
