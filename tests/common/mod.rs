//! Shared test fixture: a stub collector agent on a Unix socket that
//! records every newline-delimited document it receives.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Mutex;

use logrelay::Config;

pub struct AgentStub {
    _dir: tempfile::TempDir,
    pub path: PathBuf,
    lines: Arc<Mutex<Vec<String>>>,
}

impl AgentStub {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("agent.sock");
        let listener = UnixListener::bind(&path).expect("bind stub socket");
        let lines = Arc::new(Mutex::new(Vec::new()));

        let sink = lines.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let sink = sink.clone();
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream).lines();
                    while let Ok(Some(line)) = reader.next_line().await {
                        sink.lock().await.push(line);
                    }
                });
            }
        });

        Self {
            _dir: dir,
            path,
            lines,
        }
    }

    /// Synchronous-mode config pointed at the stub.
    pub fn sync_config(&self) -> Config {
        Config {
            async_mode: false,
            ..Config::unix(self.path.to_string_lossy().into_owned())
        }
    }

    /// Async-mode config pointed at the stub.
    pub fn async_config(&self) -> Config {
        Config {
            async_mode: true,
            ..Config::unix(self.path.to_string_lossy().into_owned())
        }
    }

    /// Waits until the stub has received at least `count` documents.
    pub async fn wait_for_lines(&self, count: usize) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            {
                let lines = self.lines.lock().await;
                if lines.len() >= count {
                    return lines.clone();
                }
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {count} documents"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Documents received so far.
    pub async fn received(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }
}

/// Config pointed at a socket path nothing can ever listen on: the
/// directory holding it is deleted before this function returns.
pub fn unreachable_config() -> Config {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("no-agent.sock");
    Config {
        async_mode: false,
        max_retries: 0,
        retry_delay: Duration::from_millis(10),
        jitter_fraction: 0.0,
        breaker_threshold: 100,
        ..Config::unix(path.to_string_lossy().into_owned())
    }
}
