//! Standard Logging Facade Adapter
//!
//! Bridges the `log` crate to the delivery client: records become
//! fire-and-forget entries on an async-mode client. Send failures are
//! dropped, as the `log::Log` contract offers no way to surface them.

use std::sync::Arc;

use crate::client::Client;
use crate::types::{LogEntry, Severity};

/// `log::Log` implementation forwarding records to the collector agent.
///
/// The client must have async mode enabled: `log` methods cannot await,
/// so records go through the non-blocking enqueue, and a full queue drops
/// the record rather than blocking the logging call site.
pub struct RelayLogger {
    client: Arc<Client>,
    source: String,
    max_level: log::LevelFilter,
}

impl RelayLogger {
    /// Creates an adapter; an empty source falls back to "log".
    pub fn new(client: Arc<Client>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            client,
            source: if source.is_empty() {
                "log".to_string()
            } else {
                source
            },
            max_level: log::LevelFilter::Trace,
        }
    }

    /// Limits which records are forwarded.
    pub fn with_max_level(mut self, max_level: log::LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Installs the adapter as the global logger.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

fn severity_for(level: log::Level) -> Severity {
    match level {
        log::Level::Error => Severity::Error,
        log::Level::Warn => Severity::Warning,
        log::Level::Info => Severity::Info,
        log::Level::Debug | log::Level::Trace => Severity::Debug,
    }
}

impl log::Log for RelayLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::new(record.args().to_string(), self.source.clone())
            .with_severity(severity_for(record.level()))
            .with_metadata("target", record.target());

        // Dropped on queue-full or shutdown; the facade has no error path.
        let _ = self.client.try_send_entry(entry);
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_syslog_severities() {
        assert_eq!(severity_for(log::Level::Error), Severity::Error);
        assert_eq!(severity_for(log::Level::Warn), Severity::Warning);
        assert_eq!(severity_for(log::Level::Info), Severity::Info);
        assert_eq!(severity_for(log::Level::Debug), Severity::Debug);
        assert_eq!(severity_for(log::Level::Trace), Severity::Debug);
    }

    #[tokio::test]
    async fn logging_never_panics_on_sync_client() {
        use log::Log;

        // Async mode off: the adapter's enqueue fails and is swallowed.
        let client = Arc::new(Client::new(crate::config::Config {
            async_mode: false,
            ..crate::config::Config::unix("/tmp/nonexistent-agent.sock")
        }));
        let logger = RelayLogger::new(client, "adapter-test");

        logger.log(
            &log::Record::builder()
                .args(format_args!("dropped quietly"))
                .level(log::Level::Info)
                .target("adapter-test")
                .build(),
        );
    }
}
