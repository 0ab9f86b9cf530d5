//! Wire Payload Types
//!
//! JSON document shapes accepted by the collector agent, one document per
//! newline-terminated frame. Field names match the agent API v1 contract.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Protocol version stamped on outbound documents.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Entry type for standard log entries, the only type the agent accepts.
pub const ENTRY_TYPE_LOG: u8 = 1;

/// Maximum entries the agent accepts in a single batch.
pub const MAX_BATCH_ENTRIES: usize = 100;

/// Syslog severity levels, 1 (highest) through 8 (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// System is unusable.
    Emergency = 1,
    /// Action must be taken immediately.
    Alert = 2,
    /// Critical conditions.
    Critical = 3,
    /// Error conditions.
    Error = 4,
    /// Warning conditions.
    Warning = 5,
    /// Normal but significant condition.
    Notice = 6,
    /// Informational messages.
    Info = 7,
    /// Debug-level messages.
    Debug = 8,
}

impl Severity {
    /// Maps a numeric syslog level; out-of-range values fall back to `Info`.
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => Severity::Emergency,
            2 => Severity::Alert,
            3 => Severity::Critical,
            4 => Severity::Error,
            5 => Severity::Warning,
            6 => Severity::Notice,
            8 => Severity::Debug,
            _ => Severity::Info,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Severity::from_level(u8::deserialize(deserializer)?))
    }
}

/// Identifies the structure of a log payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    /// Plain text.
    Generic,
    /// A JSON document.
    GenericJson,
}

impl PayloadType {
    /// Sniffs a payload: valid JSON is tagged `generic_json`.
    pub fn detect(payload: &str) -> Self {
        if serde_json::from_str::<serde_json::Value>(payload).is_ok() {
            PayloadType::GenericJson
        } else {
            PayloadType::Generic
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Free-form string metadata attached to the entry.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The log text or serialized structured payload.
    pub payload: String,
    /// Identifier of the producing component.
    pub source: String,
    /// RFC3339 timestamp; the client stamps it when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Payload structure hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<PayloadType>,
    /// Entry type; always [`ENTRY_TYPE_LOG`].
    pub entry_type: u8,
    /// Syslog severity.
    pub log_level: Severity,
}

impl LogEntry {
    /// Creates an entry with defaults: `Info` severity, auto-detected
    /// payload type, the current timestamp, and "unknown" as the source
    /// when the given one is empty.
    pub fn new(payload: impl Into<String>, source: impl Into<String>) -> Self {
        let payload = payload.into();
        let source = source.into();
        let payload_type = PayloadType::detect(&payload);
        Self {
            metadata: HashMap::new(),
            version: Some(PROTOCOL_VERSION.to_string()),
            payload,
            source: if source.is_empty() {
                "unknown".to_string()
            } else {
                source
            },
            timestamp: Some(now_rfc3339()),
            payload_type: Some(payload_type),
            entry_type: ENTRY_TYPE_LOG,
            log_level: Severity::Info,
        }
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.log_level = severity;
        self
    }

    /// Sets a numeric syslog level (1-8); out-of-range falls back to `Info`.
    pub fn with_level(self, level: u8) -> Self {
        self.with_severity(Severity::from_level(level))
    }

    /// Replaces the source; empty falls back to "unknown".
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = if source.is_empty() {
            "unknown".to_string()
        } else {
            source
        };
        self
    }

    /// Adds one metadata pair; empty keys are ignored.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.metadata.insert(key, value.into());
        }
        self
    }

    /// Merges a metadata map into the entry.
    pub fn with_all_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Sets an explicit timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
        self
    }

    /// Sets a pre-formatted RFC3339 timestamp.
    pub fn with_timestamp_str(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the payload type hint.
    pub fn with_payload_type(mut self, payload_type: PayloadType) -> Self {
        self.payload_type = Some(payload_type);
        self
    }

    /// Sets the protocol version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Stamps the current time when no timestamp was provided.
    pub(crate) fn ensure_timestamp(&mut self) {
        if self.timestamp.as_deref().map_or(true, str::is_empty) {
            self.timestamp = Some(now_rfc3339());
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A batch of log entries sent as one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogBatch {
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The batched entries (1-100 items).
    pub entries: Vec<LogEntry>,
}

impl LogBatch {
    /// Wraps entries with the current protocol version.
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            version: Some(PROTOCOL_VERSION.to_string()),
            entries,
        }
    }
}

/// Health check request.
///
/// The protocol has no reply channel; the write succeeding is the entire
/// check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRequest {
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Always "ping".
    pub action: String,
}

impl PingRequest {
    pub fn new() -> Self {
        Self {
            version: Some(PROTOCOL_VERSION.to_string()),
            action: "ping".to_string(),
        }
    }
}

impl Default for PingRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Result synthesized locally for a successful ping write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongResponse {
    pub status: String,
}

/// Authentication request, only meaningful over TCP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Always "authenticate".
    pub action: String,
    /// Shared secret validated by the agent.
    pub shared_secret: String,
}

impl AuthRequest {
    pub fn new(shared_secret: impl Into<String>) -> Self {
        Self {
            version: Some(PROTOCOL_VERSION.to_string()),
            action: "authenticate".to_string(),
            shared_secret: shared_secret.into(),
        }
    }
}

/// Result synthesized locally for a successful authentication write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub status: String,
    pub message: String,
}

/// One outbound wire unit.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum Payload {
    Entry(LogEntry),
    Batch(LogBatch),
    Ping(PingRequest),
    Auth(AuthRequest),
}

impl Payload {
    /// Serializes to the newline-framed wire form.
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let mut frame = serde_json::to_vec(self)?;
        frame.push(b'\n');
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_api_field_names() {
        let entry = LogEntry::new("disk almost full", "monitor")
            .with_severity(Severity::Warning)
            .with_metadata("host", "db-1");
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["payload"], "disk almost full");
        assert_eq!(value["source"], "monitor");
        assert_eq!(value["logLevel"], 5);
        assert_eq!(value["entryType"], 1);
        assert_eq!(value["payloadType"], "generic");
        assert_eq!(value["version"], PROTOCOL_VERSION);
        assert_eq!(value["metadata"]["host"], "db-1");
        assert!(value["timestamp"].as_str().is_some());
    }

    #[test]
    fn empty_metadata_is_omitted() {
        let entry = LogEntry::new("plain", "test");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn json_payloads_are_detected() {
        assert_eq!(PayloadType::detect(r#"{"a": 1}"#), PayloadType::GenericJson);
        assert_eq!(PayloadType::detect("plain text"), PayloadType::Generic);

        let entry = LogEntry::new(r#"{"event": "login"}"#, "auth");
        assert_eq!(entry.payload_type, Some(PayloadType::GenericJson));
    }

    #[test]
    fn out_of_range_levels_fall_back_to_info() {
        assert_eq!(Severity::from_level(0), Severity::Info);
        assert_eq!(Severity::from_level(9), Severity::Info);
        assert_eq!(Severity::from_level(3), Severity::Critical);

        let entry = LogEntry::new("x", "y").with_level(42);
        assert_eq!(entry.log_level, Severity::Info);
    }

    #[test]
    fn empty_source_defaults_to_unknown() {
        let entry = LogEntry::new("x", "");
        assert_eq!(entry.source, "unknown");

        let entry = entry.with_source("");
        assert_eq!(entry.source, "unknown");
    }

    #[test]
    fn empty_metadata_keys_are_ignored() {
        let entry = LogEntry::new("x", "y").with_metadata("", "dropped");
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn batch_carries_protocol_version() {
        let batch = LogBatch::new(vec![LogEntry::new("a", "s"), LogEntry::new("b", "s")]);
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["version"], PROTOCOL_VERSION);
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn control_documents_carry_actions() {
        let ping = serde_json::to_value(PingRequest::new()).unwrap();
        assert_eq!(ping["action"], "ping");

        let auth = serde_json::to_value(AuthRequest::new("s3cret")).unwrap();
        assert_eq!(auth["action"], "authenticate");
        assert_eq!(auth["shared_secret"], "s3cret");
    }

    #[test]
    fn encode_appends_newline() {
        let frame = Payload::Ping(PingRequest::new()).encode().unwrap();
        assert_eq!(*frame.last().unwrap(), b'\n');
        assert!(!frame[..frame.len() - 1].contains(&b'\n'));
    }

    #[test]
    fn ensure_timestamp_fills_missing_only() {
        let mut entry = LogEntry::new("x", "y");
        entry.timestamp = None;
        entry.ensure_timestamp();
        assert!(entry.timestamp.is_some());

        let mut entry = LogEntry::new("x", "y").with_timestamp_str("2026-01-01T00:00:00Z");
        entry.ensure_timestamp();
        assert_eq!(entry.timestamp.as_deref(), Some("2026-01-01T00:00:00Z"));
    }
}
