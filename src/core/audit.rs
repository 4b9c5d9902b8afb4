//! Probe audit records.
//!
//! Every non-skipped probe writes exactly one audit row through the
//! [`AuditSink`] boundary, success or failure. Persistence is external;
//! the in-memory sink serves the demo daemon and tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker content for probe audit rows.
pub const PROBE_CONTENT: &str = "channel probe";
/// Marker content for failed probe audit rows.
pub const PROBE_FAILED_CONTENT: &str = "channel probe (failed)";

/// One probe audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub channel_id: i64,
    /// Model name after upstream alias mapping.
    pub model_name: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub quota: i64,
    pub content: String,
    pub use_time_seconds: i64,
    pub is_stream: bool,
    pub group: String,
    /// Classified failure cause, when the probe failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Consume-log row store boundary.
pub trait AuditSink: Send + Sync {
    /// Record one audit row.
    fn record(&self, entry: AuditEntry);
}

/// In-memory audit sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded rows.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit lock poisoned").clone()
    }

    /// Number of recorded rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit lock poisoned").len()
    }

    /// Whether no rows have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::debug!(
            channel_id = entry.channel_id,
            model = %entry.model_name,
            quota = entry.quota,
            error = entry.error.as_deref(),
            "audit row recorded"
        );
        self.entries.lock().expect("audit lock poisoned").push(entry);
    }
}
