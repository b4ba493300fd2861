//! Replay report generation.

use segfit_core::{BucketSnapshot, HeapStats};
use serde::{Deserialize, Serialize};

/// Machine-readable result of replaying a script against a fresh heap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Schema version.
    pub version: String,
    /// Operations in the script.
    pub script_ops: usize,
    /// Operations executed (always equal to `script_ops` on success).
    pub executed: usize,
    /// Allocate/resize requests the heap declined (zero, oversized, or
    /// out of memory). Contract outcomes, not harness failures.
    pub denied_requests: usize,
    /// Slots still live when the script ended.
    pub live_at_end: usize,
    /// Final heap counters.
    pub stats: HeapStats,
    /// Final segment size in bytes.
    pub segment_size: usize,
    /// Total payload bytes on free lists at the end.
    pub free_bytes: usize,
    /// Free chunks at the end.
    pub free_chunks: usize,
    /// Final per-bucket free-list contents (non-empty buckets only).
    pub buckets: Vec<BucketSnapshot>,
}

impl ReplayReport {
    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a report from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
