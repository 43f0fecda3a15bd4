//! Progress events emitted per file by every stage

use serde::Serialize;
use std::fmt;

/// Stage that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transferring,
    Verifying,
    Deleting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Transferring => "Transfer",
            Stage::Verifying => "Verify",
            Stage::Deleting => "Delete",
        };
        f.write_str(label)
    }
}

/// What happened to the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemStatus {
    Copied,
    Skipped,
    Verified,
    Deleted,
    Failed { reason: String },
}

/// One processed file, emitted after the file is done regardless of outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 1-based position in the stage
    pub index: usize,
    pub total: usize,
    pub file_name: String,
    pub status: ItemStatus,
    pub size_bytes: u64,
    pub throughput_mbps: Option<f64>,
}

impl ProgressEvent {
    /// Completion of the stage after this file, 0.0 to 100.0
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.index as f64 * 100.0 / self.total as f64
    }
}

/// Optional callback used to receive progress events
pub type ProgressCallback<'a> = dyn Fn(&ProgressEvent) + Send + Sync + 'a;

pub(crate) fn emit_event(on_event: Option<&ProgressCallback<'_>>, event: ProgressEvent) {
    if let Some(callback) = on_event {
        callback(&event);
    }
}
