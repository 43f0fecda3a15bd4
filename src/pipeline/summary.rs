//! End-of-run summary

use super::{Pipeline, PipelineState};
use crate::device::DeviceCapability;
use crate::executor::{SpaceReport, TransferStats};
use crate::types::{DeletionOutcome, Stage, TransferOutcome};
use crate::verify::mismatch_error;
use serde::Serialize;
use std::path::PathBuf;

/// One file that did not make it through a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub stage: Stage,
    pub file_name: String,
    pub reason: String,
}

/// Counts and failures for a whole run; printed by `--json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Dated folder the run copied into
    pub destination: PathBuf,
    pub device: String,
    pub state: PipelineState,
    pub discovered: usize,
    pub bytes_discovered: u64,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    pub verified: usize,
    pub verification_failed: usize,
    /// Deletion was confirmed and attempted
    pub deletion_requested: bool,
    pub deleted: usize,
    pub deletion_failed: usize,
    pub space: Option<SpaceReport>,
    /// Run stopped by the user before copying
    pub cancelled: bool,
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    pub(crate) fn collect<D: DeviceCapability + ?Sized>(pipeline: &Pipeline<'_, D>) -> Self {
        let manifest = &pipeline.manifest;
        let transfers = pipeline.transfers.as_slice();
        let verification = pipeline.verification.as_ref();
        let deletions = pipeline.deletions.as_slice();

        let stats = TransferStats::from_results(transfers);
        let mut failures = Vec::new();

        for result in transfers {
            if let TransferOutcome::Failed { reason } = &result.outcome {
                failures.push(FailureRecord {
                    stage: Stage::Transferring,
                    file_name: result.entry.file_name.clone(),
                    reason: reason.clone(),
                });
            }
        }

        if let Some(verification) = verification {
            for failure in verification.failed() {
                let reason = match manifest.iter().find(|e| e.file_name == failure.file_name) {
                    Some(entry) => mismatch_error(entry, &failure.reason).to_string(),
                    None => format!("{:?}", failure.reason),
                };
                failures.push(FailureRecord {
                    stage: Stage::Verifying,
                    file_name: failure.file_name.clone(),
                    reason,
                });
            }
        }

        for result in deletions {
            if let DeletionOutcome::Failed { reason } = &result.outcome {
                failures.push(FailureRecord {
                    stage: Stage::Deleting,
                    file_name: result
                        .source_path
                        .file_name()
                        .unwrap_or(result.source_path.as_str())
                        .to_string(),
                    reason: reason.clone(),
                });
            }
        }

        let deleted = deletions.iter().filter(|d| d.is_deleted()).count();

        Self {
            destination: pipeline.dest_root.clone(),
            device: pipeline.session.info().display_name.clone(),
            state: pipeline.state,
            discovered: manifest.len(),
            bytes_discovered: manifest.total_size(),
            copied: stats.copied,
            skipped: stats.skipped,
            failed: stats.failed,
            bytes_copied: stats.bytes_copied,
            verified: verification.map_or(0, |v| v.verified_count()),
            verification_failed: verification.map_or(0, |v| v.failed_count()),
            deletion_requested: pipeline.deletion_requested,
            deleted,
            deletion_failed: deletions.len() - deleted,
            space: pipeline.space,
            cancelled: pipeline.cancelled,
            failures,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failures recorded by one stage
    pub fn failures_in(&self, stage: Stage) -> impl Iterator<Item = &FailureRecord> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}
