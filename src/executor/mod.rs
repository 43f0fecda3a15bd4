//! Transfer engine and deletion gate

pub mod copy;
pub mod delete;
pub mod space;

use crate::device::DeviceCapability;
use crate::types::{
    emit_event, CamrollError, ItemStatus, Manifest, MediaEntry, ProgressCallback, ProgressEvent,
    Stage, TransferOutcome, TransferResult,
};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub use copy::stream_to_file;
pub use delete::delete_verified;
pub use space::{available_space, check_space, SpaceReport};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Aggregate counts for a transfer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Number of entries in the manifest
    pub total: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Aggregate bytes written by copies
    pub bytes_copied: u64,
}

impl TransferStats {
    pub fn from_results(results: &[TransferResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match &result.outcome {
                TransferOutcome::Copied { bytes, .. } => {
                    stats.copied += 1;
                    stats.bytes_copied += bytes;
                }
                TransferOutcome::SkippedAlreadyPresent => stats.skipped += 1,
                TransferOutcome::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }
}

/// Copy every manifest entry into `dest_root`, in manifest order
///
/// Entries whose destination already exists with the same size are skipped
/// untouched; that size check is the only state carried between runs. A
/// failure on one entry is recorded and the engine moves on to the next.
/// One event is emitted per entry after it finishes, whatever the outcome.
pub fn transfer<D: DeviceCapability + ?Sized>(
    device: &D,
    manifest: &Manifest,
    dest_root: &Path,
    on_event: Option<&ProgressCallback<'_>>,
) -> Vec<TransferResult> {
    let total = manifest.len();
    let mut results = Vec::with_capacity(total);

    for (idx, entry) in manifest.iter().enumerate() {
        let dest_path = dest_root.join(&entry.file_name);

        let outcome = match transfer_entry(device, entry, &dest_path) {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = err.to_string();
                let err = CamrollError::Transfer {
                    file_name: entry.file_name.clone(),
                    reason: reason.clone(),
                };
                err.log("transfer failed");
                TransferOutcome::Failed { reason }
            }
        };

        emit_event(on_event, transfer_event(idx + 1, total, entry, &outcome));
        results.push(TransferResult {
            entry: entry.clone(),
            outcome,
        });
    }

    let stats = TransferStats::from_results(&results);
    info!(
        copied = stats.copied,
        skipped = stats.skipped,
        failed = stats.failed,
        bytes = stats.bytes_copied,
        "transfer complete"
    );

    results
}

fn transfer_entry<D: DeviceCapability + ?Sized>(
    device: &D,
    entry: &MediaEntry,
    dest_path: &Path,
) -> Result<TransferOutcome, CamrollError> {
    if is_already_present(dest_path, entry.size) {
        debug!(file = %entry.file_name, "already present, skipping");
        return Ok(TransferOutcome::SkippedAlreadyPresent);
    }

    let start = Instant::now();
    let mut reader = device.download_file(&entry.source_path)?;
    let bytes = stream_to_file(&mut reader, dest_path, entry.modified)?;
    let elapsed = start.elapsed();

    debug!(file = %entry.file_name, bytes, elapsed_ms = elapsed.as_millis() as u64, "copied");

    Ok(TransferOutcome::Copied {
        bytes,
        throughput_mbps: throughput_mbps(bytes, elapsed),
    })
}

/// A regular file of exactly `size` bytes exists at `dest`
pub(crate) fn is_already_present(dest: &Path, size: u64) -> bool {
    fs::metadata(dest)
        .map(|m| m.is_file() && m.len() == size)
        .unwrap_or(false)
}

/// MB/s for `bytes` moved in `elapsed`; `None` when nothing measurable elapsed
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        Some(bytes as f64 / BYTES_PER_MB / secs)
    } else {
        None
    }
}

fn transfer_event(
    index: usize,
    total: usize,
    entry: &MediaEntry,
    outcome: &TransferOutcome,
) -> ProgressEvent {
    let (status, throughput) = match outcome {
        TransferOutcome::Copied {
            throughput_mbps, ..
        } => (ItemStatus::Copied, *throughput_mbps),
        TransferOutcome::SkippedAlreadyPresent => (ItemStatus::Skipped, None),
        TransferOutcome::Failed { reason } => (
            ItemStatus::Failed {
                reason: reason.clone(),
            },
            None,
        ),
    };

    ProgressEvent {
        stage: Stage::Transferring,
        index,
        total,
        file_name: entry.file_name.clone(),
        status,
        size_bytes: entry.size,
        throughput_mbps: throughput,
    }
}
