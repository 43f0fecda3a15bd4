//! Verifier - re-check every manifest entry against the destination
//!
//! The default check is size-only: the destination file must exist and have
//! exactly the device-reported length. That catches truncated and missing
//! copies but not same-length corruption. [`VerifyMode::Checksum`] adds a
//! blake3 comparison of the local file against a fresh read from the device,
//! at the cost of reading every file from the device a second time.

use crate::device::DeviceCapability;
use crate::hash::{compute_hash, hash_reader};
use crate::types::{
    emit_event, CamrollError, ItemStatus, Manifest, MediaEntry, ProgressCallback, ProgressEvent,
    Stage, VerificationFailure, VerificationFailureReason, VerificationResult,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// How thoroughly to check each copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Existence and exact byte length
    #[default]
    Size,
    /// Size, then blake3 of the local file against blake3 of the device stream
    Checksum,
}

/// Verify every manifest entry, in manifest order
///
/// Transfer outcomes are deliberately not consulted: skipped and copied
/// entries alike must pass, so a destination modified after the copy is
/// caught here. `device` is only read in checksum mode.
pub fn verify<D: DeviceCapability + ?Sized>(
    device: &D,
    manifest: &Manifest,
    dest_root: &Path,
    mode: VerifyMode,
    on_event: Option<&ProgressCallback<'_>>,
) -> VerificationResult {
    let total = manifest.len();
    let mut result = VerificationResult::new();

    for (idx, entry) in manifest.iter().enumerate() {
        let dest_path = dest_root.join(&entry.file_name);

        let status = match check_entry(device, entry, &dest_path, mode) {
            Ok(()) => {
                result.push_verified(entry.clone());
                ItemStatus::Verified
            }
            Err(reason) => {
                let error = mismatch_error(entry, &reason);
                error.log("verification failed");
                result.push_failed(VerificationFailure {
                    file_name: entry.file_name.clone(),
                    reason,
                });
                ItemStatus::Failed {
                    reason: error.to_string(),
                }
            }
        };

        emit_event(
            on_event,
            ProgressEvent {
                stage: Stage::Verifying,
                index: idx + 1,
                total,
                file_name: entry.file_name.clone(),
                status,
                size_bytes: entry.size,
                throughput_mbps: None,
            },
        );
    }

    info!(
        verified = result.verified_count(),
        failed = result.failed_count(),
        ?mode,
        "verification complete"
    );

    result
}

fn check_entry<D: DeviceCapability + ?Sized>(
    device: &D,
    entry: &MediaEntry,
    dest_path: &Path,
    mode: VerifyMode,
) -> Result<(), VerificationFailureReason> {
    let metadata = match fs::metadata(dest_path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(VerificationFailureReason::Missing),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(VerificationFailureReason::Missing)
        }
        Err(e) => {
            return Err(VerificationFailureReason::Unreadable {
                reason: e.to_string(),
            })
        }
    };

    if metadata.len() != entry.size {
        return Err(VerificationFailureReason::SizeMismatch {
            expected: entry.size,
            actual: metadata.len(),
        });
    }

    if mode == VerifyMode::Checksum {
        let local = compute_hash(dest_path).map_err(unreadable)?;
        let remote = device
            .download_file(&entry.source_path)
            .and_then(hash_reader)
            .map_err(unreadable)?;

        if local != remote {
            return Err(VerificationFailureReason::ChecksumMismatch);
        }
        debug!(file = %entry.file_name, "checksum match");
    }

    Ok(())
}

fn unreadable(error: CamrollError) -> VerificationFailureReason {
    VerificationFailureReason::Unreadable {
        reason: error.to_string(),
    }
}

/// Express a failure in the crate's error vocabulary
pub fn mismatch_error(entry: &MediaEntry, reason: &VerificationFailureReason) -> CamrollError {
    match reason {
        VerificationFailureReason::Missing => CamrollError::VerificationMismatch {
            file_name: entry.file_name.clone(),
            expected: entry.size,
            actual: None,
        },
        VerificationFailureReason::SizeMismatch { expected, actual } => {
            CamrollError::VerificationMismatch {
                file_name: entry.file_name.clone(),
                expected: *expected,
                actual: Some(*actual),
            }
        }
        VerificationFailureReason::ChecksumMismatch => CamrollError::ChecksumMismatch {
            file_name: entry.file_name.clone(),
        },
        VerificationFailureReason::Unreadable { reason } => CamrollError::Io(
            std::io::Error::other(format!("{}: {}", entry.file_name, reason)),
        ),
    }
}
