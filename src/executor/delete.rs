//! Deletion gate - remove verified originals from the device
//!
//! Deleting from a phone is irreversible, so the gate only accepts a
//! [`VerificationResult`] (which nothing outside the verifier can build) and
//! does nothing at all unless the caller passes an explicit confirmation.

use crate::device::DeviceCapability;
use crate::types::{
    emit_event, CamrollError, DeletionOutcome, DeletionResult, ItemStatus, ProgressCallback,
    ProgressEvent, Stage, VerificationResult,
};
use tracing::info;

/// Delete every verified source file, one at a time, in verification order
///
/// - `confirmed == false`: no device call is made and the result is empty
/// - a failed delete is recorded and the next file is still attempted
///
/// # Example
/// ```no_run
/// use camroll::device::MemoryDevice;
/// use camroll::executor::delete_verified;
/// use camroll::types::VerificationResult;
///
/// fn delete_all(device: &mut MemoryDevice, verification: &VerificationResult) {
///     let results = delete_verified(device, verification, true, None);
///     println!("{} deleted", results.iter().filter(|r| r.is_deleted()).count());
/// }
/// ```
pub fn delete_verified<D: DeviceCapability + ?Sized>(
    device: &mut D,
    verification: &VerificationResult,
    confirmed: bool,
    on_event: Option<&ProgressCallback<'_>>,
) -> Vec<DeletionResult> {
    if !confirmed {
        info!("deletion not confirmed, leaving device untouched");
        return Vec::new();
    }

    let total = verification.verified_count();
    let mut results = Vec::with_capacity(total);

    for (idx, entry) in verification.verified().iter().enumerate() {
        let outcome = match device.delete_file(&entry.source_path) {
            Ok(()) => DeletionOutcome::Deleted,
            Err(err) => {
                let reason = err.to_string();
                let err = CamrollError::Deletion {
                    path: entry.source_path.clone(),
                    reason: reason.clone(),
                };
                err.log("delete failed");
                DeletionOutcome::Failed { reason }
            }
        };

        let status = match &outcome {
            DeletionOutcome::Deleted => ItemStatus::Deleted,
            DeletionOutcome::Failed { reason } => ItemStatus::Failed {
                reason: reason.clone(),
            },
        };
        emit_event(
            on_event,
            ProgressEvent {
                stage: Stage::Deleting,
                index: idx + 1,
                total,
                file_name: entry.file_name.clone(),
                status,
                size_bytes: entry.size,
                throughput_mbps: None,
            },
        );

        results.push(DeletionResult {
            source_path: entry.source_path.clone(),
            outcome,
        });
    }

    let deleted = results.iter().filter(|r| r.is_deleted()).count();
    info!(deleted, failed = results.len() - deleted, "deletion complete");

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::types::{MediaEntry, VerificationFailure, VerificationFailureReason};
    use camino::{Utf8Path, Utf8PathBuf};

    fn device_and_verification() -> (MemoryDevice, VerificationResult) {
        let mut device = MemoryDevice::new("iPhone");
        device
            .add_file("DCIM/100APPLE/a.jpg", b"a".to_vec())
            .add_file("DCIM/100APPLE/b.jpg", b"b".to_vec())
            .add_file("DCIM/100APPLE/c.jpg", b"c".to_vec());
        device.connect("memory:iPhone").expect("connect");

        let mut verification = VerificationResult::new();
        verification.push_verified(MediaEntry::new(Utf8PathBuf::from("DCIM/100APPLE/a.jpg"), 1));
        verification.push_verified(MediaEntry::new(Utf8PathBuf::from("DCIM/100APPLE/b.jpg"), 1));
        verification.push_failed(VerificationFailure {
            file_name: "c.jpg".to_string(),
            reason: VerificationFailureReason::Missing,
        });
        (device, verification)
    }

    #[test]
    fn test_declined_is_noop() {
        let (mut device, verification) = device_and_verification();
        let results = delete_verified(&mut device, &verification, false, None);

        assert!(results.is_empty());
        assert_eq!(device.file_count(), 3);
    }

    #[test]
    fn test_deletes_only_verified() {
        let (mut device, verification) = device_and_verification();
        let results = delete_verified(&mut device, &verification, true, None);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_deleted()));
        assert!(device.contains(Utf8Path::new("DCIM/100APPLE/c.jpg")));
        assert_eq!(device.file_count(), 1);
    }

    #[test]
    fn test_failure_does_not_block_rest() {
        let (mut device, verification) = device_and_verification();
        device.refuse_delete("DCIM/100APPLE/a.jpg");

        let results = delete_verified(&mut device, &verification, true, None);

        assert!(!results[0].is_deleted());
        assert!(results[1].is_deleted());
        assert_eq!(
            device.deleted(),
            &[Utf8PathBuf::from("DCIM/100APPLE/b.jpg")]
        );
    }
}
