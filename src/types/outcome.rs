//! Per-stage outcomes produced by the transfer engine, verifier and deletion gate

use super::MediaEntry;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// Result of copying a single manifest entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Downloaded into the destination
    Copied {
        bytes: u64,
        /// MB/s; `None` when the copy finished too fast to time
        throughput_mbps: Option<f64>,
    },

    /// Destination already held a file of the same size
    SkippedAlreadyPresent,

    /// Download or file creation failed
    Failed { reason: String },
}

impl TransferOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, TransferOutcome::Copied { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TransferOutcome::SkippedAlreadyPresent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed { .. })
    }
}

/// Transfer outcome paired with the entry it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferResult {
    pub entry: MediaEntry,
    pub outcome: TransferOutcome,
}

/// Why an entry failed verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationFailureReason {
    /// No file at the destination path
    Missing,
    /// Destination exists with a different length
    SizeMismatch { expected: u64, actual: u64 },
    /// Sizes agree but blake3 digests do not
    ChecksumMismatch,
    /// Destination or device copy could not be read for checking
    Unreadable { reason: String },
}

/// A failed verification, keyed by file name for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationFailure {
    pub file_name: String,
    pub reason: VerificationFailureReason,
}

/// Partition of a manifest into verified and failed entries
///
/// The verified set can only be produced by the verifier, which makes it the
/// sole admissible input to the deletion gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationResult {
    verified: Vec<MediaEntry>,
    failed: Vec<VerificationFailure>,
}

impl VerificationResult {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_verified(&mut self, entry: MediaEntry) {
        self.verified.push(entry);
    }

    pub(crate) fn push_failed(&mut self, failure: VerificationFailure) {
        self.failed.push(failure);
    }

    /// Entries that passed, in manifest order
    pub fn verified(&self) -> &[MediaEntry] {
        &self.verified
    }

    /// Source paths that passed, in manifest order
    pub fn verified_paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.verified.iter().map(|e| e.source_path.as_path())
    }

    pub fn failed(&self) -> &[VerificationFailure] {
        &self.failed
    }

    pub fn verified_count(&self) -> usize {
        self.verified.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_verified(&self, source_path: &Utf8Path) -> bool {
        self.verified.iter().any(|e| e.source_path == source_path)
    }
}

/// Result of deleting one verified source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionResult {
    pub source_path: Utf8PathBuf,
    pub outcome: DeletionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Deleted,
    Failed { reason: String },
}

impl DeletionResult {
    pub fn is_deleted(&self) -> bool {
        matches!(self.outcome, DeletionOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_outcome_predicates() {
        let copied = TransferOutcome::Copied {
            bytes: 10,
            throughput_mbps: None,
        };
        assert!(copied.is_copied());
        assert!(!copied.is_failed());
        assert!(TransferOutcome::SkippedAlreadyPresent.is_skipped());
        assert!(TransferOutcome::Failed {
            reason: "boom".to_string()
        }
        .is_failed());
    }

    #[test]
    fn test_verification_result_lookup() {
        let mut result = VerificationResult::new();
        result.push_verified(MediaEntry::new(
            Utf8PathBuf::from("DCIM/100APPLE/IMG_0001.JPG"),
            10,
        ));
        result.push_failed(VerificationFailure {
            file_name: "VID_0002.MOV".to_string(),
            reason: VerificationFailureReason::Missing,
        });

        assert_eq!(result.verified_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(result.is_verified(Utf8Path::new("DCIM/100APPLE/IMG_0001.JPG")));
        assert!(!result.is_verified(Utf8Path::new("DCIM/100APPLE/VID_0002.MOV")));
        assert_eq!(
            result.verified_paths().collect::<Vec<_>>(),
            vec![Utf8Path::new("DCIM/100APPLE/IMG_0001.JPG")]
        );
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let json = serde_json::to_string(&TransferOutcome::SkippedAlreadyPresent)
            .expect("serialize outcome");
        assert_eq!(json, r#"{"kind":"skipped_already_present"}"#);
    }
}
