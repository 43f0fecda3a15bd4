//! Core type definitions for camroll

mod entry;
mod error;
mod event;
mod outcome;

pub use entry::{Manifest, MediaEntry};
pub use error::CamrollError;
pub(crate) use event::emit_event;
pub use event::{ItemStatus, ProgressCallback, ProgressEvent, Stage};
pub use outcome::{
    DeletionOutcome, DeletionResult, TransferOutcome, TransferResult, VerificationFailure,
    VerificationFailureReason, VerificationResult,
};
