//! # camroll - camera-roll backup
//!
//! Copy, verify, then (maybe) delete.
//!
//! Pulls photos and videos off a phone's DCIM folder into a dated folder on
//! the host, re-checks every copy, and only then offers to remove the
//! originals. Copies already present are skipped, so a run can be repeated
//! after an interruption.

// Module declarations
pub mod catalog;
pub mod commands;
pub mod config;
pub mod device;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod pipeline;
pub mod types;
pub mod ui;
pub mod verify;

// Re-export commonly used types
pub use config::Config;
pub use device::{DeviceCapability, DeviceClass};
pub use pipeline::{run, Pipeline, PipelineState, RunSummary};
pub use types::{CamrollError, Manifest, MediaEntry};
pub use verify::VerifyMode;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
