//! Error types for camroll

use camino::Utf8PathBuf;
use thiserror::Error;

/// Error types for camroll operations
#[derive(Debug, Error)]
pub enum CamrollError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No connected device matched the requested device class
    #[error("No device matching '{pattern}' found")]
    DeviceNotFound { pattern: String },

    /// Connected device stopped answering before a stage could start
    #[error("Device {id} is unreachable")]
    DeviceUnreachable { id: String },

    /// Transport-level failure reported by a device backend
    #[error("Device error: {0}")]
    Device(String),

    /// Media root could not be listed
    #[error("Discovery failed for {path}: {reason}")]
    Discovery { path: Utf8PathBuf, reason: String },

    /// Copy of a single file failed
    #[error("Transfer failed for {file_name}: {reason}")]
    Transfer { file_name: String, reason: String },

    /// Destination does not have room for the pending copies
    #[error("Insufficient space: {available} bytes available, {needed} bytes needed")]
    InsufficientSpace { available: u64, needed: u64 },

    /// Destination file missing or of the wrong size
    #[error(
        "Verification failed for {file_name}: expected {expected} bytes, found {}",
        display_actual(.actual)
    )]
    VerificationMismatch {
        file_name: String,
        expected: u64,
        actual: Option<u64>,
    },

    /// Destination content differs from the device copy
    #[error("Checksum mismatch: {file_name}")]
    ChecksumMismatch { file_name: String },

    /// Device refused or failed to delete a source file
    #[error("Deletion failed for {path}: {reason}")]
    Deletion { path: Utf8PathBuf, reason: String },

    /// Pipeline driven out of order
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

fn display_actual(actual: &Option<u64>) -> String {
    match actual {
        Some(size) => format!("{} bytes", size),
        None => "no file".to_string(),
    }
}

impl CamrollError {
    /// Errors that abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CamrollError::Config(_)
                | CamrollError::DeviceNotFound { .. }
                | CamrollError::DeviceUnreachable { .. }
                | CamrollError::Discovery { .. }
                | CamrollError::Pipeline(_)
        )
    }

    /// Errors recorded against one file while the stage keeps going
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            CamrollError::Transfer { .. }
                | CamrollError::VerificationMismatch { .. }
                | CamrollError::ChecksumMismatch { .. }
                | CamrollError::Deletion { .. }
        )
    }

    /// Warnings the caller may choose to ignore
    pub fn is_advisory(&self) -> bool {
        matches!(self, CamrollError::InsufficientSpace { .. })
    }

    /// Log at the level the classification calls for
    pub(crate) fn log(&self, context: &str) {
        if self.is_fatal() {
            tracing::error!(error = %self, "{}", context);
        } else if self.is_per_item() || self.is_advisory() {
            tracing::warn!(error = %self, "{}", context);
        } else {
            tracing::debug!(error = %self, "{}", context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_automatic_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let err: CamrollError = io_error.into();

        assert!(matches!(err, CamrollError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_io_error_from_function() {
        fn returns_io_error() -> Result<(), CamrollError> {
            let _file = std::fs::File::open("/nonexistent/path/file.jpg")?;
            Ok(())
        }

        let result = returns_io_error();
        assert!(matches!(result, Err(CamrollError::Io(_))));
    }

    #[test]
    fn test_discovery_is_fatal() {
        let err = CamrollError::Discovery {
            path: Utf8PathBuf::from("Internal Storage/DCIM"),
            reason: "device disconnected".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_per_item());
        assert!(err.to_string().contains("Internal Storage/DCIM"));
    }

    #[test]
    fn test_insufficient_space_is_advisory() {
        let err = CamrollError::InsufficientSpace {
            available: 1024,
            needed: 2048,
        };
        assert!(err.is_advisory());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn test_verification_mismatch_display() {
        let err = CamrollError::VerificationMismatch {
            file_name: "IMG_0001.JPG".to_string(),
            expected: 10,
            actual: Some(9),
        };
        assert!(err.is_per_item());
        assert!(err.to_string().contains("expected 10 bytes, found 9 bytes"));

        let missing = CamrollError::VerificationMismatch {
            file_name: "IMG_0002.JPG".to_string(),
            expected: 10,
            actual: None,
        };
        assert!(missing.to_string().contains("found no file"));
    }

    #[test]
    fn test_per_item_classification() {
        assert!(CamrollError::Transfer {
            file_name: "a.mov".to_string(),
            reason: "disk full".to_string()
        }
        .is_per_item());
        assert!(CamrollError::Deletion {
            path: Utf8PathBuf::from("DCIM/100APPLE/a.mov"),
            reason: "gone".to_string()
        }
        .is_per_item());
        assert!(!CamrollError::Config("bad".to_string()).is_per_item());
        assert!(!CamrollError::Device("usb reset".to_string()).is_fatal());
    }
}
