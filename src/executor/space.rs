//! Destination free-space pre-flight

use super::is_already_present;
use crate::types::{CamrollError, Manifest};
use serde::Serialize;
use std::path::Path;

/// Space needed by pending copies versus space free on the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaceReport {
    /// Bytes of entries that are not already present
    pub required: u64,
    /// Free bytes on the destination filesystem; `None` if unmeasurable
    pub available: Option<u64>,
}

impl SpaceReport {
    /// Unmeasurable free space counts as sufficient
    pub fn is_sufficient(&self) -> bool {
        self.available
            .map_or(true, |available| available >= self.required)
    }

    /// Advisory warning when the destination is short
    pub fn warning(&self) -> Option<CamrollError> {
        match self.available {
            Some(available) if available < self.required => Some(CamrollError::InsufficientSpace {
                available,
                needed: self.required,
            }),
            _ => None,
        }
    }

    pub fn shortfall(&self) -> u64 {
        self.available
            .map(|available| self.required.saturating_sub(available))
            .unwrap_or(0)
    }
}

/// Compare pending transfer size with free space at `dest_root`
pub fn check_space(manifest: &Manifest, dest_root: &Path) -> SpaceReport {
    let required = manifest
        .iter()
        .filter(|entry| !is_already_present(&dest_root.join(&entry.file_name), entry.size))
        .map(|entry| entry.size)
        .sum();

    SpaceReport {
        required,
        available: available_space(dest_root),
    }
}

/// Free bytes available to an unprivileged user on the filesystem holding `path`
#[cfg(unix)]
pub fn available_space(path: &Path) -> Option<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path_c = CString::new(path.as_os_str().as_bytes()).ok()?;

    // SAFETY: `path_c` is a valid NUL-terminated string and `stat` is a
    // zeroed out-parameter owned by this frame.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(path_c.as_ptr(), &mut stat) == 0 {
            #[allow(clippy::unnecessary_cast)]
            let block_size = stat.f_frsize as u64;
            #[allow(clippy::unnecessary_cast)]
            let available_bytes = (stat.f_bavail as u64).saturating_mul(block_size);
            Some(available_bytes)
        } else {
            None
        }
    }
}

#[cfg(not(unix))]
pub fn available_space(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaEntry;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_required_excludes_present_files() {
        let dir = TempDir::new().expect("create tempdir");
        fs::write(dir.path().join("IMG_0001.JPG"), vec![0u8; 10]).expect("write present");
        fs::write(dir.path().join("IMG_0002.JPG"), vec![0u8; 3]).expect("write partial");

        let manifest = Manifest::from_entries(vec![
            MediaEntry::new(Utf8PathBuf::from("DCIM/100APPLE/IMG_0001.JPG"), 10),
            MediaEntry::new(Utf8PathBuf::from("DCIM/100APPLE/IMG_0002.JPG"), 20),
            MediaEntry::new(Utf8PathBuf::from("DCIM/100APPLE/VID_0003.MOV"), 30),
        ]);

        let report = check_space(&manifest, dir.path());
        assert_eq!(report.required, 50);
    }

    #[test]
    fn test_warning_when_short() {
        let report = SpaceReport {
            required: 100,
            available: Some(40),
        };
        assert!(!report.is_sufficient());
        assert_eq!(report.shortfall(), 60);
        assert!(matches!(
            report.warning(),
            Some(CamrollError::InsufficientSpace {
                available: 40,
                needed: 100
            })
        ));
    }

    #[test]
    fn test_unmeasured_space_is_sufficient() {
        let report = SpaceReport {
            required: 100,
            available: None,
        };
        assert!(report.is_sufficient());
        assert!(report.warning().is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_available_space_on_tempdir() {
        let dir = TempDir::new().expect("create tempdir");
        assert!(available_space(dir.path()).is_some());
    }
}
