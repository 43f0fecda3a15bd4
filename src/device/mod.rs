//! Device capability - the seam between the pipeline and the USB transport
//!
//! Everything the pipeline needs from a phone goes through [`DeviceCapability`].
//! Paths are device-relative and UTF-8 (`camino`), whatever the transport uses
//! underneath. Transports are assumed non-reentrant: the pipeline never issues
//! two requests against the same handle concurrently.

pub mod memory;
pub mod mounted;
mod profile;

use crate::catalog::ExtensionFilter;
use crate::types::CamrollError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::io::Read;
use std::time::SystemTime;
use tracing::{debug, warn};

pub use memory::MemoryDevice;
pub use mounted::MountedDevice;
pub use profile::{DeviceClass, DeviceProfile, DEVICE_PROFILES};

/// A device the transport can see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub display_name: String,
}

/// Metadata for one device file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Operations a device transport must provide
pub trait DeviceCapability {
    /// Enumerate attached devices
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CamrollError>;

    /// Open a session with the device
    fn connect(&mut self, id: &str) -> Result<(), CamrollError>;

    /// Close the session opened by `connect`
    fn disconnect(&mut self, id: &str) -> Result<(), CamrollError>;

    /// Immediate subdirectories of `path`
    fn list_directories(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CamrollError>;

    /// Files directly inside `dir` whose names match `patterns`
    fn list_files(
        &self,
        dir: &Utf8Path,
        patterns: &ExtensionFilter,
    ) -> Result<Vec<Utf8PathBuf>, CamrollError>;

    fn stat_file(&self, path: &Utf8Path) -> Result<FileStat, CamrollError>;

    /// Stream the file's bytes; callers must not buffer the whole file
    fn download_file(&self, path: &Utf8Path) -> Result<Box<dyn Read + '_>, CamrollError>;

    fn delete_file(&mut self, path: &Utf8Path) -> Result<(), CamrollError>;
}

/// Pick the first device whose display name contains `pattern`, ignoring case
pub fn select_device(devices: &[DeviceInfo], pattern: &str) -> Option<DeviceInfo> {
    let needle = pattern.to_lowercase();
    devices
        .iter()
        .find(|d| d.display_name.to_lowercase().contains(&needle))
        .cloned()
}

/// Connected device, disconnected exactly once
///
/// `finish` disconnects and reports the result; if the session is dropped
/// without `finish` (early return, `?`, panic) the drop handler disconnects
/// and logs any failure.
pub struct DeviceSession<'a, D: DeviceCapability + ?Sized> {
    device: &'a mut D,
    info: DeviceInfo,
    open: bool,
}

impl<'a, D: DeviceCapability + ?Sized> DeviceSession<'a, D> {
    /// Find a device matching `pattern` and connect to it
    pub fn open(device: &'a mut D, pattern: &str) -> Result<Self, CamrollError> {
        let devices = device.list_devices()?;
        let info = select_device(&devices, pattern).ok_or_else(|| CamrollError::DeviceNotFound {
            pattern: pattern.to_string(),
        })?;

        device.connect(&info.id)?;
        debug!(id = %info.id, name = %info.display_name, "device connected");

        Ok(Self {
            device,
            info,
            open: true,
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn device(&self) -> &D {
        &*self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut *self.device
    }

    /// Disconnect now and surface the error, if any
    pub fn finish(mut self) -> Result<(), CamrollError> {
        self.close()
    }

    fn close(&mut self) -> Result<(), CamrollError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.device.disconnect(&self.info.id)?;
        debug!(id = %self.info.id, "device disconnected");
        Ok(())
    }
}

impl<D: DeviceCapability + ?Sized> Drop for DeviceSession<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(id = %self.info.id, error = %e, "failed to disconnect device");
        }
    }
}
