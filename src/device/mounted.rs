//! Devices exposed as a mounted directory tree
//!
//! Covers ifuse/gvfs/MTP-FUSE mounts and plain card readers: device paths
//! are resolved under the mount root with ordinary filesystem calls.

use super::{DeviceCapability, DeviceInfo, FileStat};
use crate::catalog::ExtensionFilter;
use crate::types::CamrollError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
struct Mount {
    info: DeviceInfo,
    root: PathBuf,
}

/// Set of mount points, each presented as one device
#[derive(Debug, Clone, Default)]
pub struct MountedDevice {
    mounts: Vec<Mount>,
    connected: Option<usize>,
}

impl MountedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount point under a display name
    pub fn with_mount(mut self, display_name: &str, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.mounts.push(Mount {
            info: DeviceInfo {
                id: root.display().to_string(),
                display_name: display_name.to_string(),
            },
            root,
        });
        self
    }

    fn root(&self) -> Result<&Path, CamrollError> {
        self.connected
            .and_then(|idx| self.mounts.get(idx))
            .map(|m| m.root.as_path())
            .ok_or_else(|| CamrollError::Device("no mounted device is connected".to_string()))
    }

    /// Map a device path onto the host, refusing anything that escapes the mount
    fn resolve(&self, path: &Utf8Path) -> Result<PathBuf, CamrollError> {
        let root = self.root()?;
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_)
            )
        });
        if escapes {
            return Err(CamrollError::Device(format!(
                "path {} is outside the device",
                path
            )));
        }
        Ok(root.join(path.as_std_path()))
    }

    fn read_children(
        &self,
        path: &Utf8Path,
        want_dirs: bool,
    ) -> Result<Vec<(Utf8PathBuf, String)>, CamrollError> {
        let host_path = self.resolve(path)?;
        let mut children = Vec::new();

        for entry in fs::read_dir(&host_path).map_err(|e| device_io(path, e))? {
            let entry = entry.map_err(|e| device_io(path, e))?;
            let file_type = entry.file_type().map_err(|e| device_io(path, e))?;
            if file_type.is_dir() != want_dirs || (!want_dirs && !file_type.is_file()) {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(
                        dir = %path,
                        name = %raw.to_string_lossy(),
                        "name is not valid UTF-8, leaving it out of the backup"
                    );
                    continue;
                }
            };
            children.push((path.join(&name), name));
        }

        children.sort();
        Ok(children)
    }
}

fn device_io(path: &Utf8Path, error: std::io::Error) -> CamrollError {
    CamrollError::Device(format!("{}: {}", path, error))
}

impl DeviceCapability for MountedDevice {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CamrollError> {
        Ok(self
            .mounts
            .iter()
            .filter(|m| m.root.is_dir())
            .map(|m| m.info.clone())
            .collect())
    }

    fn connect(&mut self, id: &str) -> Result<(), CamrollError> {
        let idx = self
            .mounts
            .iter()
            .position(|m| m.info.id == id)
            .ok_or_else(|| CamrollError::Device(format!("unknown device {}", id)))?;

        if !self.mounts[idx].root.is_dir() {
            return Err(CamrollError::Device(format!(
                "mount point {} is not available",
                self.mounts[idx].root.display()
            )));
        }

        self.connected = Some(idx);
        Ok(())
    }

    fn disconnect(&mut self, _id: &str) -> Result<(), CamrollError> {
        self.connected = None;
        Ok(())
    }

    fn list_directories(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CamrollError> {
        Ok(self
            .read_children(path, true)?
            .into_iter()
            .map(|(p, _)| p)
            .collect())
    }

    fn list_files(
        &self,
        dir: &Utf8Path,
        patterns: &ExtensionFilter,
    ) -> Result<Vec<Utf8PathBuf>, CamrollError> {
        Ok(self
            .read_children(dir, false)?
            .into_iter()
            .filter(|(_, name)| patterns.matches(name))
            .map(|(p, _)| p)
            .collect())
    }

    fn stat_file(&self, path: &Utf8Path) -> Result<FileStat, CamrollError> {
        let metadata = fs::metadata(self.resolve(path)?).map_err(|e| device_io(path, e))?;
        Ok(FileStat {
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    fn download_file(&self, path: &Utf8Path) -> Result<Box<dyn Read + '_>, CamrollError> {
        let file = File::open(self.resolve(path)?).map_err(|e| device_io(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn delete_file(&mut self, path: &Utf8Path) -> Result<(), CamrollError> {
        fs::remove_file(self.resolve(path)?).map_err(|e| device_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mounted(dir: &TempDir) -> MountedDevice {
        let mut device = MountedDevice::new().with_mount("Apple iPhone", dir.path());
        let id = device.list_devices().expect("list")[0].id.clone();
        device.connect(&id).expect("connect");
        device
    }

    #[test]
    fn test_lists_only_existing_mounts() {
        let dir = TempDir::new().expect("create tempdir");
        let device = MountedDevice::new()
            .with_mount("Apple iPhone", dir.path())
            .with_mount("Pixel 8", dir.path().join("not-mounted"));

        let devices = device.list_devices().expect("list devices");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].display_name, "Apple iPhone");
    }

    #[test]
    fn test_list_and_stat() {
        let dir = TempDir::new().expect("create tempdir");
        fs::create_dir_all(dir.path().join("DCIM/100APPLE")).expect("create dcim");
        fs::write(dir.path().join("DCIM/100APPLE/IMG_0001.JPG"), b"jpeg").expect("write jpg");
        fs::write(dir.path().join("DCIM/100APPLE/notes.txt"), b"txt").expect("write txt");
        let device = mounted(&dir);

        let dirs = device
            .list_directories(Utf8Path::new("DCIM"))
            .expect("list dirs");
        assert_eq!(dirs, vec![Utf8PathBuf::from("DCIM/100APPLE")]);

        let filter = ExtensionFilter::default();
        let files = device
            .list_files(Utf8Path::new("DCIM/100APPLE"), &filter)
            .expect("list files");
        assert_eq!(files, vec![Utf8PathBuf::from("DCIM/100APPLE/IMG_0001.JPG")]);

        let stat = device.stat_file(&files[0]).expect("stat");
        assert_eq!(stat.size, 4);
        assert!(stat.modified.is_some());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_left_out() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().expect("create tempdir");
        let roll = dir.path().join("DCIM/100APPLE");
        fs::create_dir_all(&roll).expect("create roll");
        fs::write(roll.join("IMG_0001.JPG"), b"jpeg").expect("write jpg");
        fs::write(roll.join(OsStr::from_bytes(b"IMG_\xff.JPG")), b"jpeg").expect("write raw name");
        let device = mounted(&dir);

        let files = device
            .list_files(Utf8Path::new("DCIM/100APPLE"), &ExtensionFilter::default())
            .expect("list files");
        assert_eq!(files, vec![Utf8PathBuf::from("DCIM/100APPLE/IMG_0001.JPG")]);
    }

    #[test]
    fn test_rejects_paths_outside_mount() {
        let dir = TempDir::new().expect("create tempdir");
        let device = mounted(&dir);

        let result = device.stat_file(Utf8Path::new("../etc/passwd"));
        assert!(matches!(result, Err(CamrollError::Device(_))));
    }

    #[test]
    fn test_requires_connection() {
        let dir = TempDir::new().expect("create tempdir");
        let device = MountedDevice::new().with_mount("Apple iPhone", dir.path());
        assert!(device.list_directories(Utf8Path::new("")).is_err());
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = TempDir::new().expect("create tempdir");
        fs::create_dir_all(dir.path().join("DCIM/100APPLE")).expect("create dcim");
        let target = dir.path().join("DCIM/100APPLE/IMG_0001.JPG");
        fs::write(&target, b"jpeg").expect("write jpg");
        let mut device = mounted(&dir);

        device
            .delete_file(Utf8Path::new("DCIM/100APPLE/IMG_0001.JPG"))
            .expect("delete");
        assert!(!target.exists());
    }
}
