//! In-memory device for tests and dry demos
//!
//! Files live in a map keyed by device path. Content is either real bytes or
//! a synthetic run of zeros, so large videos can be modelled without
//! allocating them. Failures (interrupted downloads, refused deletes, a
//! device that vanished) can be injected per path.

use super::{DeviceCapability, DeviceInfo, FileStat};
use crate::catalog::ExtensionFilter;
use crate::types::CamrollError;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{self, Cursor, Read};
use std::time::SystemTime;

#[derive(Debug, Clone)]
enum Content {
    Bytes(Vec<u8>),
    Zeros(u64),
}

impl Content {
    fn len(&self) -> u64 {
        match self {
            Content::Bytes(data) => data.len() as u64,
            Content::Zeros(len) => *len,
        }
    }

    fn reader(&self) -> Box<dyn Read + '_> {
        match self {
            Content::Bytes(data) => Box::new(Cursor::new(data.as_slice())),
            Content::Zeros(len) => Box::new(io::repeat(0).take(*len)),
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Content,
    modified: Option<SystemTime>,
}

/// Reader that yields `limit` bytes and then fails, like a cable pulled mid-copy
struct InterruptedReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Read for InterruptedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "device disconnected during transfer",
            ));
        }
        let max = buf.len().min(self.remaining as usize);
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// A fake phone held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    info: DeviceInfo,
    files: BTreeMap<Utf8PathBuf, MemoryFile>,
    dirs: BTreeSet<Utf8PathBuf>,
    connected: bool,
    unreachable: bool,
    interrupted_downloads: HashSet<Utf8PathBuf>,
    refused_deletes: HashSet<Utf8PathBuf>,
    unstattable: HashSet<Utf8PathBuf>,
    connects: usize,
    disconnects: usize,
    deleted: Vec<Utf8PathBuf>,
}

impl MemoryDevice {
    pub fn new(display_name: &str) -> Self {
        Self {
            info: DeviceInfo {
                id: format!("memory:{}", display_name),
                display_name: display_name.to_string(),
            },
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
            connected: false,
            unreachable: false,
            interrupted_downloads: HashSet::new(),
            refused_deletes: HashSet::new(),
            unstattable: HashSet::new(),
            connects: 0,
            disconnects: 0,
            deleted: Vec::new(),
        }
    }

    /// Add a file with the given content
    pub fn add_file(
        &mut self,
        path: impl Into<Utf8PathBuf>,
        data: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.insert(path.into(), Content::Bytes(data.into()))
    }

    /// Add a file of `size` zero bytes without allocating it
    pub fn add_sized_file(&mut self, path: impl Into<Utf8PathBuf>, size: u64) -> &mut Self {
        self.insert(path.into(), Content::Zeros(size))
    }

    /// Register an empty directory
    pub fn add_dir(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        let path = path.into();
        self.register_ancestors(&path);
        self.dirs.insert(path);
        self
    }

    pub fn set_modified(&mut self, path: &Utf8Path, modified: SystemTime) -> &mut Self {
        if let Some(file) = self.files.get_mut(path) {
            file.modified = Some(modified);
        }
        self
    }

    /// Downloads of `path` stop halfway with an I/O error
    pub fn interrupt_download(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.interrupted_downloads.insert(path.into());
        self
    }

    /// Deletes of `path` are refused
    pub fn refuse_delete(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.refused_deletes.insert(path.into());
        self
    }

    /// `stat_file` on `path` fails
    pub fn refuse_stat(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.unstattable.insert(path.into());
        self
    }

    /// Simulate the device dropping off the bus (or coming back)
    pub fn set_unreachable(&mut self, unreachable: bool) -> &mut Self {
        self.unreachable = unreachable;
        self
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Paths deleted so far, in order
    pub fn deleted(&self) -> &[Utf8PathBuf] {
        &self.deleted
    }

    pub fn connect_count(&self) -> usize {
        self.connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn insert(&mut self, path: Utf8PathBuf, content: Content) -> &mut Self {
        self.register_ancestors(&path);
        self.files.insert(
            path,
            MemoryFile {
                content,
                modified: None,
            },
        );
        self
    }

    fn register_ancestors(&mut self, path: &Utf8Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_str().is_empty() {
                continue;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn ensure_session(&self) -> Result<(), CamrollError> {
        if self.unreachable {
            return Err(CamrollError::Device(format!(
                "{} is not reachable",
                self.info.display_name
            )));
        }
        if !self.connected {
            return Err(CamrollError::Device(format!(
                "{} is not connected",
                self.info.display_name
            )));
        }
        Ok(())
    }

    fn file(&self, path: &Utf8Path) -> Result<&MemoryFile, CamrollError> {
        self.files
            .get(path)
            .ok_or_else(|| CamrollError::Device(format!("{} not found on device", path)))
    }
}

impl DeviceCapability for MemoryDevice {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, CamrollError> {
        if self.unreachable {
            return Ok(Vec::new());
        }
        Ok(vec![self.info.clone()])
    }

    fn connect(&mut self, id: &str) -> Result<(), CamrollError> {
        if self.unreachable || id != self.info.id {
            return Err(CamrollError::Device(format!("cannot connect to {}", id)));
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self, _id: &str) -> Result<(), CamrollError> {
        self.connected = false;
        self.disconnects += 1;
        Ok(())
    }

    fn list_directories(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CamrollError> {
        self.ensure_session()?;
        if !self.dirs.contains(path) {
            return Err(CamrollError::Device(format!("{} not found on device", path)));
        }
        Ok(self
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn list_files(
        &self,
        dir: &Utf8Path,
        patterns: &ExtensionFilter,
    ) -> Result<Vec<Utf8PathBuf>, CamrollError> {
        self.ensure_session()?;
        if !self.dirs.contains(dir) {
            return Err(CamrollError::Device(format!("{} not found on device", dir)));
        }
        Ok(self
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter(|p| p.file_name().is_some_and(|name| patterns.matches(name)))
            .cloned()
            .collect())
    }

    fn stat_file(&self, path: &Utf8Path) -> Result<FileStat, CamrollError> {
        self.ensure_session()?;
        if self.unstattable.contains(path) {
            return Err(CamrollError::Device(format!("cannot stat {}", path)));
        }
        let file = self.file(path)?;
        Ok(FileStat {
            size: file.content.len(),
            modified: file.modified,
        })
    }

    fn download_file(&self, path: &Utf8Path) -> Result<Box<dyn Read + '_>, CamrollError> {
        self.ensure_session()?;
        let file = self.file(path)?;
        let reader = file.content.reader();
        if self.interrupted_downloads.contains(path) {
            return Ok(Box::new(InterruptedReader {
                inner: reader,
                remaining: file.content.len() / 2,
            }));
        }
        Ok(reader)
    }

    fn delete_file(&mut self, path: &Utf8Path) -> Result<(), CamrollError> {
        self.ensure_session()?;
        if self.refused_deletes.contains(path) {
            return Err(CamrollError::Device(format!("device refused to delete {}", path)));
        }
        if self.files.remove(path).is_none() {
            return Err(CamrollError::Device(format!("{} not found on device", path)));
        }
        self.deleted.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(device: &mut MemoryDevice) {
        let id = device.info.id.clone();
        device.connect(&id).expect("connect");
    }

    #[test]
    fn test_directories_derived_from_files() {
        let mut device = MemoryDevice::new("iPhone");
        device
            .add_file("DCIM/100APPLE/IMG_0001.JPG", b"a".to_vec())
            .add_file("DCIM/101APPLE/IMG_0002.JPG", b"b".to_vec());
        connected(&mut device);

        let dirs = device
            .list_directories(Utf8Path::new("DCIM"))
            .expect("list dirs");
        assert_eq!(
            dirs,
            vec![
                Utf8PathBuf::from("DCIM/100APPLE"),
                Utf8PathBuf::from("DCIM/101APPLE")
            ]
        );
    }

    #[test]
    fn test_operations_require_connection() {
        let mut device = MemoryDevice::new("iPhone");
        device.add_file("DCIM/100APPLE/IMG_0001.JPG", b"a".to_vec());

        assert!(device.list_directories(Utf8Path::new("DCIM")).is_err());
    }

    #[test]
    fn test_sized_file_streams_zeros() {
        let mut device = MemoryDevice::new("iPhone");
        device.add_sized_file("DCIM/100APPLE/VID_0001.MOV", 300_000);
        connected(&mut device);

        let mut reader = device
            .download_file(Utf8Path::new("DCIM/100APPLE/VID_0001.MOV"))
            .expect("download");
        let copied = io::copy(&mut reader, &mut io::sink()).expect("read stream");
        assert_eq!(copied, 300_000);
    }

    #[test]
    fn test_interrupted_download_fails_midway() {
        let mut device = MemoryDevice::new("iPhone");
        device
            .add_file("DCIM/100APPLE/IMG_0001.JPG", vec![7u8; 100])
            .interrupt_download("DCIM/100APPLE/IMG_0001.JPG");
        connected(&mut device);

        let mut reader = device
            .download_file(Utf8Path::new("DCIM/100APPLE/IMG_0001.JPG"))
            .expect("download starts");
        let mut sink = Vec::new();
        assert!(reader.read_to_end(&mut sink).is_err());
        assert_eq!(sink.len(), 50);
    }

    #[test]
    fn test_delete_records_order_and_refusals() {
        let mut device = MemoryDevice::new("iPhone");
        device
            .add_file("DCIM/100APPLE/a.jpg", b"a".to_vec())
            .add_file("DCIM/100APPLE/b.jpg", b"b".to_vec())
            .refuse_delete("DCIM/100APPLE/b.jpg");
        connected(&mut device);

        device
            .delete_file(Utf8Path::new("DCIM/100APPLE/a.jpg"))
            .expect("delete a");
        assert!(device.delete_file(Utf8Path::new("DCIM/100APPLE/b.jpg")).is_err());

        assert_eq!(device.deleted(), &[Utf8PathBuf::from("DCIM/100APPLE/a.jpg")]);
        assert_eq!(device.file_count(), 1);
    }
}
