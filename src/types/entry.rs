//! MediaEntry and Manifest - what the catalog found on the device

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::SystemTime;

/// A single media file discovered on the device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaEntry {
    /// Device-relative path; the entry's identity
    pub source_path: Utf8PathBuf,

    /// Bare file name, used as the destination name
    pub file_name: String,

    /// File size in bytes as reported by the device
    pub size: u64,

    /// Device-reported modification time, when the transport knows it
    pub modified: Option<SystemTime>,
}

impl MediaEntry {
    /// Create an entry, deriving `file_name` from the last path component
    pub fn new(source_path: Utf8PathBuf, size: u64) -> Self {
        let file_name = source_path
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| source_path.to_string());
        Self {
            source_path,
            file_name,
            size,
            modified: None,
        }
    }

    /// Attach the device mtime
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }
}

/// Ordered, immutable list of entries for one run
///
/// Entries are unique by `source_path` and sorted by `file_name` using
/// ordinal byte comparison, so two runs over the same device listing walk the
/// files in the same order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Manifest {
    entries: Vec<MediaEntry>,
}

impl Manifest {
    /// Build a manifest from an unordered listing
    pub fn from_entries(entries: impl IntoIterator<Item = MediaEntry>) -> Self {
        let mut seen: HashSet<Utf8PathBuf> = HashSet::new();
        let mut entries: Vec<MediaEntry> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.source_path.clone()))
            .collect();

        // Stable sort keeps listing order for equal names in different folders.
        entries.sort_by(|a, b| a.file_name.as_bytes().cmp(b.file_name.as_bytes()));

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    /// File names carried by more than one entry, in manifest order
    ///
    /// Entries with the same name land on the same destination file.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .windows(2)
            .filter(|pair| pair[0].file_name == pair[1].file_name)
            .map(|pair| pair[0].file_name.as_str())
            .collect();
        names.dedup();
        names
    }

    /// Look up an entry by its device path
    pub fn get(&self, source_path: &Utf8Path) -> Option<&MediaEntry> {
        self.entries.iter().find(|e| e.source_path == source_path)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a MediaEntry;
    type IntoIter = std::slice::Iter<'a, MediaEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
