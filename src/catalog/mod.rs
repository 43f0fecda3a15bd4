//! Catalog builder - discover media on the device and build the manifest

mod filter;

pub use filter::{ExtensionFilter, SUPPORTED_EXTENSIONS};

use crate::device::DeviceCapability;
use crate::types::{CamrollError, Manifest, MediaEntry};
use camino::Utf8Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Callback for reporting discovery progress
///
/// Arguments:
/// - `files_found`: media files catalogued so far
/// - `bytes_found`: their combined size
pub type DiscoveryCallback<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Walk `root_path` one level deep and catalogue matching media files
///
/// The DCIM layout puts media in per-roll folders (`100APPLE`, `Camera`, ...)
/// directly under the root, so only immediate subdirectories are listed.
///
/// # Errors
/// * `root_path` cannot be listed → `CamrollError::Discovery` (fatal)
/// * A single subdirectory cannot be listed → logged, skipped
/// * A single file cannot be stat'ed → logged, skipped
///
/// An empty manifest is a normal result.
pub fn build_manifest<D: DeviceCapability + ?Sized>(
    device: &D,
    root_path: &Utf8Path,
    extensions: &ExtensionFilter,
    on_progress: Option<&DiscoveryCallback<'_>>,
) -> Result<Manifest, CamrollError> {
    let start_time = Instant::now();

    let subdirs = device
        .list_directories(root_path)
        .map_err(|e| CamrollError::Discovery {
            path: root_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut entries = Vec::new();
    let mut found_bytes = 0u64;

    for dir in &subdirs {
        let files = match device.list_files(dir, extensions) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir, error = %e, "could not list folder, skipping");
                continue;
            }
        };

        for path in files {
            let stat = match device.stat_file(&path) {
                Ok(stat) => stat,
                Err(e) => {
                    warn!(file = %path, error = %e, "could not access file, skipping");
                    continue;
                }
            };

            let mut entry = MediaEntry::new(path, stat.size);
            if let Some(modified) = stat.modified {
                entry = entry.with_modified(modified);
            }

            found_bytes += entry.size;
            entries.push(entry);

            if let Some(callback) = on_progress {
                callback(entries.len() as u64, found_bytes);
            }
        }
    }

    let manifest = Manifest::from_entries(entries);
    let duplicates = manifest.duplicate_names();
    if !duplicates.is_empty() {
        warn!(
            names = ?duplicates,
            "same file name in several roll folders; only one copy per name is kept"
        );
    }
    info!(
        root = %root_path,
        folders = subdirs.len(),
        files = manifest.len(),
        bytes = manifest.total_size(),
        "catalogue complete"
    );
    debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "discovery timing");

    Ok(manifest)
}
