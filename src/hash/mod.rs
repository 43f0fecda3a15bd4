//! Hashing utilities for checksum verification

use crate::types::CamrollError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the Blake3 hash of a local file
///
/// The file is streamed in 64KB chunks for memory efficiency.
///
/// # Example
/// ```no_run
/// use camroll::hash::compute_hash;
/// use std::path::Path;
///
/// let hash = compute_hash(Path::new("IMG_0001.JPG"))?;
/// # Ok::<(), camroll::types::CamrollError>(())
/// ```
pub fn compute_hash(file_path: &Path) -> Result<[u8; 32], CamrollError> {
    let file = File::open(file_path).map_err(CamrollError::Io)?;
    hash_reader(file)
}

/// Compute the Blake3 hash of any byte stream, e.g. a device download
pub fn hash_reader<R: Read>(mut reader: R) -> Result<[u8; 32], CamrollError> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(CamrollError::Io)?;

        if bytes_read == 0 {
            break; // EOF
        }

        hasher.update(&buffer[0..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}
