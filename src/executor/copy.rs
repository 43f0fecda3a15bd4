//! Streaming a device file into the destination

use crate::types::CamrollError;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::SystemTime;
use tracing::warn;

/// Stream `reader` into a freshly created (truncated) file at `dest`
///
/// 1. Create or truncate the destination; a stale file of another size is
///    overwritten in place
/// 2. Copy through a fixed 128KB buffer, never holding the whole file
/// 3. Flush and sync to disk
/// 4. Stamp the device mtime, when known
///
/// A failed copy leaves a partial file behind. Its size will not match the
/// device, so the next run re-downloads it and verification rejects it.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes written
/// * `Err(CamrollError)` - IO error while reading or writing
pub fn stream_to_file<R: Read + ?Sized>(
    reader: &mut R,
    dest: &Path,
    modified: Option<SystemTime>,
) -> Result<u64, CamrollError> {
    let mut dest_file = File::create(dest).map_err(CamrollError::Io)?;

    let mut buffer = vec![0u8; 128 * 1024];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CamrollError::Io(e)),
        };

        dest_file
            .write_all(&buffer[0..bytes_read])
            .map_err(CamrollError::Io)?;
        total_bytes += bytes_read as u64;
    }

    dest_file.sync_all().map_err(CamrollError::Io)?;
    drop(dest_file);

    if let Some(mtime) = modified {
        let filetime_mtime = filetime::FileTime::from_system_time(mtime);
        if let Err(e) = filetime::set_file_mtime(dest, filetime_mtime) {
            warn!(path = %dest.display(), error = %e, "could not preserve modification time");
        }
    }

    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    #[test]
    fn test_stream_writes_content() {
        let dir = TempDir::new().expect("create tempdir");
        let dest = dir.path().join("IMG_0001.JPG");

        let bytes = stream_to_file(&mut Cursor::new(b"jpeg-bytes".to_vec()), &dest, None)
            .expect("stream");
        assert_eq!(bytes, 10);
        assert_eq!(fs::read(&dest).expect("read dest"), b"jpeg-bytes");
    }

    #[test]
    fn test_stream_overwrites_larger_stale_file() {
        let dir = TempDir::new().expect("create tempdir");
        let dest = dir.path().join("IMG_0001.JPG");
        fs::write(&dest, vec![1u8; 4096]).expect("write stale");

        stream_to_file(&mut Cursor::new(vec![2u8; 16]), &dest, None).expect("stream");
        assert_eq!(fs::read(&dest).expect("read dest"), vec![2u8; 16]);
    }

    #[test]
    fn test_stream_sets_mtime() {
        let dir = TempDir::new().expect("create tempdir");
        let dest = dir.path().join("IMG_0001.JPG");
        let mtime = UNIX_EPOCH + Duration::from_secs(1_600_000_000);

        stream_to_file(&mut Cursor::new(vec![0u8; 8]), &dest, Some(mtime)).expect("stream");

        let written = fs::metadata(&dest)
            .expect("metadata")
            .modified()
            .expect("mtime");
        assert_eq!(written, mtime);
    }

    #[test]
    fn test_stream_into_missing_directory_fails() {
        let dir = TempDir::new().expect("create tempdir");
        let dest = dir.path().join("no-such-dir/IMG_0001.JPG");

        let result = stream_to_file(&mut Cursor::new(vec![0u8; 8]), &dest, None);
        assert!(matches!(result, Err(CamrollError::Io(_))));
    }
}
