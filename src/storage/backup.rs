//! Verified file copies for backups
//!
//! Every copy is checksummed: the source CRC32 is computed while copying
//! and the written copy is re-read and compared before the copy is
//! reported as existing. A copy that fails verification is removed.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use crate::record::timestamp_id;

/// Computes the CRC32 of a whole file.
pub(crate) fn file_crc32(path: &Path) -> io::Result<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

/// Copies `src` to `dst` byte-for-byte, fsyncs the copy, and verifies it
/// by CRC32. On mismatch the copy is removed and the call fails.
pub fn copy_verified(src: &Path, dst: &Path) -> StorageResult<()> {
    let mut src_file = File::open(src)
        .map_err(|e| StorageError::io(format!("open backup source {}", src.display()), e))?;
    let mut dst_file = File::create(dst)
        .map_err(|e| StorageError::io(format!("create backup copy {}", dst.display()), e))?;

    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = src_file
            .read(&mut buffer)
            .map_err(|e| StorageError::io(format!("read backup source {}", src.display()), e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        dst_file
            .write_all(&buffer[..bytes_read])
            .map_err(|e| StorageError::io(format!("write backup copy {}", dst.display()), e))?;
    }
    let src_crc = hasher.finalize();

    dst_file
        .sync_all()
        .map_err(|e| StorageError::io(format!("fsync backup copy {}", dst.display()), e))?;
    drop(dst_file);

    let dst_crc = file_crc32(dst)
        .map_err(|e| StorageError::io(format!("verify backup copy {}", dst.display()), e))?;

    if src_crc != dst_crc {
        let _ = fs::remove_file(dst);
        return Err(StorageError::BackupMismatch {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
    }

    Ok(())
}

/// Builds a timestamped backup path for `src` inside `dir`.
///
/// Format: `<file name>.<YYYYMMDDTHHMMSSZ>.bak`, with a numeric suffix
/// when two backups of the same file land in the same second.
pub(crate) fn timestamped_path(dir: &Path, src: &Path) -> PathBuf {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let ts = timestamp_id();

    let mut candidate = dir.join(format!("{name}.{ts}.bak"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{name}.{ts}-{n}.bak"));
        n += 1;
    }
    candidate
}
