//! Content identity for local files.
//!
//! A file's identity is its size, modification time and MD5 content hash.
//! Only the hash takes part in upload decisions.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::SyncError;

/// Read buffer size used while hashing.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Synchronization-relevant state of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Byte length of the contents at the time they were hashed.
    pub size_bytes: u64,
    /// Last modification time, in fractional seconds since the Unix epoch.
    pub mod_time: f64,
    /// Lowercase hex MD5 digest of the contents (32 characters).
    pub content_hash: String,
}

impl FileIdentity {
    /// Create a new file identity.
    pub fn new(size_bytes: u64, mod_time: f64, content_hash: impl Into<String>) -> Self {
        Self {
            size_bytes,
            mod_time,
            content_hash: content_hash.into(),
        }
    }
}

/// Compute the identity of the file at `path`.
///
/// The file is streamed through the hasher in [`CHUNK_SIZE`] pieces, so
/// memory use does not grow with file size. Any read error fails the whole
/// file.
pub fn identity_of(path: &Path) -> Result<FileIdentity, SyncError> {
    let io_error = |source: io::Error| SyncError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let metadata = file.metadata().map_err(io_error)?;
    let mod_time = epoch_seconds(metadata.modified().map_err(io_error)?);
    let (content_hash, size_bytes) = md5_reader(&mut file).map_err(io_error)?;

    Ok(FileIdentity {
        size_bytes,
        mod_time,
        content_hash,
    })
}

/// Hash everything `reader` yields. Returns the hex digest and the byte count.
pub fn md5_reader<R: Read>(reader: &mut R) -> io::Result<(String, u64)> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((format!("{:x}", hasher.finalize()), total))
}

/// Hash an in-memory buffer.
pub fn md5_bytes(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Whether `value` looks like an MD5 hex digest.
pub fn is_md5_hex(value: &str) -> bool {
    value.len() == 32 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        // Timestamps before 1970 are legal on most filesystems
        Err(before) => -before.duration().as_secs_f64(),
    }
}
