//! Content digests used to identify candidate files.
//!
//! Identity is by content only: the MD5 of the bytes, rendered as 32 lowercase
//! hex characters, the same fingerprint the lookup service publishes.

use std::path::Path;

use xapk_schema::ContentDigest;

/// Computes the content digest of a byte blob.
///
/// Implementations must be pure: identical bytes always give identical
/// digests, on every platform.
pub trait ContentHasher: Send + Sync {
    /// Digest of `bytes`.
    fn digest(&self, bytes: &[u8]) -> ContentDigest;
}

/// MD5 content hasher (128-bit, lowercase hex).
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl ContentHasher for Md5Hasher {
    fn digest(&self, bytes: &[u8]) -> ContentDigest {
        md5_digest(bytes)
    }
}

/// MD5 digest of `bytes`.
pub fn md5_digest(bytes: &[u8]) -> ContentDigest {
    ContentDigest::new(format!("{:x}", md5::compute(bytes)))
}

/// Digest a file by reading it entirely into memory.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn digest_file(hasher: &dyn ContentHasher, path: &Path) -> std::io::Result<ContentDigest> {
    let data = std::fs::read(path)?;
    Ok(hasher.digest(&data))
}
