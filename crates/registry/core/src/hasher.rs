//! File content hashing.
//!
//! Only the digest travels to the chain; the file itself never leaves the
//! client. Digests are standard SHA-256 so independently computed values are
//! comparable bit-for-bit.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::HashError;
use crate::types::ContentDigest;

/// Digest of an in-memory byte blob. Pure function of its input.
pub fn digest_bytes(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentDigest::from_bytes(hasher.finalize().into())
}

/// Digest of a file's full contents.
///
/// Reads the whole file before returning; submission must not proceed on a
/// partial read, so any IO failure maps to [`HashError::Unreadable`].
pub async fn digest_file(path: &Path) -> Result<ContentDigest, HashError> {
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!(len = bytes.len(), "hashing file contents");
    Ok(digest_bytes(&bytes))
}
