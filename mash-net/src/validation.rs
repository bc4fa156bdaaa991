// mash-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use mash_common::error::{MashError, Result};
use sha2::{Digest, Sha256};
use url::Url;

/// Computes the hex-encoded SHA256 digest of a file, reading it in full.
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let hash_bytes = hasher.finalize();
    tracing::debug!(
        "Calculated SHA256 for {} ({} bytes read)",
        path.display(),
        bytes_copied
    );
    Ok(hex::encode(hash_bytes))
}

/// Verifies the SHA256 checksum of a file against the expected hex digest.
/// The whole file is always read before deciding; comparison is
/// case-insensitive.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let actual = compute_sha256(path)?;
    tracing::debug!("Expected SHA256: {}", expected);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(MashError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Validates a URL, ensuring it uses a scheme the fetcher supports
/// (https for remote sources, file for local ones).
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| MashError::Generic(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" | "file" => Ok(()),
        scheme => Err(MashError::Validation(format!(
            "Invalid URL scheme for '{url_str}': Must be https or file, but got '{scheme}'"
        ))),
    }
}
