//! File-based blob storage for clipboard images.
//!
//! Stores each unique image once as `<root>/<fingerprint>.png`, where the
//! fingerprint is the SHA-256 of the encoded PNG bytes. Multiple history
//! entries may reference the same blob; blobs are only removed by the
//! explicit GC sweep.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{HistoryError, Result};

/// Compute the SHA-256 fingerprint of encoded bytes (hex, 64 chars).
///
/// Always applied to the encoded (PNG) representation, never raw pixels, so
/// identity survives re-encoding of the same bytes. Deterministic, total;
/// the empty buffer hashes to the standard empty-input digest.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Durable, content-addressed store of encoded image payloads.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BlobStore { root: root.into() }
    }

    pub fn blob_path(&self, fingerprint: &str) -> PathBuf {
        self.root.join(format!("{fingerprint}.png"))
    }

    /// Write a blob for `fingerprint` if one doesn't already exist.
    ///
    /// Idempotent: the hash contract guarantees identical content for a
    /// given fingerprint, so an existing file is simply kept. Directory
    /// creation is lazy and idempotent. IO failures propagate to the
    /// caller; a capture must not claim durability it doesn't have.
    pub fn put(&self, fingerprint: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| HistoryError::io(&self.root, e))?;

        let path = self.blob_path(fingerprint);
        if path.exists() {
            debug!(fingerprint, "Blob already exists, skipping write");
            return Ok(());
        }

        fs::write(&path, bytes).map_err(|e| HistoryError::io(&path, e))?;
        debug!(fingerprint, size = bytes.len(), "Stored new blob");
        Ok(())
    }

    /// Load the encoded bytes for `fingerprint`, or `None` if no blob
    /// exists. Absence is not an error; the caller drops the entry.
    pub fn get(&self, fingerprint: &str) -> Option<Vec<u8>> {
        let path = self.blob_path(fingerprint);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(fingerprint, size = bytes.len(), "Loaded blob from disk");
                Some(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(fingerprint, error = %e, "Failed to read blob file");
                None
            }
        }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.blob_path(fingerprint).exists()
    }

    /// Remove blobs whose fingerprint is not in `live`.
    ///
    /// Returns the number of files deleted. Only `.png` files directly
    /// under the root are considered.
    pub fn gc_unreferenced(&self, live: &HashSet<String>) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // Nothing was ever stored; nothing to sweep.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(HistoryError::io(&self.root, e)),
        };

        let mut deleted = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !live.contains(stem) && fs::remove_file(&path).is_ok() {
                        debug!(fingerprint = %stem, "GC'd unreferenced blob");
                        deleted += 1;
                    }
                }
            }
        }

        if deleted > 0 {
            debug!(deleted, "Garbage collected unreferenced blobs");
        }
        Ok(deleted)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
