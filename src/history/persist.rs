//! Manifest persistence worker.
//!
//! A dedicated thread owns all manifest writes, fed owned snapshots over
//! an mpsc channel so a save in flight never blocks new captures into the
//! in-memory store. A shared file lock serializes writes against the
//! startup load; it is held only for the duration of a single read or
//! write, never across a capture cycle.

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{HistoryError, Result};
use crate::history::manifest::{self, ManifestRecord};

/// Requests handled by the persistence worker.
enum PersistRequest {
    /// Write a manifest snapshot taken at save-trigger time.
    Save(Vec<ManifestRecord>),
    Shutdown,
}

/// Handle to the persistence worker thread. Dropping the handle shuts the
/// worker down after any queued saves complete.
pub struct PersistHandle {
    tx: Sender<PersistRequest>,
    handle: Option<JoinHandle<()>>,
}

impl PersistHandle {
    pub fn spawn(manifest_path: PathBuf, file_lock: Arc<Mutex<()>>) -> Self {
        let (tx, rx) = mpsc::channel::<PersistRequest>();

        let handle = thread::spawn(move || {
            debug!("Persistence worker started");
            for request in rx {
                match request {
                    PersistRequest::Save(snapshot) => {
                        if let Err(e) = write_manifest(&file_lock, &manifest_path, &snapshot) {
                            error!(error = %e, "Failed to persist manifest");
                        }
                    }
                    PersistRequest::Shutdown => break,
                }
            }
            debug!("Persistence worker stopped");
        });

        PersistHandle {
            tx,
            handle: Some(handle),
        }
    }

    /// Queue a snapshot for writing. Never blocks on disk.
    pub fn save(&self, snapshot: Vec<ManifestRecord>) {
        if self.tx.send(PersistRequest::Save(snapshot)).is_err() {
            warn!("Persistence worker is gone, manifest not saved");
        }
    }
}

impl Drop for PersistHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(PersistRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Persistence worker panicked");
            }
        }
    }
}

/// Write the manifest under the file lock, atomically (temp file + rename)
/// so a concurrent load can never observe a torn manifest.
pub fn write_manifest(
    file_lock: &Mutex<()>,
    path: &Path,
    records: &[ManifestRecord],
) -> Result<()> {
    let json = manifest::encode(records)?;

    let _guard = file_lock.lock();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| HistoryError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| HistoryError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| HistoryError::io(path, e))?;

    debug!(path = %path.display(), entries = records.len(), "Manifest written");
    Ok(())
}

/// Read the manifest under the file lock.
///
/// A missing file is an empty history, not an error. Unparsable content
/// surfaces as `CorruptManifest`; the caller starts empty and says so.
pub fn load_manifest(file_lock: &Mutex<()>, path: &Path) -> Result<Vec<ManifestRecord>> {
    let _guard = file_lock.lock();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No manifest on disk, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(HistoryError::io(path, e)),
    };

    manifest::decode(&contents)
}
