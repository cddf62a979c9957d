//! Clipboard monitoring.
//!
//! Background thread that polls the system clipboard and feeds changes to
//! the history service. A cheap content hash (dimensions plus a 1 KiB
//! pixel sample for images) gates the expensive capture path, so identical
//! polls don't re-encode payloads; the service's own head comparison
//! remains the authoritative dedup.

use anyhow::{Context, Result};
use arboard::Clipboard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::ResultExt;
use crate::history::service::ClipboardHistory;
use crate::history::types::CapturePayload;

/// Polling interval for clipboard changes.
const POLL_INTERVAL_MS: u64 = 500;

/// Interval between blob GC sweeps (1 hour).
const MAINTENANCE_INTERVAL_SECS: u64 = 3600;

/// Handle to the monitor threads. `stop()` (or drop) ends both loops.
pub struct MonitorHandle {
    stop_flag: Arc<AtomicBool>,
    poll_thread: Option<JoinHandle<()>>,
    maintenance_thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        info!("Clipboard monitoring stopping");
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
        for handle in [self.poll_thread.take(), self.maintenance_thread.take()]
            .into_iter()
            .flatten()
        {
            let _ = handle.join();
        }
    }
}

/// Start the polling monitor and the hourly maintenance loop.
pub fn start_monitoring(history: Arc<ClipboardHistory>) -> Result<MonitorHandle> {
    // Fail fast if the platform clipboard is unavailable, rather than
    // inside the background thread.
    Clipboard::new().context("failed to open system clipboard")?;

    let stop_flag = Arc::new(AtomicBool::new(false));

    let poll_stop = stop_flag.clone();
    let poll_history = history.clone();
    let poll_thread = thread::spawn(move || {
        if let Err(e) = monitor_loop(poll_history, poll_stop) {
            error!(error = %e, "Clipboard monitor thread failed");
        }
    });

    let maintenance_stop = stop_flag.clone();
    let maintenance_thread = thread::spawn(move || {
        maintenance_loop(history, maintenance_stop);
    });

    info!(poll_interval_ms = POLL_INTERVAL_MS, "Clipboard monitor started");
    Ok(MonitorHandle {
        stop_flag,
        poll_thread: Some(poll_thread),
        maintenance_thread: Some(maintenance_thread),
    })
}

fn monitor_loop(history: Arc<ClipboardHistory>, stop_flag: Arc<AtomicBool>) -> Result<()> {
    let mut clipboard = Clipboard::new().context("failed to open system clipboard")?;

    // Updated only after a successful hand-off, so a failed capture is
    // retried on the next poll.
    let mut last_text_hash: Option<u64> = None;
    let mut last_image_hash: Option<u64> = None;

    let poll_interval = Duration::from_millis(POLL_INTERVAL_MS);

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            info!("Clipboard monitor stopping");
            break;
        }

        let start = Instant::now();
        poll_once(
            &history,
            &mut clipboard,
            &mut last_text_hash,
            &mut last_image_hash,
        );

        let elapsed = start.elapsed();
        if elapsed < poll_interval {
            thread::sleep(poll_interval - elapsed);
        }
    }

    Ok(())
}

fn poll_once(
    history: &ClipboardHistory,
    clipboard: &mut Clipboard,
    last_text_hash: &mut Option<u64>,
    last_image_hash: &mut Option<u64>,
) {
    // Text takes priority; don't read the image when text is present.
    if let Ok(text) = clipboard.get_text() {
        if !text.is_empty() {
            let hash = hash_text(&text);
            if last_text_hash.is_none_or(|last| last != hash) {
                debug!(text_len = text.len(), "New text detected in clipboard");
                match history.on_clipboard_capture(CapturePayload::Text(text)) {
                    Ok(_) => *last_text_hash = Some(hash),
                    Err(e) => {
                        warn!(error = %e, "Failed to record text capture (will retry)");
                    }
                }
            }
            return;
        }
    }

    if let Ok(image) = clipboard.get_image() {
        let hash = hash_image(image.width, image.height, &image.bytes);
        if last_image_hash.is_none_or(|last| last != hash) {
            debug!(
                width = image.width,
                height = image.height,
                "New image detected in clipboard"
            );
            let payload = CapturePayload::Image {
                width: image.width as u32,
                height: image.height as u32,
                rgba: image.bytes.into_owned(),
            };
            match history.on_clipboard_capture(payload) {
                Ok(_) => *last_image_hash = Some(hash),
                Err(e) => {
                    warn!(error = %e, "Failed to record image capture (will retry)");
                }
            }
        }
    }
}

fn maintenance_loop(history: Arc<ClipboardHistory>, stop_flag: Arc<AtomicBool>) {
    let interval = Duration::from_secs(MAINTENANCE_INTERVAL_SECS);
    // Sleep in short steps so stop() is honored promptly.
    let step = Duration::from_millis(250);

    loop {
        let mut slept = Duration::ZERO;
        while slept < interval {
            if stop_flag.load(Ordering::Relaxed) {
                info!("Maintenance thread stopping");
                return;
            }
            thread::sleep(step);
            slept += step;
        }

        history.gc_unreferenced_blobs().warn_on_err();
    }
}

/// Cheap change-detection hash for text.
fn hash_text(text: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Cheap change-detection hash for images: dimensions plus the first 1 KiB
/// of pixels. Collisions only cost a redundant capture attempt, which the
/// service's head comparison then drops.
fn hash_image(width: usize, height: usize, bytes: &[u8]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    width.hash(&mut hasher);
    height.hash(&mut hasher);
    let sample_size = 1024.min(bytes.len());
    bytes[..sample_size].hash(&mut hasher);
    hasher.finish()
}
