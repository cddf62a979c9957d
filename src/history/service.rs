//! Clipboard history orchestrator.
//!
//! Wires the hasher, blob store, image cache, and history store together.
//! All mutation of the store and cache happens behind one lock (single
//! mutating owner); manifest writes run on the persistence worker from
//! snapshots taken at save-trigger time.
//!
//! Capture flow: classify payload, dedup against the head entry, write
//! the blob (images, fatal on failure), best-effort cache insert, prepend,
//! enforce the cap, queue a manifest save, notify the observer. Only the
//! durable blob write can fail a capture.

use image::RgbaImage;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{HistoryError, Result};
use crate::history::blob_store::{fingerprint, BlobStore};
use crate::history::image::{decode_png, encode_rgba_to_png, estimated_cost};
use crate::history::image_cache::ImageCache;
use crate::history::persist::{self, PersistHandle};
use crate::history::store::HistoryStore;
use crate::history::types::{
    CaptureOutcome, CapturePayload, Category, Entry, EntryContent, EntryPayload,
};

/// On-disk layout: `<data-dir>/history.json` + `<data-dir>/images/<hex>.png`.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    data_dir: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        StoragePaths {
            data_dir: data_dir.into(),
        }
    }

    /// Platform data dir + `clipkeep`, with a temp-dir fallback.
    pub fn default_dir() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("clipkeep"))
            .unwrap_or_else(|| std::env::temp_dir().join("clipkeep"));
        StoragePaths { data_dir }
    }

    pub fn manifest(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    pub fn images(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn config(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

type ChangeCallback = Box<dyn Fn() + Send + Sync>;

/// State owned by the single mutating thread.
struct Inner {
    store: HistoryStore,
    cache: ImageCache,
}

pub struct ClipboardHistory {
    inner: Mutex<Inner>,
    blob_store: BlobStore,
    persist: PersistHandle,
    on_change: Mutex<Option<ChangeCallback>>,
}

impl ClipboardHistory {
    /// Open the history at `paths`, restoring any persisted manifest.
    ///
    /// A corrupt manifest is logged and treated as an empty history; a
    /// manifest record pointing at a missing blob is dropped while the
    /// rest of the history loads.
    pub fn open(paths: &StoragePaths, config: &Config) -> Result<Self> {
        config.validate()?;

        let blob_store = BlobStore::new(paths.images());
        let file_lock = Arc::new(Mutex::new(()));

        let records = match persist::load_manifest(&file_lock, &paths.manifest()) {
            Ok(records) => records,
            Err(HistoryError::CorruptManifest(e)) => {
                warn!(error = %e, "Could not load history, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let store = HistoryStore::from_manifest(records, config.history_limit, |fp| {
            blob_store.contains(fp)
        });
        info!(entries = store.len(), "Clipboard history loaded");

        let persist = PersistHandle::spawn(paths.manifest(), file_lock);

        Ok(ClipboardHistory {
            inner: Mutex::new(Inner {
                store,
                cache: ImageCache::new(config.cache_budget_bytes()),
            }),
            blob_store,
            persist,
            on_change: Mutex::new(None),
        })
    }

    /// Register the observer called after every history mutation.
    pub fn set_on_change(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_change.lock() = Some(Box::new(callback));
    }

    /// Entry point for platform clipboard-change notifications.
    pub fn on_clipboard_capture(&self, payload: CapturePayload) -> Result<CaptureOutcome> {
        match payload {
            CapturePayload::Text(text) => self.capture_text(text),
            CapturePayload::Image {
                width,
                height,
                rgba,
            } => self.capture_image(width, height, rgba),
        }
    }

    fn capture_text(&self, text: String) -> Result<CaptureOutcome> {
        if text.is_empty() {
            return Ok(CaptureOutcome::Ignored);
        }

        {
            let mut inner = self.inner.lock();
            // Consecutive-duplicate check against the head only;
            // non-consecutive repeats are kept as distinct entries.
            if inner.store.head().and_then(Entry::as_text) == Some(text.as_str()) {
                debug!("Consecutive duplicate text, ignoring");
                return Ok(CaptureOutcome::DuplicateOfHead);
            }

            debug!(text_len = text.len(), "Captured clipboard text");
            inner.store.prepend(Entry::text(text));
            self.persist.save(inner.store.to_manifest());
        }

        self.notify();
        Ok(CaptureOutcome::Added)
    }

    fn capture_image(&self, width: u32, height: u32, rgba: Vec<u8>) -> Result<CaptureOutcome> {
        if width == 0 || height == 0 || rgba.is_empty() {
            return Ok(CaptureOutcome::Ignored);
        }

        // Fingerprint the encoded bytes, never raw pixels, so re-encoding
        // the same content keeps the same identity. An unencodable payload
        // is an unrecognized capture, not a storage failure.
        let png_bytes = match encode_rgba_to_png(width, height, &rgba) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Unrecognized image payload, ignoring");
                return Ok(CaptureOutcome::Ignored);
            }
        };
        let fp = fingerprint(&png_bytes);

        {
            let mut inner = self.inner.lock();
            if inner.store.head().and_then(Entry::fingerprint) == Some(fp.as_str()) {
                debug!(fingerprint = %fp, "Consecutive duplicate image, ignoring");
                return Ok(CaptureOutcome::DuplicateOfHead);
            }

            // Durable write first: no history entry for content that
            // could not be stored. This is the only fatal step.
            self.blob_store.put(&fp, &png_bytes)?;

            // Cache insert is best-effort; a rejection is just a miss later.
            if let Some(decoded) = RgbaImage::from_raw(width, height, rgba) {
                let cost = estimated_cost(width, height);
                inner.cache.insert(fp.clone(), Arc::new(decoded), cost);
            }

            debug!(fingerprint = %fp, width, height, "Captured clipboard image");
            inner.store.prepend(Entry::image(fp));
            self.persist.save(inner.store.to_manifest());
        }

        self.notify();
        Ok(CaptureOutcome::Added)
    }

    /// Fresh snapshot of the history for list rendering, newest-first.
    pub fn current_view(&self, category: Category) -> Vec<Entry> {
        self.inner.lock().store.filter(category).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    /// Resolve an image entry to decoded pixels: memory cache first, then
    /// the blob store with a cache back-fill. `None` means the image is
    /// unrecoverable (missing or corrupt blob).
    pub fn load_image(&self, entry: &Entry) -> Option<Arc<RgbaImage>> {
        let fp = entry.fingerprint()?;

        if let Some(image) = self.inner.lock().cache.get(fp) {
            return Some(image);
        }

        let png_bytes = self.blob_store.get(fp)?;
        let decoded = Arc::new(decode_png(&png_bytes)?);
        let cost = estimated_cost(decoded.width(), decoded.height());

        self.inner.lock().cache.insert(fp, decoded.clone(), cost);
        Some(decoded)
    }

    /// Raw content of an entry for external collaborators (clipboard
    /// writer, file writer).
    pub fn entry_payload(&self, entry: &Entry) -> Option<EntryPayload> {
        match &entry.content {
            EntryContent::Text(text) => Some(EntryPayload::Text(text.clone())),
            EntryContent::Image { fingerprint } => {
                self.blob_store.get(fingerprint).map(EntryPayload::ImagePng)
            }
        }
    }

    /// Write an entry's raw content to `path` (UTF-8 text or PNG bytes).
    pub fn save_entry_to_file(&self, entry: &Entry, path: &Path) -> Result<()> {
        let payload = self.entry_payload(entry).ok_or_else(|| {
            HistoryError::io(
                self.blob_store
                    .blob_path(entry.fingerprint().unwrap_or_default()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "blob missing"),
            )
        })?;

        let bytes: Vec<u8> = match payload {
            EntryPayload::Text(text) => text.into_bytes(),
            EntryPayload::ImagePng(png) => png,
        };
        std::fs::write(path, bytes).map_err(|e| HistoryError::io(path, e))?;
        info!(path = %path.display(), "Saved history entry to file");
        Ok(())
    }

    /// Change the entry cap. Evicts immediately and persists.
    pub fn set_history_limit(&self, max_items: usize) -> Result<()> {
        if max_items == 0 {
            return Err(HistoryError::InvalidConfig(
                "history limit must be greater than 0".into(),
            ));
        }

        {
            let mut inner = self.inner.lock();
            inner.store.set_max_items(max_items);
            self.persist.save(inner.store.to_manifest());
        }
        self.notify();
        Ok(())
    }

    /// Change the image cache budget. Shrinks immediately.
    pub fn set_cache_budget_mb(&self, megabytes: usize) -> Result<()> {
        if megabytes == 0 {
            return Err(HistoryError::InvalidConfig(
                "cache budget must be greater than 0".into(),
            ));
        }
        self.inner
            .lock()
            .cache
            .set_max_cost(megabytes as u64 * 1024 * 1024);
        Ok(())
    }

    /// Empty the history and the image cache. Blob files stay on disk;
    /// reclaiming them is the GC sweep's job.
    pub fn clear_all(&self) {
        {
            let mut inner = self.inner.lock();
            inner.store.clear();
            inner.cache.clear();
            self.persist.save(inner.store.to_manifest());
        }
        self.notify();
        info!("Clipboard history cleared");
    }

    /// Sweep blobs not referenced by any current entry. Returns the number
    /// of files removed.
    pub fn gc_unreferenced_blobs(&self) -> Result<usize> {
        let live = self.inner.lock().store.live_fingerprints();
        let deleted = self.blob_store.gc_unreferenced(&live)?;
        if deleted > 0 {
            info!(deleted, "Removed unreferenced image blobs");
        }
        Ok(deleted)
    }

    pub fn cache_current_cost(&self) -> u64 {
        self.inner.lock().cache.current_cost()
    }

    // Callbacks run outside the state lock; a callback that re-enters the
    // service must not deadlock.
    fn notify(&self) {
        if let Some(callback) = self.on_change.lock().as_ref() {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn open_in(dir: &Path) -> ClipboardHistory {
        ClipboardHistory::open(&StoragePaths::new(dir), &Config::default()).unwrap()
    }

    fn image_payload(seed: u8) -> CapturePayload {
        CapturePayload::Image {
            width: 4,
            height: 4,
            rgba: vec![seed; 4 * 4 * 4],
        }
    }

    #[test]
    fn test_text_capture_and_consecutive_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        assert_eq!(
            history
                .on_clipboard_capture(CapturePayload::Text("hello".into()))
                .unwrap(),
            CaptureOutcome::Added
        );
        assert_eq!(
            history
                .on_clipboard_capture(CapturePayload::Text("hello".into()))
                .unwrap(),
            CaptureOutcome::DuplicateOfHead
        );
        assert_eq!(history.len(), 1);

        history
            .on_clipboard_capture(CapturePayload::Text("world".into()))
            .unwrap();
        let view = history.current_view(Category::All);
        let texts: Vec<_> = view.iter().filter_map(|e| e.as_text()).collect();
        assert_eq!(texts, vec!["world", "hello"]);
    }

    #[test]
    fn test_non_consecutive_repeat_is_a_new_entry() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        for text in ["hello", "world", "hello"] {
            history
                .on_clipboard_capture(CapturePayload::Text(text.into()))
                .unwrap();
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_empty_payloads_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        assert_eq!(
            history
                .on_clipboard_capture(CapturePayload::Text(String::new()))
                .unwrap(),
            CaptureOutcome::Ignored
        );
        assert_eq!(
            history
                .on_clipboard_capture(CapturePayload::Image {
                    width: 0,
                    height: 0,
                    rgba: Vec::new(),
                })
                .unwrap(),
            CaptureOutcome::Ignored
        );
        assert!(history.is_empty());
    }

    #[test]
    fn test_mismatched_image_buffer_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        let outcome = history
            .on_clipboard_capture(CapturePayload::Image {
                width: 100,
                height: 100,
                rgba: vec![0u8; 12],
            })
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Ignored);
        assert!(history.is_empty());
    }

    #[test]
    fn test_image_capture_writes_blob_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        assert_eq!(
            history.on_clipboard_capture(image_payload(7)).unwrap(),
            CaptureOutcome::Added
        );
        assert_eq!(
            history.on_clipboard_capture(image_payload(7)).unwrap(),
            CaptureOutcome::DuplicateOfHead
        );
        assert_eq!(history.len(), 1);

        let view = history.current_view(Category::Image);
        let fp = view[0].fingerprint().unwrap();
        assert!(dir.path().join("images").join(format!("{fp}.png")).exists());
    }

    #[test]
    fn test_load_image_falls_back_to_blob_store() {
        let dir = tempfile::tempdir().unwrap();
        {
            let history = open_in(dir.path());
            history.on_clipboard_capture(image_payload(9)).unwrap();
            // Dropping the service joins the persistence worker
        }

        // Fresh session: cache is cold, so the lookup must hit the blob
        // store and back-fill the cache.
        let history = open_in(dir.path());
        let entry = history.current_view(Category::Image).remove(0);
        assert_eq!(history.cache_current_cost(), 0);

        let image = history.load_image(&entry).expect("blob should resolve");
        assert_eq!((image.width(), image.height()), (4, 4));
        assert_eq!(history.cache_current_cost(), 4 * 4 * 4);
    }

    #[test]
    fn test_entry_payload_for_text_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        history
            .on_clipboard_capture(CapturePayload::Text("hello".into()))
            .unwrap();
        history.on_clipboard_capture(image_payload(3)).unwrap();

        let view = history.current_view(Category::All);
        match history.entry_payload(&view[1]).unwrap() {
            EntryPayload::Text(text) => assert_eq!(text, "hello"),
            other => panic!("expected text payload, got {other:?}"),
        }
        match history.entry_payload(&view[0]).unwrap() {
            EntryPayload::ImagePng(png) => {
                assert!(crate::history::image::decode_png(&png).is_some())
            }
            other => panic!("expected image payload, got {other:?}"),
        }
    }

    #[test]
    fn test_set_history_limit_enforces_cap() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        history.set_history_limit(2).unwrap();
        for text in ["A", "B", "C"] {
            history
                .on_clipboard_capture(CapturePayload::Text(text.into()))
                .unwrap();
        }

        let view = history.current_view(Category::All);
        let texts: Vec<_> = view.iter().filter_map(|e| e.as_text()).collect();
        assert_eq!(texts, vec!["C", "B"]);
    }

    #[test]
    fn test_rejects_zero_limits() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());
        assert!(history.set_history_limit(0).is_err());
        assert!(history.set_cache_budget_mb(0).is_err());
    }

    #[test]
    fn test_clear_all_keeps_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());
        history.on_clipboard_capture(image_payload(5)).unwrap();
        let fp = history.current_view(Category::Image)[0]
            .fingerprint()
            .unwrap()
            .to_owned();

        history.clear_all();
        assert!(history.is_empty());
        assert_eq!(history.cache_current_cost(), 0);
        assert!(dir.path().join("images").join(format!("{fp}.png")).exists());
    }

    #[test]
    fn test_gc_sweeps_only_unreferenced() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        history.on_clipboard_capture(image_payload(1)).unwrap();
        history.on_clipboard_capture(image_payload(2)).unwrap();
        let kept_fp = history.current_view(Category::Image)[0]
            .fingerprint()
            .unwrap()
            .to_owned();

        history.set_history_limit(1).unwrap();
        let deleted = history.gc_unreferenced_blobs().unwrap();
        assert_eq!(deleted, 1);
        assert!(dir
            .path()
            .join("images")
            .join(format!("{kept_fp}.png"))
            .exists());
    }

    #[test]
    fn test_on_change_fires_per_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        let count = Arc::new(AtomicUsize::new(0));
        let observed = count.clone();
        history.set_on_change(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        history
            .on_clipboard_capture(CapturePayload::Text("hello".into()))
            .unwrap();
        // Duplicate does not mutate, must not notify
        history
            .on_clipboard_capture(CapturePayload::Text("hello".into()))
            .unwrap();
        history.clear_all();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_save_entry_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let history = open_in(dir.path());

        history
            .on_clipboard_capture(CapturePayload::Text("file me".into()))
            .unwrap();
        let entry = history.current_view(Category::All).remove(0);

        let out = dir.path().join("out.txt");
        history.save_entry_to_file(&entry, &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "file me");
    }
}
