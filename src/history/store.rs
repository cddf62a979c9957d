//! Bounded, newest-first history store.
//!
//! Insertion order is recency order; the in-memory state is authoritative
//! during a session and the manifest on disk is a derived copy.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::history::manifest::ManifestRecord;
use crate::history::types::{Category, Entry, EntryKind};

pub struct HistoryStore {
    entries: VecDeque<Entry>,
    max_items: usize,
}

impl HistoryStore {
    pub fn new(max_items: usize) -> Self {
        HistoryStore {
            entries: VecDeque::new(),
            max_items,
        }
    }

    /// Insert at the most-recent position, then evict from the back until
    /// the cap holds. Evicting an image entry never deletes its blob;
    /// other entries may share the fingerprint.
    pub fn prepend(&mut self, entry: Entry) {
        self.entries.push_front(entry);
        while self.entries.len() > self.max_items {
            if let Some(evicted) = self.entries.pop_back() {
                debug!(kind = ?evicted.kind(), "Evicted oldest history entry");
            }
        }
    }

    /// The most recent entry, used for consecutive-duplicate detection.
    pub fn head(&self) -> Option<&Entry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Change the cap, evicting immediately if the store is over it.
    pub fn set_max_items(&mut self, max_items: usize) {
        self.max_items = max_items;
        while self.entries.len() > self.max_items {
            self.entries.pop_back();
        }
    }

    /// Empties the store. Blob files are untouched.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Lazy category projection, newest-first. Each call produces a fresh
    /// view over the current contents.
    pub fn filter(&self, category: Category) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |entry| category.matches(entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Fingerprints referenced by current image entries, for blob GC.
    pub fn live_fingerprints(&self) -> std::collections::HashSet<String> {
        self.entries
            .iter()
            .filter_map(|e| e.fingerprint().map(str::to_owned))
            .collect()
    }

    /// Serialize to manifest records, newest-first.
    pub fn to_manifest(&self) -> Vec<ManifestRecord> {
        self.entries.iter().map(ManifestRecord::from).collect()
    }

    /// Rebuild a store from manifest records.
    ///
    /// Image records whose fingerprint has no resolvable blob are skipped
    /// rather than failing the load; one missing or corrupt image must not
    /// lose the rest of the history. `blob_exists` is consulted once per
    /// image record.
    pub fn from_manifest<F>(
        records: Vec<ManifestRecord>,
        max_items: usize,
        blob_exists: F,
    ) -> HistoryStore
    where
        F: Fn(&str) -> bool,
    {
        let mut entries = VecDeque::with_capacity(records.len().min(max_items));

        for record in records {
            let entry = Entry::from(record);
            if let Some(fp) = entry.fingerprint() {
                if !blob_exists(fp) {
                    warn!(fingerprint = %fp, "Manifest references missing blob, dropping entry");
                    continue;
                }
            }
            if entries.len() < max_items {
                entries.push_back(entry);
            }
        }

        HistoryStore { entries, max_items }
    }
}

/// Convenience for tests and logs: counts by kind.
impl HistoryStore {
    pub fn count_of(&self, kind: EntryKind) -> usize {
        self.entries.iter().filter(|e| e.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_is_newest_first() {
        let mut store = HistoryStore::new(10);
        store.prepend(Entry::text("hello"));
        store.prepend(Entry::text("world"));

        let texts: Vec<_> = store.iter().filter_map(|e| e.as_text()).collect();
        assert_eq!(texts, vec!["world", "hello"]);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut store = HistoryStore::new(2);
        store.prepend(Entry::text("A"));
        store.prepend(Entry::text("B"));
        store.prepend(Entry::text("C"));

        assert_eq!(store.len(), 2);
        let texts: Vec<_> = store.iter().filter_map(|e| e.as_text()).collect();
        assert_eq!(texts, vec!["C", "B"], "A evicted from the tail");
    }

    #[test]
    fn test_length_bounded_after_every_operation() {
        let mut store = HistoryStore::new(5);
        for i in 0..50 {
            store.prepend(Entry::text(format!("item {i}")));
            assert!(store.len() <= store.max_items());
        }
    }

    #[test]
    fn test_set_max_items_shrinks() {
        let mut store = HistoryStore::new(10);
        for i in 0..10 {
            store.prepend(Entry::text(format!("item {i}")));
        }
        store.set_max_items(3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.head().unwrap().as_text(), Some("item 9"));
    }

    #[test]
    fn test_filter_projects_without_mutating() {
        let mut store = HistoryStore::new(10);
        store.prepend(Entry::text("hello"));
        store.prepend(Entry::image("deadbeef"));
        store.prepend(Entry::text("world"));

        assert_eq!(store.filter(Category::Text).count(), 2);
        assert_eq!(store.filter(Category::Image).count(), 1);
        assert_eq!(store.filter(Category::All).count(), 3);
        // Restartable: a second call yields a fresh, identical view
        assert_eq!(store.filter(Category::Text).count(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_manifest_roundtrip_equivalent_store() {
        let mut store = HistoryStore::new(10);
        store.prepend(Entry::text("hello"));
        store.prepend(Entry::image("cafef00d"));
        store.prepend(Entry::text("world"));

        let records = store.to_manifest();
        let restored = HistoryStore::from_manifest(records, 10, |_| true);

        assert_eq!(restored.len(), 3);
        let original: Vec<_> = store.iter().cloned().collect();
        let roundtripped: Vec<_> = restored.iter().cloned().collect();
        assert_eq!(roundtripped, original);
    }

    #[test]
    fn test_from_manifest_skips_missing_blobs() {
        let mut store = HistoryStore::new(10);
        store.prepend(Entry::text("keep me"));
        store.prepend(Entry::image("deadbeef"));
        store.prepend(Entry::text("also keep"));

        let restored = HistoryStore::from_manifest(store.to_manifest(), 10, |fp| fp != "deadbeef");

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.count_of(EntryKind::Image), 0);
        let texts: Vec<_> = restored.iter().filter_map(|e| e.as_text()).collect();
        assert_eq!(texts, vec!["also keep", "keep me"]);
    }

    #[test]
    fn test_from_manifest_respects_cap() {
        let records: Vec<_> = (0..20)
            .map(|i| ManifestRecord::from(&Entry::text(format!("item {i}"))))
            .collect();
        let restored = HistoryStore::from_manifest(records, 5, |_| true);
        assert_eq!(restored.len(), 5);
    }

    #[test]
    fn test_live_fingerprints() {
        let mut store = HistoryStore::new(10);
        store.prepend(Entry::image("aa"));
        store.prepend(Entry::image("bb"));
        store.prepend(Entry::image("aa")); // non-consecutive repeat shares the blob
        store.prepend(Entry::text("txt"));

        let live = store.live_fingerprints();
        assert_eq!(live.len(), 2);
        assert!(live.contains("aa") && live.contains("bb"));
    }

    #[test]
    fn test_clear_empties() {
        let mut store = HistoryStore::new(10);
        store.prepend(Entry::text("hello"));
        store.clear();
        assert!(store.is_empty());
        assert!(store.head().is_none());
    }
}
