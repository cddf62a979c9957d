//! Bounded in-memory cache of decoded clipboard images.
//!
//! Maps fingerprint -> decoded RGBA image with a per-entry cost (estimated
//! byte footprint) under a total budget. Eviction is strict insertion
//! order: lookups use `LruCache::peek` and never bump recency, so the
//! underlying recency list degenerates to insertion order. That is a
//! deliberate simplification of LRU; the working set is small and recency
//! of capture tracks recency of use for a clipboard history.

use image::RgbaImage;
use lru::LruCache;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a cache insert. The cache is best-effort; a rejection is a
/// miss path, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    Inserted,
    /// Cost exceeds the whole budget; the cache is left unmodified.
    Rejected,
}

struct CachedImage {
    image: Arc<RgbaImage>,
    cost: u64,
}

pub struct ImageCache {
    entries: LruCache<String, CachedImage>,
    max_cost: u64,
    current_cost: u64,
}

impl ImageCache {
    pub fn new(max_cost: u64) -> Self {
        ImageCache {
            entries: LruCache::unbounded(),
            max_cost,
            current_cost: 0,
        }
    }

    /// Insert a decoded image under `key` with an estimated cost.
    ///
    /// If `cost` exceeds the whole budget the insert is rejected outright
    /// and the cache is untouched (no partial insert, no eviction churn).
    /// Otherwise entries are evicted oldest-first until the candidate fits.
    pub fn insert(&mut self, key: impl Into<String>, image: Arc<RgbaImage>, cost: u64) -> InsertStatus {
        if cost > self.max_cost {
            debug!(cost, max_cost = self.max_cost, "Image too large to cache");
            return InsertStatus::Rejected;
        }

        let key = key.into();

        // Re-inserting an existing key must not double-count its cost.
        if let Some(old) = self.entries.pop(&key) {
            self.current_cost -= old.cost;
        }

        while self.current_cost + cost > self.max_cost {
            match self.entries.pop_lru() {
                Some((evicted_key, evicted)) => {
                    self.current_cost -= evicted.cost;
                    debug!(key = %evicted_key, cost = evicted.cost, "Evicted cached image");
                }
                None => break,
            }
        }

        self.entries.push(key, CachedImage { image, cost });
        self.current_cost += cost;
        InsertStatus::Inserted
    }

    /// Look up a cached image. A miss signals "go to durable storage".
    /// Does not bump recency.
    pub fn get(&self, key: &str) -> Option<Arc<RgbaImage>> {
        self.entries.peek(key).map(|cached| cached.image.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Shrink (or grow) the budget, evicting immediately until the current
    /// cost fits the new budget.
    pub fn set_max_cost(&mut self, max_cost: u64) {
        self.max_cost = max_cost;
        while self.current_cost > self.max_cost {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.current_cost -= evicted.cost,
                None => break,
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_cost = 0;
    }

    pub fn current_cost(&self) -> u64 {
        self.current_cost
    }

    pub fn max_cost(&self) -> u64 {
        self.max_cost
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
