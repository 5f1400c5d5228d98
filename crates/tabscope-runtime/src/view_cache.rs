#![forbid(unsafe_code)]

//! Memoization of [`TimelineView`] builds.
//!
//! Views are keyed by everything they depend on: snapshot fingerprint and
//! event count, window size, and overlap threshold. Pointer traffic, zoom, and tolerance changes
//! never touch the cache; only a new snapshot or a changed window/threshold
//! setting causes a rebuild.
//!
//! # Invalidation
//!
//! Keys are content-addressed, so a new snapshot needs no explicit
//! invalidation. [`ViewCache::invalidate_all`] bumps a generation counter in
//! O(1); older entries are treated as misses and replaced on next access.
//!
//! # Eviction
//!
//! At capacity the least frequently used entry is evicted.

use std::collections::HashMap;
use std::sync::Arc;

use tabscope_core::config::{EngineConfig, WindowSize};
use tabscope_core::event::{Snapshot, SnapshotFingerprint};

use crate::view::TimelineView;

/// Everything a [`TimelineView`] depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub fingerprint: SnapshotFingerprint,
    /// Guards against fingerprint collisions between snapshots of different sizes.
    pub events: usize,
    pub window_ms: u64,
    pub threshold_ms: u64,
}

impl ViewKey {
    #[must_use]
    pub fn new(snapshot: &Snapshot, window_size: WindowSize, threshold_ms: u64) -> Self {
        Self {
            fingerprint: snapshot.fingerprint(),
            events: snapshot.len(),
            window_ms: window_size.as_millis(),
            threshold_ms,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    view: Arc<TimelineView>,
    generation: u64,
    access_count: u32,
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub entries: usize,
    /// Total cache hits since creation or last reset.
    pub hits: u64,
    /// Total cache misses since creation or last reset.
    pub misses: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Caller-owned cache of built views.
#[derive(Debug)]
pub struct ViewCache {
    entries: HashMap<ViewKey, CacheEntry>,
    generation: u64,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl ViewCache {
    /// Cache holding at most `max_entries` views (at least one).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: HashMap::with_capacity(max_entries),
            generation: 0,
            max_entries,
            hits: 0,
            misses: 0,
        }
    }

    /// View of `snapshot` under `config`, built on a miss.
    pub fn get_or_build(&mut self, snapshot: &Snapshot, config: &EngineConfig) -> Arc<TimelineView> {
        let window_size = config.window_size();
        let threshold_ms = config.overlap_threshold();
        let key = ViewKey::new(snapshot, window_size, threshold_ms);
        self.get_or_compute(key, || {
            TimelineView::build_with(snapshot, window_size, threshold_ms)
        })
    }

    /// Cached view for `key`, or the result of `compute` cached under it.
    pub fn get_or_compute<F>(&mut self, key: ViewKey, compute: F) -> Arc<TimelineView>
    where
        F: FnOnce() -> TimelineView,
    {
        if let Some(entry) = self.entries.get_mut(&key)
            && entry.generation == self.generation
        {
            self.hits += 1;
            entry.access_count = entry.access_count.saturating_add(1);
            tracing::trace!(fingerprint = key.fingerprint.0, "view cache hit");
            return Arc::clone(&entry.view);
        }

        self.misses += 1;
        tracing::debug!(
            fingerprint = key.fingerprint.0,
            events = key.events,
            window_ms = key.window_ms,
            threshold_ms = key.threshold_ms,
            "view cache miss"
        );
        let view = Arc::new(compute());

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_lfu();
        }
        self.entries.insert(
            key,
            CacheEntry {
                view: Arc::clone(&view),
                generation: self.generation,
                access_count: 1,
            },
        );
        view
    }

    /// Make every entry stale. O(1); entries are replaced lazily.
    pub fn invalidate_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Drop every entry built from the snapshot with `fingerprint`.
    pub fn invalidate_snapshot(&mut self, fingerprint: SnapshotFingerprint) {
        self.entries.retain(|key, _| key.fingerprint != fingerprint);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Remove every entry immediately.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    fn evict_lfu(&mut self) {
        // Stale entries go first, then the least used.
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.generation == self.generation, e.access_count))
            .map(|(k, _)| *k)
        {
            self.entries.remove(&key);
        }
    }
}

impl Default for ViewCache {
    /// Capacity of 16 views.
    fn default() -> Self {
        Self::new(16)
    }
}
