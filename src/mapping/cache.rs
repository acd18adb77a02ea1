//! Reverse-Lookup Cache
//!
//! Resolving a `reversed` column means scanning every enum table of the
//! mapping. The first resolution of a short column is recorded here so later
//! lookups of the same column skip the scan.
//!
//! # Thread Safety
//!
//! The cache is shared by every reader of a [`Mapper`](super::Mapper). Entries
//! are write-once: the first insert for a key wins and is never mutated, so a
//! reader either misses or sees a complete entry.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// A cached resolution: readable column and readable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Readable column name
    pub column: String,
    /// Readable value
    pub value: String,
}

/// Concurrent short-column -> resolution cache owned by one mapper
#[derive(Debug, Default)]
pub struct ReverseCache {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl ReverseCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a short column
    pub fn get(&self, column: &str) -> Option<CacheEntry> {
        match self.entries.get(column) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Record a resolution, keeping the existing entry if one is present
    ///
    /// Returns the entry now stored under `column`.
    pub fn insert(&self, column: &str, entry: CacheEntry) -> CacheEntry {
        let stored = self.entries.entry(column.to_string()).or_insert_with(|| {
            self.inserts.fetch_add(1, Ordering::Relaxed);
            entry
        });
        stored.value().clone()
    }

    /// Whether a short column is cached
    pub fn contains(&self, column: &str) -> bool {
        self.entries.contains_key(column)
    }

    /// Number of cached columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a snapshot of cache statistics
    pub fn stats(&self) -> ReverseCacheStats {
        ReverseCacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of reverse cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReverseCacheStats {
    /// Cached columns
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed
    pub misses: u64,
    /// Entries written
    pub inserts: u64,
}
