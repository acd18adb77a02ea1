//! Mapper: bidirectional translation between wire and readable columns
//!
//! # Example
//!
//! ```rust
//! use wide_column_events::mapping::{Mapper, Mapping};
//!
//! let mapping = Mapping::from_slice(br#"{
//!     "raws": {"ui": "user_id"},
//!     "mapped": {"oi": {"name": "is_opted_in", "values": {"0": "false", "1": "true"}}},
//!     "reversed": [{"name": "order_status", "values": {"3": "processing"}}]
//! }"#).unwrap();
//! let mapper = Mapper::new(mapping);
//!
//! assert_eq!(mapper.seek("oi", "1"), ("is_opted_in".to_string(), "true".to_string()));
//! assert_eq!(mapper.seek("3", "1"), ("order_status".to_string(), "processing".to_string()));
//! assert_eq!(mapper.unseek("order_status", "processing"), ("3".to_string(), "1".to_string()));
//!
//! // Unknown columns pass through unchanged
//! assert_eq!(mapper.seek("zz", "v"), ("zz".to_string(), "v".to_string()));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::cache::{ReverseCache, ReverseCacheStats};
use super::rules::{SeekRule, UnseekRule};
use super::Mapping;

/// Translates data from the store into a readable format and back
///
/// A mapper is `Send + Sync` and meant to be shared (behind an `Arc`) by every
/// reader of one schema. Its only mutable state is the reverse cache.
#[derive(Debug)]
pub struct Mapper {
    mapping: Mapping,
    seekers: Vec<SeekRule>,
    unseekers: Vec<UnseekRule>,
    cache: ReverseCache,
    stats: MapperStats,
}

impl Mapper {
    /// Create a mapper with the default rule chains
    pub fn new(mapping: Mapping) -> Self {
        Self::with_rules(mapping, SeekRule::CHAIN.to_vec(), UnseekRule::CHAIN.to_vec())
    }

    /// Create a mapper with explicit rule chains
    pub fn with_rules(mapping: Mapping, seekers: Vec<SeekRule>, unseekers: Vec<UnseekRule>) -> Self {
        for column in mapping.overlapping_columns() {
            warn!(
                column = %column,
                "Short column declared in several mapping classes, first matching rule wins"
            );
        }
        debug!(
            raws = mapping.raws.len(),
            mapped = mapping.mapped.len(),
            reversed = mapping.reversed.len(),
            "Mapper created"
        );
        Self {
            mapping,
            seekers,
            unseekers,
            cache: ReverseCache::new(),
            stats: MapperStats::default(),
        }
    }

    /// The mapping document this mapper applies
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Translate a wire column and value into their readable form
    ///
    /// Never fails: when no rule matches, the inputs are returned unchanged.
    pub fn seek(&self, column: &str, value: &str) -> (String, String) {
        self.stats.seeks.fetch_add(1, Ordering::Relaxed);
        for rule in &self.seekers {
            if let Some(found) = rule.try_resolve(&self.mapping, &self.cache, column, value) {
                return found;
            }
        }
        self.stats.seek_passthrough.fetch_add(1, Ordering::Relaxed);
        (column.to_string(), value.to_string())
    }

    /// Translate a readable column and value back into their wire form
    ///
    /// Never fails: when no rule matches, the inputs are returned unchanged.
    pub fn unseek(&self, column: &str, value: &str) -> (String, String) {
        self.stats.unseeks.fetch_add(1, Ordering::Relaxed);
        for rule in &self.unseekers {
            if let Some(found) = rule.try_resolve(&self.mapping, column, value) {
                return found;
            }
        }
        self.stats.unseek_passthrough.fetch_add(1, Ordering::Relaxed);
        (column.to_string(), value.to_string())
    }

    /// The reverse-lookup cache
    pub fn reverse_cache(&self) -> &ReverseCache {
        &self.cache
    }

    /// Get a snapshot of mapper statistics
    pub fn stats(&self) -> MapperStatsSnapshot {
        MapperStatsSnapshot {
            seeks: self.stats.seeks.load(Ordering::Relaxed),
            seek_passthrough: self.stats.seek_passthrough.load(Ordering::Relaxed),
            unseeks: self.stats.unseeks.load(Ordering::Relaxed),
            unseek_passthrough: self.stats.unseek_passthrough.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }
}

/// Statistics for translation operations
#[derive(Debug, Default)]
pub struct MapperStats {
    /// Forward translations
    pub seeks: AtomicU64,
    /// Forward translations no rule matched
    pub seek_passthrough: AtomicU64,
    /// Reverse translations
    pub unseeks: AtomicU64,
    /// Reverse translations no rule matched
    pub unseek_passthrough: AtomicU64,
}

/// Snapshot of mapper statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperStatsSnapshot {
    /// Forward translations
    pub seeks: u64,
    /// Forward translations returned unchanged
    pub seek_passthrough: u64,
    /// Reverse translations
    pub unseeks: u64,
    /// Reverse translations returned unchanged
    pub unseek_passthrough: u64,
    /// Reverse cache statistics
    pub cache: ReverseCacheStats,
}
