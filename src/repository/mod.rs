//! Event Repository
//!
//! Reads rows of a wide-column table as [`EventSet`]s and writes event sets
//! back, translating short stored names through a [`Mapper`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   read / search    ┌─────────┐   cells    ┌──────────────┐
//! │  Repository  │ ─────────────────▶ │ Adapter │ ─────────▶ │ build_events │
//! │              │                    │         │            └──────────────┘
//! │              │   write            │         │            ┌──────────────┐
//! │              │ ◀───────────────── │         │ ◀───────── │build_mutations│
//! └──────────────┘                    └─────────┘            └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wide_column_events::mapping::{Mapper, Mapping};
//! use wide_column_events::repository::{MemoryAdapter, Repository, RepositoryConfig};
//! use wide_column_events::types::{Cell, Timestamp};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mapping = Mapping::from_slice(br#"{"raws": {"u": "url"}}"#).unwrap();
//! let adapter = MemoryAdapter::with_cells(vec![
//!     Cell::new("4321#john", "front:u", Timestamp(1), "/home"),
//! ]);
//! let repo = Repository::new(adapter, Arc::new(Mapper::new(mapping)), RepositoryConfig::default());
//!
//! let set = repo.read("4321#john").await.unwrap();
//! assert_eq!(set.family("front")[0].get("url"), Some("/home"));
//! # }
//! ```

pub mod adapter;
pub mod debug;
pub mod memory;

pub use adapter::{Adapter, RowFilter, RowSet};
pub use debug::DebugAdapter;
pub use memory::{MemoryAdapter, MemoryStats};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::mapping::{build_events, build_mutations, Mapper};
use crate::types::{EventSet, Mutation, Row, Timestamp};

/// Repository configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Maximum number of rows a search reconstructs
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Trace every storage call through a [`DebugAdapter`]
    #[serde(default)]
    pub debug: bool,
}

fn default_max_rows() -> usize {
    100
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            debug: false,
        }
    }
}

/// Reads and writes events through a storage adapter
pub struct Repository {
    adapter: Arc<dyn Adapter>,
    mapper: Arc<Mapper>,
    config: RepositoryConfig,
}

impl Repository {
    /// Create a repository; `config.debug` wraps the adapter in a [`DebugAdapter`]
    pub fn new<A: Adapter>(adapter: A, mapper: Arc<Mapper>, config: RepositoryConfig) -> Self {
        let adapter: Arc<dyn Adapter> = if config.debug {
            Arc::new(DebugAdapter::new(adapter))
        } else {
            Arc::new(adapter)
        };
        info!(
            adapter = adapter.adapter_id(),
            max_rows = config.max_rows,
            debug = config.debug,
            "Repository created"
        );
        Self {
            adapter,
            mapper,
            config,
        }
    }

    /// The mapper used for translation
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Repository configuration
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Read one row as events; a missing row gives an empty set
    pub async fn read(&self, key: &str) -> Result<EventSet, StorageError> {
        let rows: Vec<Row> = self.adapter.read_row(key).await?.into_iter().collect();
        Ok(self.build_event_set(&rows))
    }

    /// Find events with at least one cell matching `filter`
    ///
    /// Matching rows are scanned first (at most `max_rows` of them) to collect
    /// the timestamps of the matching cells. Each row is then read in full and
    /// every cell sharing one of those timestamps is kept, so returned events
    /// carry all their attributes and not only the filtered ones.
    pub async fn search(&self, filter: &RowFilter) -> Result<EventSet, StorageError> {
        let hits = self.scan_timestamps(filter).await?;

        let mut rows = Vec::with_capacity(hits.len());
        for (key, timestamps) in &hits {
            match self.adapter.read_row(key).await? {
                Some(row) => rows.push(keep_timestamps(&row, timestamps)),
                None => debug!(key = %key, "Row vanished between scan and read"),
            }
        }

        let set = self.build_event_set(&rows);
        debug!(rows = rows.len(), events = set.event_count(), "Search complete");
        Ok(set)
    }

    /// Build events from every row of `row_set`, with no row limit
    ///
    /// Only cells passing `filter` are kept, so unlike [`search`](Self::search)
    /// a selective filter yields partial events.
    pub async fn scan(&self, row_set: &RowSet, filter: &RowFilter) -> Result<EventSet, StorageError> {
        let mut rows = Vec::new();
        self.adapter
            .read_rows(row_set, filter, &mut |row: Row| {
                rows.push(row);
                true
            })
            .await?;

        let set = self.build_event_set(&rows);
        debug!(rows = rows.len(), events = set.event_count(), "Scan complete");
        Ok(set)
    }

    /// Write every event of the set, one mutation per row
    ///
    /// Returns one entry per written row, in row key order, `None` on success.
    pub async fn write(&self, set: &EventSet) -> Result<Vec<Option<StorageError>>, StorageError> {
        let mut by_row: Vec<(String, Mutation)> = build_mutations(&self.mapper, set).into_iter().collect();
        by_row.sort_by(|a, b| a.0.cmp(&b.0));
        let (row_keys, mutations): (Vec<String>, Vec<Mutation>) = by_row.into_iter().unzip();

        let results = self.adapter.apply_bulk(&row_keys, &mutations).await?;
        let failed = results.iter().filter(|r| r.is_some()).count();
        debug!(rows = row_keys.len(), failed, "Write complete");
        Ok(results)
    }

    async fn scan_timestamps(
        &self,
        filter: &RowFilter,
    ) -> Result<BTreeMap<String, HashSet<Timestamp>>, StorageError> {
        let limit = self.config.max_rows;
        let mut hits: BTreeMap<String, HashSet<Timestamp>> = BTreeMap::new();
        let mut truncated = false;
        self.adapter
            .read_rows(&RowSet::All, filter, &mut |row: Row| {
                if hits.len() == limit {
                    truncated = true;
                    return false;
                }
                let timestamps = row.cells().map(|c| c.timestamp).collect();
                hits.insert(row.key().to_string(), timestamps);
                true
            })
            .await?;
        if truncated {
            warn!(max_rows = limit, "Search reached the row limit; remaining rows were skipped");
        }
        Ok(hits)
    }

    fn build_event_set(&self, rows: &[Row]) -> EventSet {
        let mut set = EventSet::new();
        for row in rows {
            for (family, cells) in row.families() {
                let (columns, events) = build_events(&self.mapper, cells);
                set.add_family(family.clone(), columns, events);
            }
        }
        set
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("adapter", &self.adapter.adapter_id())
            .field("config", &self.config)
            .finish()
    }
}

/// Copy of `row` restricted to cells written at one of `timestamps`
fn keep_timestamps(row: &Row, timestamps: &HashSet<Timestamp>) -> Row {
    let mut kept = Row::new(row.key());
    for (family, cells) in row.families() {
        let cells = cells
            .iter()
            .filter(|c| timestamps.contains(&c.timestamp))
            .cloned()
            .collect();
        kept.set_family(family.clone(), cells);
    }
    kept
}
