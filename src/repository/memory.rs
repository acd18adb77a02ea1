//! In-memory adapter
//!
//! A complete [`Adapter`] over a sorted map, used for tests, the CLI and
//! local experiments. Data is lost when the adapter is dropped.
//!
//! Cells of a family are kept sorted by column, then by newest timestamp
//! first, which is the order a wide-column store returns them in.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::adapter::{Adapter, RowFilter, RowSet};
use crate::error::StorageError;
use crate::types::{Cell, Mutation, Row};

type Families = BTreeMap<String, Vec<Cell>>;

/// In-memory table
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    /// row key -> family -> cells
    rows: RwLock<BTreeMap<String, Families>>,
    /// Statistics
    stats: MemoryStatsAtomic,
}

#[derive(Debug, Default)]
struct MemoryStatsAtomic {
    rows_read: AtomicU64,
    cells_written: AtomicU64,
}

/// Memory adapter statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Number of rows stored
    pub rows: usize,
    /// Number of rows handed to readers
    pub rows_read: u64,
    /// Number of cell writes applied
    pub cells_written: u64,
}

impl MemoryAdapter {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding `cells`
    pub fn with_cells<I: IntoIterator<Item = Cell>>(cells: I) -> Self {
        let adapter = Self::new();
        adapter.insert_cells(cells);
        adapter
    }

    /// Store raw cells, replacing any cell with the same column and timestamp
    pub fn insert_cells<I: IntoIterator<Item = Cell>>(&self, cells: I) {
        let mut rows = self.rows.write();
        for cell in cells {
            let families = rows.entry(cell.row_key.clone()).or_default();
            let family = families.entry(cell.family().to_string()).or_default();
            upsert(family, cell);
            self.stats.cells_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of rows stored
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    /// Statistics
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            rows: self.row_count(),
            rows_read: self.stats.rows_read.load(Ordering::Relaxed),
            cells_written: self.stats.cells_written.load(Ordering::Relaxed),
        }
    }

    fn snapshot_row(key: &str, families: &Families) -> Row {
        let mut row = Row::new(key);
        for (family, cells) in families {
            row.set_family(family.clone(), cells.clone());
        }
        row
    }
}

fn upsert(cells: &mut Vec<Cell>, cell: Cell) {
    match cells
        .iter_mut()
        .find(|c| c.column == cell.column && c.timestamp == cell.timestamp)
    {
        Some(existing) => existing.value = cell.value,
        None => {
            cells.push(cell);
            cells.sort_by(|a, b| {
                a.column
                    .cmp(&b.column)
                    .then_with(|| b.timestamp.cmp(&a.timestamp))
            });
        },
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn adapter_id(&self) -> &str {
        "memory"
    }

    async fn read_row(&self, key: &str) -> Result<Option<Row>, StorageError> {
        let row = self
            .rows
            .read()
            .get(key)
            .map(|families| Self::snapshot_row(key, families))
            .filter(|row| !row.is_empty());
        if row.is_some() {
            self.stats.rows_read.fetch_add(1, Ordering::Relaxed);
        }
        Ok(row)
    }

    async fn read_rows(
        &self,
        row_set: &RowSet,
        filter: &RowFilter,
        visit: &mut (dyn FnMut(Row) -> bool + Send),
    ) -> Result<(), StorageError> {
        row_set.validate()?;

        // Snapshot under the lock, visit without it
        let matching: Vec<Row> = {
            let rows = self.rows.read();
            rows.iter()
                .filter(|(key, _)| row_set.contains(key))
                .filter_map(|(key, families)| filter.apply(&Self::snapshot_row(key, families)))
                .collect()
        };

        for row in matching {
            self.stats.rows_read.fetch_add(1, Ordering::Relaxed);
            if !visit(row) {
                break;
            }
        }
        Ok(())
    }

    async fn apply_bulk(
        &self,
        row_keys: &[String],
        mutations: &[Mutation],
    ) -> Result<Vec<Option<StorageError>>, StorageError> {
        if row_keys.len() != mutations.len() {
            return Err(StorageError::BulkSizeMismatch {
                keys: row_keys.len(),
                mutations: mutations.len(),
            });
        }

        let mut rows = self.rows.write();
        let mut results = Vec::with_capacity(row_keys.len());
        for (key, mutation) in row_keys.iter().zip(mutations) {
            if key.is_empty() {
                results.push(Some(StorageError::Backend("empty row key".to_string())));
                continue;
            }
            let families = rows.entry(key.clone()).or_default();
            for set in mutation.cells() {
                let cell = Cell::new(
                    key.as_str(),
                    format!("{}:{}", set.family, set.column),
                    set.timestamp,
                    set.value.clone(),
                );
                upsert(families.entry(set.family.clone()).or_default(), cell);
                self.stats.cells_written.fetch_add(1, Ordering::Relaxed);
            }
            results.push(None);
        }
        debug!(rows = row_keys.len(), "Applied bulk mutations");
        Ok(results)
    }
}
