//! Storage adapter seam
//!
//! The repository talks to the wide-column store only through [`Adapter`], so
//! a real client, the in-memory store and the debug decorator are
//! interchangeable.

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;

use crate::error::StorageError;
use crate::types::{Cell, Mutation, Row, Timestamp};

// =============================================================================
// Adapter Trait
// =============================================================================

/// Proxy between the repository and the actual data source
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Unique identifier for this adapter
    fn adapter_id(&self) -> &str;

    /// Read one full row; a missing row is `None`
    async fn read_row(&self, key: &str) -> Result<Option<Row>, StorageError>;

    /// Visit the rows of `row_set` in key order, keeping only cells accepted
    /// by `filter`
    ///
    /// Rows left without cells are not visited. Scanning stops as soon as
    /// `visit` returns `false`.
    async fn read_rows(
        &self,
        row_set: &RowSet,
        filter: &RowFilter,
        visit: &mut (dyn FnMut(Row) -> bool + Send),
    ) -> Result<(), StorageError>;

    /// Apply one mutation per row key
    ///
    /// The inner vector has one entry per row key, `None` on success. The
    /// outer error reports a failure of the whole call.
    async fn apply_bulk(
        &self,
        row_keys: &[String],
        mutations: &[Mutation],
    ) -> Result<Vec<Option<StorageError>>, StorageError>;
}

// =============================================================================
// Row Sets
// =============================================================================

/// Rows to scan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowSet {
    /// Every row of the table
    #[default]
    All,
    /// Explicit row keys
    Keys(Vec<String>),
    /// Keys in `[start, end)`; an empty `end` is unbounded
    Range {
        /// First key included
        start: String,
        /// First key excluded
        end: String,
    },
    /// Keys starting with a prefix
    Prefix(String),
}

impl RowSet {
    /// Reject row sets that cannot be evaluated
    pub fn validate(&self) -> Result<(), StorageError> {
        match self {
            RowSet::Range { start, end } if !end.is_empty() && start > end => Err(
                StorageError::InvalidRowSet(format!("range start {:?} is after end {:?}", start, end)),
            ),
            _ => Ok(()),
        }
    }

    /// Whether a row key belongs to the set
    pub fn contains(&self, key: &str) -> bool {
        match self {
            RowSet::All => true,
            RowSet::Keys(keys) => keys.iter().any(|k| k == key),
            RowSet::Range { start, end } => {
                key >= start.as_str() && (end.is_empty() || key < end.as_str())
            },
            RowSet::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}

// =============================================================================
// Row Filters
// =============================================================================

/// Cell selection applied while scanning
#[derive(Debug, Clone, Default)]
pub enum RowFilter {
    /// Keep every cell
    #[default]
    PassAll,
    /// Cells of one column family
    Family(String),
    /// Cells whose qualifier matches the whole expression
    ColumnRegex(Regex),
    /// Cells with a timestamp in `[start, end)`
    TimestampRange {
        /// First timestamp included
        start: Timestamp,
        /// First timestamp excluded
        end: Timestamp,
    },
    /// Cells holding exactly this value
    ValueEquals(Bytes),
    /// Cells accepted by every filter of the chain
    Chain(Vec<RowFilter>),
}

impl RowFilter {
    /// Build a qualifier filter; the expression is anchored on both ends
    pub fn column_regex(pattern: &str) -> Result<Self, StorageError> {
        Regex::new(&format!("^(?:{})$", pattern))
            .map(RowFilter::ColumnRegex)
            .map_err(|e| StorageError::InvalidFilter(e.to_string()))
    }

    /// Filter on an exact value
    pub fn value_equals(value: impl Into<Bytes>) -> Self {
        RowFilter::ValueEquals(value.into())
    }

    /// Whether a cell passes the filter
    pub fn matches(&self, cell: &Cell) -> bool {
        match self {
            RowFilter::PassAll => true,
            RowFilter::Family(family) => cell.family() == family,
            RowFilter::ColumnRegex(re) => re.is_match(cell.qualifier()),
            RowFilter::TimestampRange { start, end } => {
                cell.timestamp >= *start && cell.timestamp < *end
            },
            RowFilter::ValueEquals(value) => cell.value == *value,
            RowFilter::Chain(filters) => filters.iter().all(|f| f.matches(cell)),
        }
    }

    /// Copy of `row` holding only the accepted cells; `None` when nothing is left
    pub fn apply(&self, row: &Row) -> Option<Row> {
        let mut kept = Row::new(row.key());
        for (family, cells) in row.families() {
            let cells: Vec<Cell> = cells.iter().filter(|c| self.matches(c)).cloned().collect();
            if !cells.is_empty() {
                kept.set_family(family.clone(), cells);
            }
        }
        if kept.is_empty() {
            None
        } else {
            Some(kept)
        }
    }
}
