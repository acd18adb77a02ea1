//! Core data types shared by the mapper, the aggregation engine and the repository
//!
//! # Key Types
//!
//! - **`Timestamp`**: cell version in microseconds since the Unix epoch
//! - **`Cell`**: one raw `(row, family:qualifier, timestamp, value)` unit from the store
//! - **`Row`**: a row key with its cells grouped by column family
//! - **`Event`**: cells of one row sharing a timestamp, translated to readable attributes
//! - **`EventSet`**: events grouped by column family plus the attribute names seen
//! - **`Mutation`**: ordered cell writes for one row
//!
//! # Example
//!
//! ```rust
//! use wide_column_events::types::{Cell, Event, Timestamp};
//!
//! let cell = Cell::new("contact-3", "front:d", Timestamp::from_millis(1000), "1");
//! assert_eq!(cell.family(), "front");
//! assert_eq!(cell.qualifier(), "d");
//!
//! let event = Event::new("contact-3", Timestamp::from_millis(1000))
//!     .with_cell("device_type", "Smartphone");
//! assert_eq!(event.get("device_type"), Some("Smartphone"));
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Timestamp
// ============================================================================

/// Cell version timestamp in microseconds since the Unix epoch
///
/// This is the store-native precision: every cell of one event carries the
/// exact same value, which is what the event reconstruction groups on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create from microseconds
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create from milliseconds
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1000))
    }

    /// Create from a chrono datetime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_micros())
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Microseconds since the epoch
    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Convert to a chrono datetime, `None` when out of chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_micros(self.0).single()
    }

    /// Whether this timestamp is strictly later than `other`
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}us", self.0),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

// ============================================================================
// Cell and Row
// ============================================================================

/// One raw cell as produced by the storage adapter
///
/// `column` is always `"<family>:<qualifier>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Row key the cell belongs to
    pub row_key: String,
    /// Family-qualified column
    pub column: String,
    /// Cell version
    pub timestamp: Timestamp,
    /// Raw value
    #[serde(with = "value_as_str")]
    pub value: Bytes,
}

impl Cell {
    /// Create a new cell
    pub fn new(
        row_key: impl Into<String>,
        column: impl Into<String>,
        timestamp: Timestamp,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            column: column.into(),
            timestamp,
            value: value.into(),
        }
    }

    /// Column family, empty when the column carries no family prefix
    pub fn family(&self) -> &str {
        self.column
            .split_once(':')
            .map(|(family, _)| family)
            .unwrap_or("")
    }

    /// Column qualifier with the family prefix stripped
    pub fn qualifier(&self) -> &str {
        strip_family(&self.column)
    }

    /// Value decoded as UTF-8 (invalid sequences are replaced)
    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Strip the `family:` prefix from a column, returning the qualifier
///
/// Only the first `:` separates the family; a column without one is returned as-is.
pub fn strip_family(column: &str) -> &str {
    column
        .split_once(':')
        .map(|(_, qualifier)| qualifier)
        .unwrap_or(column)
}

/// A row read from the store: its key and its cells grouped by family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    key: String,
    families: BTreeMap<String, Vec<Cell>>,
}

impl Row {
    /// Create an empty row
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            families: BTreeMap::new(),
        }
    }

    /// Row key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a cell under its own family
    pub fn push(&mut self, cell: Cell) {
        self.families
            .entry(cell.family().to_string())
            .or_default()
            .push(cell);
    }

    /// Replace all cells of one family
    pub fn set_family(&mut self, family: impl Into<String>, cells: Vec<Cell>) {
        self.families.insert(family.into(), cells);
    }

    /// Cells grouped by family
    pub fn families(&self) -> &BTreeMap<String, Vec<Cell>> {
        &self.families
    }

    /// Cells of one family
    pub fn family(&self, family: &str) -> Option<&[Cell]> {
        self.families.get(family).map(Vec::as_slice)
    }

    /// Iterate every cell of the row
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.families.values().flatten()
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    /// Whether the row has no cells
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

// ============================================================================
// Event and EventSet
// ============================================================================

/// A single event of a row: all its cells share one timestamp
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Event {
    /// Row key the event was read from (or is written to)
    pub row_key: String,
    /// Event identity within the row
    pub date: Timestamp,
    /// Readable attribute name -> readable value
    pub cells: HashMap<String, String>,
}

impl Event {
    /// Create an event without attributes
    pub fn new(row_key: impl Into<String>, date: Timestamp) -> Self {
        Self {
            row_key: row_key.into(),
            date,
            cells: HashMap::new(),
        }
    }

    /// Builder-style attribute insertion
    pub fn with_cell(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(name.into(), value.into());
        self
    }

    /// Set an attribute
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(name.into(), value.into());
    }

    /// Read an attribute
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cells.get(name).map(String::as_str)
    }
}

/// Events produced by one read, grouped by column family
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventSet {
    /// Sorted, de-duplicated readable attribute names
    pub columns: Vec<String>,
    /// Column family -> events
    pub events: HashMap<String, Vec<Event>>,
}

impl EventSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the events of one family into the set
    ///
    /// Events of a family already present are appended, and `columns` stays
    /// sorted and de-duplicated.
    pub fn add_family(&mut self, family: impl Into<String>, columns: Vec<String>, events: Vec<Event>) {
        self.events.entry(family.into()).or_default().extend(events);
        self.columns.extend(columns);
        self.columns.sort();
        self.columns.dedup();
    }

    /// Events of one family
    pub fn family(&self, family: &str) -> &[Event] {
        self.events.get(family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of events across families
    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Whether the set holds no event
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// One timestamped cell write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCell {
    /// Column family
    pub family: String,
    /// Column qualifier (short form)
    pub column: String,
    /// Cell version
    pub timestamp: Timestamp,
    /// Value to store
    pub value: Bytes,
}

/// Ordered list of cell writes for one row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mutation {
    cells: Vec<SetCell>,
}

impl Mutation {
    /// Create an empty mutation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell write
    pub fn set(
        &mut self,
        family: impl Into<String>,
        column: impl Into<String>,
        timestamp: Timestamp,
        value: impl Into<Bytes>,
    ) {
        self.cells.push(SetCell {
            family: family.into(),
            column: column.into(),
            timestamp,
            value: value.into(),
        });
    }

    /// Cell writes in insertion order
    pub fn cells(&self) -> &[SetCell] {
        &self.cells
    }

    /// Number of cell writes
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the mutation is empty
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Serde helper storing cell values as UTF-8 strings in documents
mod value_as_str {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Bytes::from(s))
    }
}
