//! Schema Mapping Between Wire Columns and Readable Events
//!
//! Wide-column stores treat column qualifiers as data, so every byte of a
//! qualifier costs storage and transfer. Rows are therefore written with short
//! qualifiers and enum codes, and this module translates them back and forth.
//!
//! # Mapping Document
//!
//! ```json
//! {
//!   "raws": { "ui": "user_id" },
//!   "mapped": {
//!     "oi": { "name": "is_opted_in", "values": { "0": "false", "1": "true" } }
//!   },
//!   "reversed": [
//!     { "name": "order_status", "values": { "1": "pending_payment", "3": "processing" } }
//!   ]
//! }
//! ```
//!
//! - **raws**: only the qualifier is renamed
//! - **mapped**: the qualifier is renamed and the value goes through an enum table
//! - **reversed**: the qualifier itself is the enum code, its value is ignored
//!
//! With the document above, the cells `{"ui": "12345", "oi": "1", "3": "1"}`
//! become the event `{"user_id": "12345", "is_opted_in": "true", "order_status": "processing"}`.
//!
//! # Components
//!
//! - [`Mapping`]: the parsed document
//! - [`Mapper`]: ordered rule chains with a reverse-lookup cache
//! - [`events`]: folding cells into events and events into mutations
//! - [`store`]: versioned mapping documents in an object store

pub mod cache;
pub mod events;
pub mod mapper;
pub mod rules;
pub mod store;

pub use cache::{CacheEntry, ReverseCache, ReverseCacheStats};
pub use events::{build_events, build_mutations};
pub use mapper::{Mapper, MapperStats, MapperStatsSnapshot};
pub use rules::{SeekRule, UnseekRule};
pub use store::{LocalObjectStore, MappingStore, MappingStoreConfig, ObjectStore};

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// Mapping between data stored in the wide-column store and its readable form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Columns whose qualifier is renamed, values kept as they are
    #[serde(default)]
    pub raws: BTreeMap<String, String>,

    /// Columns renamed with their values mapped through an enum table
    #[serde(default)]
    pub mapped: BTreeMap<String, Map>,

    /// Enums encoded in the qualifier itself
    #[serde(default)]
    pub reversed: Vec<Map>,
}

/// A readable column name with its enum table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    /// Readable column name
    pub name: String,

    /// Short value -> readable value
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl Map {
    /// Create a map from a name and `(short, readable)` pairs
    pub fn new(name: impl Into<String>, values: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Mapping {
    /// Parse a mapping document from bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MappingError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Parse a mapping document from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MappingError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a mapping document from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let contents = std::fs::read(path.as_ref())?;
        Self::from_slice(&contents)
    }

    /// Serialize to a JSON document
    pub fn to_json(&self) -> Result<Vec<u8>, MappingError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Total number of rules across the three classes
    pub fn rule_count(&self) -> usize {
        self.raws.len() + self.mapped.len() + self.reversed.len()
    }

    /// Short columns declared in more than one class
    ///
    /// Such columns are resolved by whichever rule comes first in the chain
    /// (raws, then mapped, then reversed).
    pub fn overlapping_columns(&self) -> Vec<String> {
        let mut seen: BTreeMap<&str, u8> = BTreeMap::new();
        for short in self.raws.keys() {
            *seen.entry(short.as_str()).or_default() |= 0b001;
        }
        for short in self.mapped.keys() {
            *seen.entry(short.as_str()).or_default() |= 0b010;
        }
        for short in self.reversed.iter().flat_map(|m| m.values.keys()) {
            *seen.entry(short.as_str()).or_default() |= 0b100;
        }
        seen.into_iter()
            .filter(|(_, classes)| classes.count_ones() > 1)
            .map(|(short, _)| short.to_string())
            .collect()
    }
}
