//! Wide-column events - event access layer for wide-column stores
//!
//! This library stores events in a wide-column table and reads them back:
//! - Short stored column names and values translated to readable ones through
//!   a JSON mapping document (and back for writes)
//! - Cells sharing a timestamp folded into one event
//! - Group-by aggregation (count, sum, min, max, average) over events
//! - Row key construction that avoids hot-spotting sequential identifiers
//! - A repository over a pluggable async storage adapter

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Mapping documents, translation and event reconstruction
pub mod mapping;

/// Group-by aggregation over events
pub mod aggregation;

/// Row key construction
pub mod rowkey;

/// Repository over a storage adapter
pub mod repository;

/// Configuration management with TOML support
pub mod config;

// Re-export main types
pub use error::{Error, MappingError, Result, StorageError};
pub use mapping::{Mapper, Mapping};
pub use repository::{Repository, RepositoryConfig};
pub use types::{Cell, Event, EventSet, Timestamp};
