//! Row key builder
//!
//! Row keys join their parts with a separator, e.g. `europe-west1#2021#week1`.
//! Sequential numeric identifiers make adjacent keys hot-spot the same tablet,
//! so by default integer-looking parts are written with their digits reversed.
//!
//! # Example
//!
//! ```rust
//! use wide_column_events::rowkey::{KeyPartProcessor, RowKeyBuilder, RowKeyConfig};
//!
//! let builder = RowKeyBuilder::default();
//! assert_eq!(builder.to_row_key(&["1234", "john"]), "4321#john");
//!
//! let builder = RowKeyBuilder::new(RowKeyConfig {
//!     separator: ":".to_string(),
//!     process: KeyPartProcessor::Identity,
//! });
//! assert_eq!(builder.to_row_key(&["1234", "john"]), "1234:john");
//! ```

use std::fmt;
use std::sync::Arc;

/// Default separator between key parts
pub const DEFAULT_SEPARATOR: &str = "#";

/// Transformation applied to every key part
#[derive(Clone, Default)]
pub enum KeyPartProcessor {
    /// Reverse the part only when it parses as an integer
    #[default]
    ReverseIfInteger,
    /// Reverse every part
    Reverse,
    /// Keep parts unchanged
    Identity,
    /// Custom transformation
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl KeyPartProcessor {
    /// Apply the transformation to one part
    pub fn apply(&self, part: &str) -> String {
        match self {
            KeyPartProcessor::ReverseIfInteger => reverse_if_integer(part),
            KeyPartProcessor::Reverse => reverse(part),
            KeyPartProcessor::Identity => part.to_string(),
            KeyPartProcessor::Custom(f) => f(part),
        }
    }

    /// Parse a processor name as used in configuration files
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reverse_if_integer" => Some(KeyPartProcessor::ReverseIfInteger),
            "reverse" => Some(KeyPartProcessor::Reverse),
            "identity" => Some(KeyPartProcessor::Identity),
            _ => None,
        }
    }
}

impl fmt::Debug for KeyPartProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPartProcessor::ReverseIfInteger => write!(f, "ReverseIfInteger"),
            KeyPartProcessor::Reverse => write!(f, "Reverse"),
            KeyPartProcessor::Identity => write!(f, "Identity"),
            KeyPartProcessor::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Row key builder configuration
#[derive(Debug, Clone)]
pub struct RowKeyConfig {
    /// Separator placed between parts (default `#`)
    pub separator: String,
    /// Transformation of each part (default: reverse integers)
    pub process: KeyPartProcessor,
}

impl Default for RowKeyConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            process: KeyPartProcessor::default(),
        }
    }
}

/// Builds row keys from parts
#[derive(Debug, Clone, Default)]
pub struct RowKeyBuilder {
    config: RowKeyConfig,
}

impl RowKeyBuilder {
    /// Create a builder
    pub fn new(config: RowKeyConfig) -> Self {
        Self { config }
    }

    /// Process every part and join them with the separator
    pub fn to_row_key<S: AsRef<str>>(&self, parts: &[S]) -> String {
        parts
            .iter()
            .map(|part| self.config.process.apply(part.as_ref()))
            .collect::<Vec<_>>()
            .join(&self.config.separator)
    }
}

/// Reverse the characters of a string
pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

/// Reverse the characters of a string if it is an integer, keep it otherwise
pub fn reverse_if_integer(s: &str) -> String {
    if is_integer(s) {
        reverse(s)
    } else {
        s.to_string()
    }
}

fn is_integer(part: &str) -> bool {
    part.parse::<i64>().is_ok()
}
