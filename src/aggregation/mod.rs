//! Group-By Aggregation Engine
//!
//! Computes count/sum/min/max/average over reconstructed events, one output
//! event per group.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │         Events of a row             │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │   Group key (concatenated values)   │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │  Aggregator(event, group history)   │
//! │  Count / Sum / Min / Max / Average  │
//! │  or an AggregationSet of them       │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │   group key -> representative event │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use wide_column_events::aggregation::{group_by, AggregationSet, Count, Sum};
//! use wide_column_events::types::{Event, Timestamp};
//!
//! let events = vec![
//!     Event::new("r1", Timestamp(1)).with_cell("id", "12").with_cell("amount", "115"),
//!     Event::new("r1", Timestamp(2)).with_cell("id", "12").with_cell("amount", "120"),
//!     Event::new("r1", Timestamp(3)).with_cell("id", "15").with_cell("amount", "200"),
//! ];
//!
//! let set = AggregationSet::new()
//!     .with(Count::new("count"))
//!     .with(Sum::new("amount", "total"));
//! let grouped = group_by(&events, &set, &["id"]);
//!
//! assert_eq!(grouped["12"].get("count"), Some("2"));
//! assert_eq!(grouped["12"].get("total"), Some("235"));
//! assert_eq!(grouped["15"].get("total"), Some("200"));
//! ```

pub mod aggregators;
pub mod group;

pub use aggregators::{format_number, AggregationSet, Aggregator, Average, Count, Max, Min, Sum};
pub use group::{get_latest_by, group_by, group_key};
