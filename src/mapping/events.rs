//! Event reconstruction
//!
//! A row stores one event as a group of cells sharing a timestamp. Reading
//! folds cells into events keyed by `(row, timestamp)`; writing flattens
//! events back into per-row mutations.
//!
//! ```text
//!  row r1                         events
//!  ┌──────────┬──────┬───────┐    ┌──────────────────────────────────────┐
//!  │ front:d  │ T1   │ "1"   │───▶│ (r1, T1) {device_type: Smartphone,   │
//!  │ front:3  │ T1   │ "1"   │───▶│           event_type: purchase}      │
//!  │ front:d  │ T2   │ "2"   │───▶│ (r1, T2) {device_type: Computer}     │
//!  └──────────┴──────┴───────┘    └──────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::trace;

use super::Mapper;
use crate::types::{strip_family, Cell, Event, EventSet, Mutation, Timestamp};

/// Fold cells into events, one per distinct `(row, timestamp)`
///
/// Each cell's qualifier (family prefix stripped) and value go through
/// [`Mapper::seek`]. When several cells of one bucket translate to the same
/// attribute, the last one wins.
///
/// Returns the sorted attribute names seen and the events ordered by row key
/// then ascending timestamp.
pub fn build_events<'a, I>(mapper: &Mapper, cells: I) -> (Vec<String>, Vec<Event>)
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut buckets: BTreeMap<&str, BTreeMap<Timestamp, HashMap<String, String>>> = BTreeMap::new();
    let mut columns = BTreeSet::new();

    for cell in cells {
        let (column, value) = mapper.seek(strip_family(&cell.column), &cell.value_str());
        columns.insert(column.clone());
        buckets
            .entry(cell.row_key.as_str())
            .or_default()
            .entry(cell.timestamp)
            .or_default()
            .insert(column, value);
    }

    let events: Vec<Event> = buckets
        .into_iter()
        .flat_map(|(row_key, by_time)| {
            by_time.into_iter().map(move |(date, cells)| Event {
                row_key: row_key.to_string(),
                date,
                cells,
            })
        })
        .collect();

    trace!(events = events.len(), columns = columns.len(), "Built events");
    (columns.into_iter().collect(), events)
}

/// Flatten an event set into one mutation per row
///
/// Every attribute goes through [`Mapper::unseek`] and becomes a cell write at
/// the event's own timestamp, in the event's family. Attributes are written in
/// name order.
pub fn build_mutations(mapper: &Mapper, set: &EventSet) -> HashMap<String, Mutation> {
    let mut mutations: HashMap<String, Mutation> = HashMap::new();
    let mut families: Vec<&String> = set.events.keys().collect();
    families.sort();

    for family in families {
        for event in &set.events[family] {
            let mutation = mutations.entry(event.row_key.clone()).or_default();
            let mut attributes: Vec<(&String, &String)> = event.cells.iter().collect();
            attributes.sort();
            for (name, value) in attributes {
                let (column, value) = mapper.unseek(name, value);
                mutation.set(family.as_str(), column, event.date, value);
            }
        }
    }
    mutations
}
