//! Group-by over events
//!
//! Both entry points bucket events by a group key: the concatenation, in
//! order and without separator, of the values the event holds for the group
//! columns. A missing column contributes nothing to the key, so `("ab", -)`
//! and `("a", "b")` share a bucket.

use std::collections::HashMap;

use super::aggregators::Aggregator;
use crate::types::Event;

/// Build the group key of an event
pub fn group_key<S: AsRef<str>>(event: &Event, columns: &[S]) -> String {
    let mut key = String::new();
    for column in columns {
        if let Some(value) = event.cells.get(column.as_ref()) {
            key.push_str(value);
        }
    }
    key
}

/// Group events, keeping the most recent event of each group
///
/// No aggregation is performed. On equal dates the event seen first is kept.
pub fn get_latest_by<S: AsRef<str>>(events: &[Event], columns: &[S]) -> HashMap<String, Event> {
    let mut result: HashMap<String, Event> = HashMap::new();
    for event in events {
        let key = group_key(event, columns);
        match result.get(&key) {
            Some(kept) if !event.date.is_after(&kept.date) => {},
            _ => {
                result.insert(key, event.clone());
            },
        }
    }
    result
}

/// Group events, folding each group through an aggregator
///
/// Events are visited in order. For each one the aggregator receives a copy
/// of the event and the group members seen before it (the current event is
/// not part of that history). The returned event replaces the group's
/// representative, then the input event joins the history.
///
/// Every new member re-reads its whole group history, so this is meant for
/// working sets the size of a row, not whole tables.
pub fn group_by<A, S>(events: &[Event], aggregator: &A, columns: &[S]) -> HashMap<String, Event>
where
    A: Aggregator + ?Sized,
    S: AsRef<str>,
{
    let mut result: HashMap<String, Event> = HashMap::new();
    let mut groups: HashMap<String, Vec<&Event>> = HashMap::new();
    for event in events {
        let key = group_key(event, columns);
        let history = groups.entry(key.clone()).or_default();
        let representative = aggregator.compute(event.clone(), history);
        history.push(event);
        result.insert(key, representative);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregators::{Count, Sum};
    use crate::types::Timestamp;

    fn event(date: i64, cells: &[(&str, &str)]) -> Event {
        let mut e = Event::new("row", Timestamp(date));
        for (k, v) in cells {
            e.set(*k, *v);
        }
        e
    }

    fn cities() -> Vec<Event> {
        vec![
            event(1, &[("country", "france"), ("city", "paris"), ("population", "1200000")]),
            event(24, &[("country", "france"), ("city", "paris"), ("population", "1500000")]),
            event(1, &[("country", "texas"), ("city", "paris"), ("population", "400000")]),
            event(13, &[("country", "texas"), ("city", "paris"), ("population", "450000")]),
            event(23, &[("country", "texas"), ("city", "paris"), ("population", "500000")]),
            event(1, &[("country", "france"), ("city", "marseille"), ("population", "900000")]),
            event(30, &[("country", "france"), ("city", "marseille"), ("population", "1200000")]),
            event(20, &[("country", "germany"), ("city", "berlin"), ("population", "1800000")]),
        ]
    }

    #[test]
    fn test_group_key() {
        let e = event(0, &[("a", "x"), ("b", "y")]);
        assert_eq!(group_key(&e, &["a", "b"]), "xy");
        assert_eq!(group_key(&e, &["b", "a"]), "yx");
        assert_eq!(group_key(&e, &["a", "missing", "b"]), "xy");
        assert_eq!(group_key(&e, &[] as &[&str]), "");
    }

    #[test]
    fn test_group_key_collision_without_separator() {
        let left = event(0, &[("a", "ab")]);
        let right = event(0, &[("a", "a"), ("b", "b")]);
        assert_eq!(group_key(&left, &["a", "b"]), group_key(&right, &["a", "b"]));
    }

    #[test]
    fn test_get_latest_by_one_column() {
        let events = vec![
            event(6, &[("id", "12"), ("status", "added")]),
            event(9, &[("id", "12"), ("status", "confirmed")]),
            event(6, &[("id", "15"), ("status", "added")]),
            event(2, &[("id", "12"), ("status", "added")]),
            event(9, &[("id", "15"), ("status", "canceled")]),
            event(0, &[("id", "16"), ("status", "added")]),
        ];
        let result = get_latest_by(&events, &["id"]);
        assert_eq!(result.len(), 3);
        assert_eq!(result["12"], events[1]);
        assert_eq!(result["15"], events[4]);
        assert_eq!(result["16"], events[5]);
    }

    #[test]
    fn test_get_latest_by_two_columns() {
        let lines = cities();
        let result = get_latest_by(&lines, &["country", "city"]);
        assert_eq!(result.len(), 4);
        assert_eq!(result["francemarseille"], lines[6]);
        assert_eq!(result["franceparis"], lines[1]);
        assert_eq!(result["germanyberlin"], lines[7]);
        assert_eq!(result["texasparis"], lines[4]);
    }

    #[test]
    fn test_get_latest_by_keeps_first_on_ties() {
        let events = vec![
            event(5, &[("id", "1"), ("n", "first")]),
            event(5, &[("id", "1"), ("n", "second")]),
        ];
        let result = get_latest_by(&events, &["id"]);
        assert_eq!(result["1"].get("n"), Some("first"));
    }

    #[test]
    fn test_group_by_count() {
        let lines = cities();
        let result = group_by(&lines, &Count::new("count"), &["country"]);

        assert_eq!(result.len(), 3);
        assert_eq!(result["france"], lines[6].clone().with_cell("count", "4"));
        assert_eq!(result["germany"], lines[7].clone().with_cell("count", "1"));
        assert_eq!(result["texas"], lines[4].clone().with_cell("count", "3"));
    }

    #[test]
    fn test_group_by_leaves_input_untouched() {
        let lines = cities();
        let before = lines.clone();
        let _ = group_by(&lines, &Count::new("count"), &["country"]);
        assert_eq!(lines, before);
    }

    #[test]
    fn test_history_excludes_current_event() {
        let events = vec![event(0, &[("g", "x")]), event(1, &[("g", "x")]), event(2, &[("g", "x")])];
        let seen = std::cell::RefCell::new(Vec::new());
        let probe = |e: Event, history: &[&Event]| {
            seen.borrow_mut().push((e.date.0, history.iter().map(|h| h.date.0).collect::<Vec<_>>()));
            e
        };
        let _ = group_by(&events, &probe, &["g"]);
        assert_eq!(
            seen.into_inner(),
            vec![(0, vec![]), (1, vec![0]), (2, vec![0, 1])]
        );
    }

    #[test]
    fn test_group_by_sum_scenario() {
        let events = vec![
            event(0, &[("id", "12"), ("amount", "115")]),
            event(0, &[("id", "12"), ("amount", "120")]),
            event(0, &[("id", "15"), ("amount", "200")]),
        ];
        let result = group_by(&events, &Sum::new("amount", "total"), &["id"]);
        assert_eq!(result["12"].get("total"), Some("235"));
        assert_eq!(result["15"].get("total"), Some("200"));
    }

    #[test]
    fn test_regrouping_preserves_keys() {
        let lines = cities();
        let columns = ["country", "city"];
        let first = group_by(&lines, &Count::new("count"), &columns);
        let regrouped_input: Vec<Event> = first.values().cloned().collect();
        let second = group_by(&regrouped_input, &Count::new("count"), &columns);

        let mut first_keys: Vec<_> = first.keys().cloned().collect();
        let mut second_keys: Vec<_> = second.keys().cloned().collect();
        first_keys.sort();
        second_keys.sort();
        assert_eq!(first_keys, second_keys);
    }
}
