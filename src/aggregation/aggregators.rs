//! Built-in aggregators
//!
//! An aggregator receives the event being folded and the members of its group
//! seen so far, and returns the group's new representative. The built-ins write
//! their result into a configured output attribute (the "projection") of the
//! event they receive.
//!
//! Numeric aggregators parse the input attribute as `f64`. Values that are
//! missing or fail to parse are skipped without being reported.

use crate::types::Event;

/// A group-by reduction step
pub trait Aggregator {
    /// Fold `event` into its group; `history` holds the earlier members only
    fn compute(&self, event: Event, history: &[&Event]) -> Event;
}

impl<F> Aggregator for F
where
    F: Fn(Event, &[&Event]) -> Event,
{
    fn compute(&self, event: Event, history: &[&Event]) -> Event {
        self(event, history)
    }
}

/// Format a number the way aggregates are stored: shortest form, no exponent
///
/// Infinities are written `+Inf` and `-Inf`, NaN as `NaN`.
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string();
    }
    format!("{}", value)
}

fn parse_number(event: &Event, column: &str) -> Option<f64> {
    event.cells.get(column).and_then(|v| v.parse::<f64>().ok())
}

/// Parsed values of `column` across the history then the current event
fn numbers<'a>(
    column: &'a str,
    event: &'a Event,
    history: &'a [&'a Event],
) -> impl Iterator<Item = f64> + 'a {
    history
        .iter()
        .copied()
        .chain(std::iter::once(event))
        .filter_map(move |e| parse_number(e, column))
}

fn sum(column: &str, event: &Event, history: &[&Event]) -> f64 {
    // `Iterator::sum` starts from -0.0, which would print as "-0"
    numbers(column, event, history).fold(0.0, |total, value| total + value)
}

/// Keep the value `better` prefers, starting from a zero accumulator
fn select_one(column: &str, event: &Event, history: &[&Event], better: impl Fn(f64, f64) -> bool) -> f64 {
    let mut selected = 0.0;
    for value in numbers(column, event, history) {
        if better(value, selected) {
            selected = value;
        }
    }
    selected
}

// ============================================================================
// Count
// ============================================================================

/// Number of events in the group
#[derive(Debug, Clone)]
pub struct Count {
    projection: String,
}

impl Count {
    /// Count into `projection`
    pub fn new(projection: impl Into<String>) -> Self {
        Self {
            projection: projection.into(),
        }
    }
}

impl Aggregator for Count {
    fn compute(&self, mut event: Event, history: &[&Event]) -> Event {
        event.set(self.projection.clone(), (history.len() + 1).to_string());
        event
    }
}

// ============================================================================
// Sum / Average
// ============================================================================

/// Sum of a numeric attribute over the group
#[derive(Debug, Clone)]
pub struct Sum {
    column: String,
    projection: String,
}

impl Sum {
    /// Sum `column` into `projection`
    pub fn new(column: impl Into<String>, projection: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            projection: projection.into(),
        }
    }
}

impl Aggregator for Sum {
    fn compute(&self, mut event: Event, history: &[&Event]) -> Event {
        let total = sum(&self.column, &event, history);
        event.set(self.projection.clone(), format_number(total));
        event
    }
}

/// Average of a numeric attribute over the group
///
/// The divisor is the group size, including members whose value was skipped.
#[derive(Debug, Clone)]
pub struct Average {
    column: String,
    projection: String,
}

impl Average {
    /// Average `column` into `projection`
    pub fn new(column: impl Into<String>, projection: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            projection: projection.into(),
        }
    }
}

impl Aggregator for Average {
    fn compute(&self, mut event: Event, history: &[&Event]) -> Event {
        let total = sum(&self.column, &event, history);
        let average = total / (history.len() + 1) as f64;
        event.set(self.projection.clone(), format_number(average));
        event
    }
}

// ============================================================================
// Max / Min
// ============================================================================

/// Largest value of a numeric attribute over the group
///
/// The accumulator starts at 0, so a group of negative values reports `0`.
#[derive(Debug, Clone)]
pub struct Max {
    column: String,
    projection: String,
}

impl Max {
    /// Maximum of `column` into `projection`
    pub fn new(column: impl Into<String>, projection: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            projection: projection.into(),
        }
    }
}

impl Aggregator for Max {
    fn compute(&self, mut event: Event, history: &[&Event]) -> Event {
        let max = select_one(&self.column, &event, history, |candidate, selected| candidate > selected);
        event.set(self.projection.clone(), format_number(max));
        event
    }
}

/// Smallest value of a numeric attribute over the group
///
/// An accumulator of 0 means "nothing selected yet": any parsed value replaces
/// it, so a 0 in the group is overwritten by the next value that follows it.
#[derive(Debug, Clone)]
pub struct Min {
    column: String,
    projection: String,
}

impl Min {
    /// Minimum of `column` into `projection`
    pub fn new(column: impl Into<String>, projection: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            projection: projection.into(),
        }
    }
}

impl Aggregator for Min {
    fn compute(&self, mut event: Event, history: &[&Event]) -> Event {
        let min = select_one(&self.column, &event, history, |candidate, selected| {
            selected == 0.0 || candidate < selected
        });
        event.set(self.projection.clone(), format_number(min));
        event
    }
}

// ============================================================================
// Aggregation Set
// ============================================================================

/// Several aggregators applied in order to the same event
///
/// Each aggregator receives the output of the previous one, so when two of
/// them write the same projection the last one wins.
#[derive(Default)]
pub struct AggregationSet {
    aggregators: Vec<Box<dyn Aggregator + Send + Sync>>,
}

impl AggregationSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an aggregator
    pub fn add<A>(&mut self, aggregator: A)
    where
        A: Aggregator + Send + Sync + 'static,
    {
        self.aggregators.push(Box::new(aggregator));
    }

    /// Builder-style [`add`](Self::add)
    pub fn with<A>(mut self, aggregator: A) -> Self
    where
        A: Aggregator + Send + Sync + 'static,
    {
        self.add(aggregator);
        self
    }

    /// Number of aggregators
    pub fn len(&self) -> usize {
        self.aggregators.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.aggregators.is_empty()
    }
}

impl std::fmt::Debug for AggregationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationSet")
            .field("aggregators", &self.aggregators.len())
            .finish()
    }
}

impl Aggregator for AggregationSet {
    fn compute(&self, event: Event, history: &[&Event]) -> Event {
        self.aggregators
            .iter()
            .fold(event, |event, aggregator| aggregator.compute(event, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::group_by;
    use crate::types::Timestamp;

    fn amounts(values: &[(&str, &str)]) -> Vec<Event> {
        values
            .iter()
            .map(|(id, amount)| {
                Event::new("row", Timestamp(0))
                    .with_cell("id", *id)
                    .with_cell("amount", *amount)
            })
            .collect()
    }

    fn orders() -> Vec<Event> {
        amounts(&[
            ("12", "115"),
            ("12", "120"),
            ("15", "200"),
            ("12", "110"),
            ("15", "100"),
            ("16", "900"),
        ])
    }

    fn projected(result: &std::collections::HashMap<String, Event>, key: &str, column: &str) -> String {
        result[key].get(column).unwrap_or_default().to_string()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(235.0), "235");
        assert_eq!(format_number(117.5), "117.5");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(1e21), "1000000000000000000000");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_number(f64::INFINITY), "+Inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_number(f64::NAN), "NaN");

        let events = amounts(&[("1", "1.7e308"), ("1", "1.7e308")]);
        let result = group_by(&events, &Sum::new("amount", "total"), &["id"]);
        assert_eq!(result["1"].get("total"), Some("+Inf"));
    }

    #[test]
    fn test_average() {
        let result = group_by(&orders(), &Average::new("amount", "average"), &["id"]);
        assert_eq!(projected(&result, "12", "average"), "115");
        assert_eq!(projected(&result, "15", "average"), "150");
        assert_eq!(projected(&result, "16", "average"), "900");
        assert_eq!(projected(&result, "12", "amount"), "110");
    }

    #[test]
    fn test_sum() {
        let result = group_by(&orders(), &Sum::new("amount", "total"), &["id"]);
        assert_eq!(projected(&result, "12", "total"), "345");
        assert_eq!(projected(&result, "15", "total"), "300");
        assert_eq!(projected(&result, "16", "total"), "900");
    }

    #[test]
    fn test_max_and_min() {
        let result = group_by(&orders(), &Max::new("amount", "max"), &["id"]);
        assert_eq!(projected(&result, "12", "max"), "120");
        assert_eq!(projected(&result, "15", "max"), "200");

        let result = group_by(&orders(), &Min::new("amount", "min"), &["id"]);
        assert_eq!(projected(&result, "12", "min"), "110");
        assert_eq!(projected(&result, "15", "min"), "100");
        assert_eq!(projected(&result, "16", "min"), "900");
    }

    #[test]
    fn test_unparsable_values_are_skipped() {
        let events = amounts(&[("1", "10"), ("1", "n/a"), ("1", "30.5"), ("1", "")]);
        let result = group_by(&events, &Sum::new("amount", "total"), &["id"]);
        assert_eq!(projected(&result, "1", "total"), "40.5");

        let result = group_by(&events, &Max::new("amount", "max"), &["id"]);
        assert_eq!(projected(&result, "1", "max"), "30.5");

        // Skipped values still count towards the divisor
        let result = group_by(&events, &Average::new("amount", "avg"), &["id"]);
        assert_eq!(projected(&result, "1", "avg"), "10.125");
    }

    #[test]
    fn test_missing_input_column() {
        let events = vec![Event::new("row", Timestamp(0)).with_cell("id", "1")];
        let result = group_by(&events, &Sum::new("amount", "total"), &["id"]);
        assert_eq!(projected(&result, "1", "total"), "0");
    }

    #[test]
    fn test_max_of_negative_values_is_zero() {
        let events = amounts(&[("1", "-5"), ("1", "-2")]);
        let result = group_by(&events, &Max::new("amount", "max"), &["id"]);
        assert_eq!(projected(&result, "1", "max"), "0");
    }

    #[test]
    fn test_min_treats_zero_as_unset() {
        let events = amounts(&[("1", "-5"), ("1", "3")]);
        let result = group_by(&events, &Min::new("amount", "min"), &["id"]);
        assert_eq!(projected(&result, "1", "min"), "-5");

        // A genuine 0 is replaced by whatever follows it
        let events = amounts(&[("1", "0"), ("1", "7")]);
        let result = group_by(&events, &Min::new("amount", "min"), &["id"]);
        assert_eq!(projected(&result, "1", "min"), "7");
    }

    #[test]
    fn test_aggregation_set() {
        let set = AggregationSet::new()
            .with(Count::new("count"))
            .with(Sum::new("amount", "total_amount"));
        assert_eq!(set.len(), 2);

        let result = group_by(&orders(), &set, &["id"]);
        assert_eq!(projected(&result, "12", "count"), "3");
        assert_eq!(projected(&result, "12", "total_amount"), "345");
        assert_eq!(projected(&result, "16", "count"), "1");
    }

    #[test]
    fn test_aggregation_set_order_matters() {
        let mut set = AggregationSet::new();
        set.add(Count::new("out"));
        set.add(Sum::new("amount", "out"));
        let result = group_by(&orders(), &set, &["id"]);
        assert_eq!(projected(&result, "12", "out"), "345");
    }

    #[test]
    fn test_closure_aggregator_in_set() {
        let set = AggregationSet::new()
            .with(Count::new("count"))
            .with(|mut e: Event, _history: &[&Event]| {
                let label = format!("{} orders", e.get("count").unwrap_or("0"));
                e.set("label", label);
                e
            });
        let result = group_by(&orders(), &set, &["id"]);
        assert_eq!(projected(&result, "15", "label"), "2 orders");
    }
}
