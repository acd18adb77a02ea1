//! Integration tests for group-by aggregation over stored events
//!
//! These tests fill an in-memory table the way an e-commerce front end would,
//! read one contact's row back through the repository and aggregate it:
//! - Counting by device and event type
//! - Summing and averaging purchase amounts
//! - Latest event per group
//! - Chained aggregators

use std::collections::HashMap;
use std::sync::Arc;

use wide_column_events::aggregation::{
    get_latest_by, group_by, AggregationSet, Average, Count, Max, Min, Sum,
};
use wide_column_events::mapping::{Mapper, Mapping};
use wide_column_events::repository::{Adapter, MemoryAdapter, Repository, RepositoryConfig};
use wide_column_events::types::{Event, Mutation, Timestamp};

const MAPPING: &str = include_str!("../testdata/ecommerce_mapping.json");

// ============================================================================
// Helper Functions
// ============================================================================

/// One contact's browsing history: every 20th event starting at 3 is a
/// purchase of 30, events 1 and 2 of each cycle add to cart, the rest are
/// page views. Odd events come from a computer, even ones from a smartphone.
fn contact_mutations(num_events: i64) -> Mutation {
    let mut mutation = Mutation::new();
    for i in 0..num_events {
        let cycle = i % 20;
        let t = Timestamp::from_millis(1_600_000_000_000 - i * 60_000);
        mutation.set("front", "u", t, format!("https://www.example.com/products/{}", cycle));
        match cycle {
            1 | 2 => mutation.set("front", "2", t, "1"),
            3 => {
                mutation.set("front", "3", t, "1");
                mutation.set("front", "a", t, "30");
            },
            _ => mutation.set("front", "1", t, "1"),
        }
        mutation.set("front", "d", t, format!("{}", 1 + i % 2));
    }
    mutation
}

async fn filled_repository() -> Repository {
    let adapter = MemoryAdapter::new();
    let keys: Vec<String> = (1..=10).map(|i| format!("contact-{}", i)).collect();
    let mutations: Vec<Mutation> = keys.iter().map(|_| contact_mutations(100)).collect();
    let errors = adapter
        .apply_bulk(&keys, &mutations)
        .await
        .expect("Failed to fill table");
    assert!(errors.iter().all(Option::is_none));

    let mapping = Mapping::from_slice(MAPPING.as_bytes()).expect("Failed to load mapping");
    Repository::new(adapter, Arc::new(Mapper::new(mapping)), RepositoryConfig::default())
}

async fn contact_events() -> Vec<Event> {
    let set = filled_repository()
        .await
        .read("contact-3")
        .await
        .expect("Failed to read row");
    set.family("front").to_vec()
}

fn projection(result: &HashMap<String, Event>, key: &str, column: &str) -> Option<String> {
    result.get(key).and_then(|e| e.get(column)).map(str::to_string)
}

// ============================================================================
// Counting
// ============================================================================

#[tokio::test]
async fn test_count_by_device_and_event_type() {
    let events = contact_events().await;
    assert_eq!(events.len(), 100);

    let result = group_by(&events, &Count::new("count"), &["device_type", "event_type"]);
    assert_eq!(projection(&result, "Computerpurchase", "count").as_deref(), Some("5"));
    assert_eq!(projection(&result, "Computeradd_to_cart", "count").as_deref(), Some("5"));
    assert_eq!(projection(&result, "Smartphoneadd_to_cart", "count").as_deref(), Some("5"));
    assert_eq!(projection(&result, "Computerpage_view", "count").as_deref(), Some("40"));
    assert_eq!(projection(&result, "Smartphonepage_view", "count").as_deref(), Some("45"));
    assert!(!result.contains_key("Smartphonepurchase"));
}

#[tokio::test]
async fn test_count_by_event_type() {
    let events = contact_events().await;
    let result = group_by(&events, &Count::new("count"), &["event_type"]);
    assert_eq!(result.len(), 3);
    assert_eq!(projection(&result, "page_view", "count").as_deref(), Some("85"));
    assert_eq!(projection(&result, "add_to_cart", "count").as_deref(), Some("10"));
    assert_eq!(projection(&result, "purchase", "count").as_deref(), Some("5"));
}

// ============================================================================
// Numeric Aggregation
// ============================================================================

#[tokio::test]
async fn test_purchase_totals() {
    let events = contact_events().await;
    let set = AggregationSet::new()
        .with(Count::new("count"))
        .with(Sum::new("amount", "total"))
        .with(Average::new("amount", "average"))
        .with(Min::new("amount", "min"))
        .with(Max::new("amount", "max"));

    let result = group_by(&events, &set, &["device_type", "event_type"]);
    assert_eq!(projection(&result, "Computerpurchase", "count").as_deref(), Some("5"));
    assert_eq!(projection(&result, "Computerpurchase", "total").as_deref(), Some("150"));
    assert_eq!(projection(&result, "Computerpurchase", "average").as_deref(), Some("30"));
    assert_eq!(projection(&result, "Computerpurchase", "min").as_deref(), Some("30"));
    assert_eq!(projection(&result, "Computerpurchase", "max").as_deref(), Some("30"));

    // Page views carry no amount
    assert_eq!(projection(&result, "Computerpage_view", "total").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_representative_is_last_event_of_group() {
    let events = contact_events().await;
    let result = group_by(&events, &Count::new("count"), &["event_type"]);

    // Events come back oldest first, so the last purchase is the newest one (i = 3)
    let purchase = &result["purchase"];
    assert_eq!(purchase.date, Timestamp::from_millis(1_600_000_000_000 - 3 * 60_000));
    assert_eq!(purchase.get("url"), Some("https://www.example.com/products/3"));
    assert_eq!(purchase.row_key, "contact-3");
}

// ============================================================================
// Latest By
// ============================================================================

#[tokio::test]
async fn test_latest_by_event_type() {
    let events = contact_events().await;
    let latest = get_latest_by(&events, &["event_type"]);

    assert_eq!(latest.len(), 3);
    assert_eq!(
        latest["page_view"].date,
        Timestamp::from_millis(1_600_000_000_000)
    );
    assert_eq!(
        latest["add_to_cart"].date,
        Timestamp::from_millis(1_600_000_000_000 - 60_000)
    );
    assert!(latest["purchase"].get("count").is_none());
}

#[tokio::test]
async fn test_regrouping_aggregated_events() {
    let events = contact_events().await;
    let by_pair = group_by(&events, &Count::new("count"), &["device_type", "event_type"]);

    // Sum the per-pair counts back up per device
    let pairs: Vec<Event> = by_pair.into_values().collect();
    let by_device = group_by(&pairs, &Sum::new("count", "events"), &["device_type"]);
    assert_eq!(projection(&by_device, "Computer", "events").as_deref(), Some("50"));
    assert_eq!(projection(&by_device, "Smartphone", "events").as_deref(), Some("50"));
}
