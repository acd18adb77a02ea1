//! Translation rules
//!
//! Each direction is an ordered chain of rules; the first rule that resolves
//! a `(column, value)` pair wins. The chains are fixed when a mapper is built.

use super::cache::{CacheEntry, ReverseCache};
use super::Mapping;

/// Value written for a `reversed` column: its presence carries the meaning
pub const REVERSED_CELL_VALUE: &str = "1";

/// Read-path rules: wire `(column, value)` -> readable `(column, value)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekRule {
    /// Rename the column, keep the value
    Raw,
    /// Rename the column and translate the value when it is an enum member
    Mapped,
    /// Answer from a previous `Reversed` resolution
    ReverseCache,
    /// Treat the column as an enum code of a `reversed` table
    Reversed,
}

impl SeekRule {
    /// Default evaluation order
    pub const CHAIN: [SeekRule; 4] = [
        SeekRule::Raw,
        SeekRule::Mapped,
        SeekRule::ReverseCache,
        SeekRule::Reversed,
    ];

    /// Try to resolve a wire column and value
    pub fn try_resolve(
        &self,
        mapping: &Mapping,
        cache: &ReverseCache,
        column: &str,
        value: &str,
    ) -> Option<(String, String)> {
        match self {
            SeekRule::Raw => mapping
                .raws
                .get(column)
                .map(|name| (name.clone(), value.to_string())),
            SeekRule::Mapped => mapping.mapped.get(column).map(|rule| {
                let mapped = rule
                    .values
                    .get(value)
                    .cloned()
                    .unwrap_or_else(|| value.to_string());
                (rule.name.clone(), mapped)
            }),
            SeekRule::ReverseCache => cache
                .get(column)
                .map(|entry| (entry.column, entry.value)),
            SeekRule::Reversed => {
                for rule in &mapping.reversed {
                    if let Some(readable) = rule.values.get(column) {
                        let stored = cache.insert(
                            column,
                            CacheEntry {
                                column: rule.name.clone(),
                                value: readable.clone(),
                            },
                        );
                        return Some((stored.column, stored.value));
                    }
                }
                None
            },
        }
    }
}

/// Write-path rules: readable `(column, value)` -> wire `(column, value)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnseekRule {
    /// Find the short column of a renamed column, keep the value
    Raw,
    /// Find the short column and the short value of an enum member
    Mapped,
    /// Find the short column encoding an enum member, value is a marker
    Reversed,
}

impl UnseekRule {
    /// Default evaluation order
    pub const CHAIN: [UnseekRule; 3] = [UnseekRule::Raw, UnseekRule::Mapped, UnseekRule::Reversed];

    /// Try to resolve a readable column and value
    pub fn try_resolve(&self, mapping: &Mapping, column: &str, value: &str) -> Option<(String, String)> {
        match self {
            UnseekRule::Raw => mapping
                .raws
                .iter()
                .find(|(_, name)| name.as_str() == column)
                .map(|(short, _)| (short.clone(), value.to_string())),
            UnseekRule::Mapped => mapping
                .mapped
                .iter()
                .filter(|(_, rule)| rule.name == column)
                .find_map(|(short, rule)| {
                    find_short_value(&rule.values, value)
                        .map(|short_value| (short.clone(), short_value.to_string()))
                }),
            UnseekRule::Reversed => mapping
                .reversed
                .iter()
                .filter(|rule| rule.name == column)
                .find_map(|rule| find_short_value(&rule.values, value))
                .map(|short| (short.to_string(), REVERSED_CELL_VALUE.to_string())),
        }
    }
}

fn find_short_value<'a>(
    values: &'a std::collections::BTreeMap<String, String>,
    readable: &str,
) -> Option<&'a str> {
    values
        .iter()
        .find(|(_, v)| v.as_str() == readable)
        .map(|(short, _)| short.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tests::ECOMMERCE_MAPPING;

    fn mapping() -> Mapping {
        Mapping::from_slice(ECOMMERCE_MAPPING.as_bytes()).unwrap()
    }

    fn pair(c: &str, v: &str) -> Option<(String, String)> {
        Some((c.to_string(), v.to_string()))
    }

    #[test]
    fn test_raw_rule() {
        let m = mapping();
        let cache = ReverseCache::new();
        assert_eq!(SeekRule::Raw.try_resolve(&m, &cache, "u", "x"), pair("url", "x"));
        assert_eq!(SeekRule::Raw.try_resolve(&m, &cache, "d", "1"), None);
        assert_eq!(UnseekRule::Raw.try_resolve(&m, "url", "x"), pair("u", "x"));
        assert_eq!(UnseekRule::Raw.try_resolve(&m, "device_type", "x"), None);
    }

    #[test]
    fn test_mapped_rule_passes_unknown_values() {
        let m = mapping();
        let cache = ReverseCache::new();
        assert_eq!(
            SeekRule::Mapped.try_resolve(&m, &cache, "d", "2"),
            pair("device_type", "Computer")
        );
        assert_eq!(
            SeekRule::Mapped.try_resolve(&m, &cache, "d", "9"),
            pair("device_type", "9")
        );
        assert_eq!(
            UnseekRule::Mapped.try_resolve(&m, "device_type", "Computer"),
            pair("d", "2")
        );
        assert_eq!(UnseekRule::Mapped.try_resolve(&m, "device_type", "Tablet"), None);
    }

    #[test]
    fn test_reversed_rule_populates_cache() {
        let m = mapping();
        let cache = ReverseCache::new();
        assert_eq!(SeekRule::ReverseCache.try_resolve(&m, &cache, "3", ""), None);
        assert_eq!(
            SeekRule::Reversed.try_resolve(&m, &cache, "3", "1"),
            pair("event_type", "purchase")
        );
        assert_eq!(
            SeekRule::ReverseCache.try_resolve(&m, &cache, "3", "whatever"),
            pair("event_type", "purchase")
        );
        assert_eq!(SeekRule::Reversed.try_resolve(&m, &cache, "9", "1"), None);
    }

    #[test]
    fn test_reversed_unseek_emits_marker() {
        let m = mapping();
        assert_eq!(
            UnseekRule::Reversed.try_resolve(&m, "event_type", "add_to_cart"),
            pair("2", REVERSED_CELL_VALUE)
        );
        assert_eq!(UnseekRule::Reversed.try_resolve(&m, "event_type", "refund"), None);
    }
}
