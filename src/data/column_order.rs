//! Deterministic column ordering
//!
//! Pinned column ids come first in pinned order, every other column follows
//! in fetch order. Pins that no longer match a column are skipped.

use crate::data::model::Column;
use std::collections::{HashMap, HashSet};

/// Merge `pinned` ids with the fetched columns.
///
/// Pure and idempotent: ordering an already ordered list with the same pins
/// returns the same list.
pub fn order_columns(all_columns: &[Column], pinned: &[String]) -> Vec<Column> {
    let mut by_id: HashMap<&str, &Column> = HashMap::with_capacity(all_columns.len());
    for column in all_columns {
        by_id.entry(column.id.as_str()).or_insert(column);
    }

    let mut placed: HashSet<&str> = HashSet::with_capacity(pinned.len());
    let mut ordered = Vec::with_capacity(all_columns.len());

    for id in pinned {
        if placed.contains(id.as_str()) {
            continue;
        }
        if let Some(column) = by_id.get(id.as_str()) {
            placed.insert(column.id.as_str());
            ordered.push((*column).clone());
        }
    }

    for column in all_columns {
        if !placed.contains(column.id.as_str()) {
            ordered.push(column.clone());
        }
    }

    ordered
}

/// Pinned column ids per table id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPins {
    pins: HashMap<String, Vec<String>>,
}

impl ColumnPins {
    pub fn new(pins: HashMap<String, Vec<String>>) -> Self {
        Self { pins }
    }

    pub fn for_table(&self, table_id: &str) -> &[String] {
        self.pins.get(table_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, table_id: impl Into<String>, column_ids: Vec<String>) {
        self.pins.insert(table_id.into(), column_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(id: &str) -> Column {
        Column {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    fn ids(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.id.as_str()).collect()
    }

    fn pins(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pinned_first_then_fetch_order() {
        let all = vec![col("d"), col("a"), col("c"), col("b")];
        let ordered = order_columns(&all, &pins(&["b", "a"]));
        assert_eq!(ids(&ordered), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_missing_pins_skipped() {
        let all = vec![col("a"), col("b")];
        let ordered = order_columns(&all, &pins(&["gone", "b", "also-gone"]));
        assert_eq!(ids(&ordered), vec!["b", "a"]);
    }

    #[test]
    fn test_no_pins_keeps_fetch_order() {
        let all = vec![col("z"), col("y"), col("x")];
        assert_eq!(order_columns(&all, &[]), all);
    }

    #[test]
    fn test_idempotent() {
        let all = vec![col("e"), col("c"), col("a"), col("d"), col("b")];
        let pinned = pins(&["d", "missing", "a"]);
        let once = order_columns(&all, &pinned);
        let twice = order_columns(&once, &pinned);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unpinned_columns_appear_exactly_once_after_pins() {
        let all = vec![col("a"), col("b"), col("c"), col("d")];
        let pinned = pins(&["c", "a", "c"]);
        let ordered = order_columns(&all, &pinned);

        assert_eq!(ordered.len(), all.len());
        for unpinned in ["b", "d"] {
            let positions: Vec<usize> = ordered
                .iter()
                .enumerate()
                .filter(|(_, c)| c.id == unpinned)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(positions.len(), 1);
            assert!(positions[0] >= 2);
        }
    }

    #[test]
    fn test_column_pins_lookup() {
        let mut pins = ColumnPins::default();
        assert!(pins.for_table("grid-1").is_empty());
        pins.set("grid-1", vec!["c-1".into()]);
        assert_eq!(pins.for_table("grid-1"), &["c-1".to_string()]);
    }
}
