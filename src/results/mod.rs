//! Live result-set state and result ordering
//!
//! Owns the result algebra the pipeline applies after retrieval: the
//! identity-keyed merge of remote and local candidates, and the two stable
//! ranking passes. Both comparators are deliberately partial orders, so the
//! sorts must be stable to leave unmatched candidates in their prior
//! relative order.

use crate::normalize::{display_string, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Live query state for one query lifecycle.
///
/// Replaced wholesale on each query submission; `items` may exceed `limit`
/// after a merge, renderers truncate via [`ResultSet::visible`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    /// Current normalized query
    pub query: String,
    /// Ranked candidate records
    pub items: Vec<Record>,
    /// True number of distinct matches found
    pub count: usize,
    /// Display cap for renderers, distinct from `count`
    pub limit: usize,
    /// Auto-selected candidate, if enabled
    pub selected: Option<Record>,
    /// Set once the query is known to have no matches and no remote answer
    /// can still arrive
    pub no_matches: bool,
}

impl ResultSet {
    /// Create an empty result set with the given display limit
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Reset to the cleared state, keeping the configured limit
    pub fn clear(&mut self) {
        self.query.clear();
        self.items.clear();
        self.count = 0;
        self.selected = None;
        self.no_matches = false;
    }

    /// Records a renderer should draw, capped at `limit`
    pub fn visible(&self) -> &[Record] {
        &self.items[..self.items.len().min(self.limit)]
    }
}

/// Merge remote and local candidates into one deduplicated list.
///
/// Remote entries are written first and keep their positions; a local entry
/// with the same identity overwrites the remote content in place (local data
/// is authoritative once re-indexed). Local-only entries follow.
pub fn merge_by_identity<F>(remote: &[Record], local: &[Record], identity: F) -> Vec<Record>
where
    F: Fn(&Record) -> String,
{
    let mut merged: Vec<Record> = Vec::with_capacity(remote.len() + local.len());
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for record in remote.iter().chain(local.iter()) {
        let key = identity(record);
        match index_of.get(&key) {
            Some(&at) => merged[at] = record.clone(),
            None => {
                index_of.insert(key, merged.len());
                merged.push(record.clone());
            }
        }
    }

    merged
}

/// Stage 1 ranking: candidates whose identifier value starts with the query
/// (case-insensitively) move ahead of those that do not; among those that
/// start with it, shorter identifier values sort first. Everything else is
/// left in its prior relative order.
pub fn sort_by_starting_letter(items: &mut [Record], query: &str, identifier: &str) {
    let query = query.to_lowercase();
    items.sort_by(|a, b| {
        let a_value = display_string(a, identifier);
        let b_value = display_string(b, identifier);
        let a_starts = a_value.to_lowercase().starts_with(&query);
        let b_starts = b_value.to_lowercase().starts_with(&query);

        match (a_starts, b_starts) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => a_value.len().cmp(&b_value.len()),
            (false, false) => Ordering::Equal,
        }
    });
}

/// Stage 2 ranking: candidates lacking a group value sort first, then
/// ascending lexicographic group value; within a group the stage 1 order is
/// retained.
pub fn sort_by_group(items: &mut [Record], group_field: &str) {
    items.sort_by(|a, b| {
        match (group_value(a, group_field), group_value(b, group_field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(&y),
        }
    });
}

/// Group value of a record; empty strings and nulls count as ungrouped
fn group_value(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::{json, Value};

    fn identity(record: &Record) -> String {
        display_string(record, "label")
    }

    fn records(items: &[Value]) -> Vec<Record> {
        normalize(items, "label").unwrap()
    }

    fn labels(items: &[Record]) -> Vec<String> {
        items.iter().map(identity).collect()
    }

    #[test]
    fn test_merge_local_wins_on_collision() {
        let local = records(&[json!({"label": "Apple", "origin": "local"})]);
        let remote = records(&[
            json!({"label": "Apple", "origin": "remote"}),
            json!({"label": "Apricot", "origin": "remote"}),
        ]);

        let merged = merge_by_identity(&remote, &local, identity);
        assert_eq!(merged.len(), 2);
        // remote position retained, local content kept
        assert_eq!(merged[0]["label"], "Apple");
        assert_eq!(merged[0]["origin"], "local");
        assert_eq!(merged[1]["label"], "Apricot");
    }

    #[test]
    fn test_merge_appends_local_only_entries() {
        let remote = records(&[json!("Apricot")]);
        let local = records(&[json!("Apple"), json!("Banana")]);

        let merged = merge_by_identity(&remote, &local, identity);
        assert_eq!(labels(&merged), vec!["Apricot", "Apple", "Banana"]);
    }

    #[test]
    fn test_starting_letter_priority() {
        let mut items = records(&[json!("Pineapple"), json!("Apricot"), json!("Apple")]);
        sort_by_starting_letter(&mut items, "ap", "label");
        // both prefix matches move ahead, shorter identifier first
        assert_eq!(labels(&items), vec!["Apple", "Apricot", "Pineapple"]);
    }

    #[test]
    fn test_unmatched_candidates_keep_relative_order() {
        let mut items = records(&[json!("Cherry"), json!("Banana"), json!("Damson")]);
        sort_by_starting_letter(&mut items, "zz", "label");
        assert_eq!(labels(&items), vec!["Cherry", "Banana", "Damson"]);
    }

    #[test]
    fn test_equal_length_prefix_matches_stay_stable() {
        let mut items = records(&[json!("apfel"), json!("apric"), json!("apace")]);
        sort_by_starting_letter(&mut items, "ap", "label");
        assert_eq!(labels(&items), vec!["apfel", "apric", "apace"]);
    }

    #[test]
    fn test_group_ordering() {
        let mut items = records(&[
            json!({"label": "Leek", "group": "Vegetable"}),
            json!({"label": "Apple", "group": "Fruit"}),
            json!({"label": "Salt"}),
        ]);
        sort_by_group(&mut items, "group");
        assert_eq!(labels(&items), vec!["Salt", "Apple", "Leek"]);
    }

    #[test]
    fn test_group_ordering_is_stable_within_groups() {
        let mut items = records(&[
            json!({"label": "Cherry", "group": "Fruit"}),
            json!({"label": "Apple", "group": "Fruit"}),
        ]);
        sort_by_group(&mut items, "group");
        assert_eq!(labels(&items), vec!["Cherry", "Apple"]);
    }

    #[test]
    fn test_empty_group_counts_as_ungrouped() {
        let mut items = records(&[
            json!({"label": "Leek", "group": "Vegetable"}),
            json!({"label": "Salt", "group": ""}),
        ]);
        sort_by_group(&mut items, "group");
        assert_eq!(labels(&items), vec!["Salt", "Leek"]);
    }

    #[test]
    fn test_visible_caps_at_limit() {
        let mut set = ResultSet::new(2);
        set.items = records(&[json!("Apple"), json!("Apricot"), json!("Aprium")]);
        set.count = 3;
        assert_eq!(set.visible().len(), 2);
    }

    #[test]
    fn test_clear_keeps_limit() {
        let mut set = ResultSet::new(7);
        set.query = "ap".to_string();
        set.items = records(&[json!("Apple")]);
        set.count = 1;
        set.no_matches = true;
        set.clear();

        assert!(set.query.is_empty());
        assert!(set.items.is_empty());
        assert_eq!(set.count, 0);
        assert!(!set.no_matches);
        assert_eq!(set.limit, 7);
    }
}
