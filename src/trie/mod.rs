//! Prefix index backed by a character trie
//!
//! Nodes live in an index arena (`Vec<TrieNode>` with child maps holding
//! arena indices), so the tree stays free of shared-ownership cycles and is
//! trivially inspectable in tests. Records terminate at the node matching
//! the last character of each of their tokens, keyed by identity so that
//! re-insertion replaces instead of duplicating.

use crate::normalize::{fold, Record};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct TrieNode {
    /// Normalized character to arena index of the child node
    children: HashMap<char, usize>,
    /// Records whose token ends at this node, keyed by identity
    terminals: HashMap<String, Record>,
}

/// Character trie with idempotent multi-key insertion and subtree retrieval
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    fold_diacritics: bool,
}

impl Trie {
    /// Create an empty index. `fold_diacritics` enables diacritic-insensitive
    /// matching for both inserted tokens and queries.
    pub fn new(fold_diacritics: bool) -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            fold_diacritics,
        }
    }

    /// Number of arena nodes including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Index `records` under every whitespace-delimited token of `field`.
    ///
    /// Records without the field are skipped. Inserting the same identity at
    /// the same terminal node overwrites the prior entry, so repeated calls
    /// with overlapping data never duplicate.
    pub fn add<F>(&mut self, records: &[Record], field: &str, identity: F)
    where
        F: Fn(&Record) -> String,
    {
        for record in records {
            let Some(value) = record.get(field) else {
                continue;
            };
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            for token in text.split_whitespace() {
                let folded = fold(token, self.fold_diacritics);
                let node = self.walk_or_create(&folded);
                self.nodes[node]
                    .terminals
                    .insert(identity(record), record.clone());
            }
        }
    }

    /// Retrieve every record stored at or below the node reached by `query`.
    ///
    /// Returns candidates deduplicated by identity, capped at `limit`, and
    /// the uncapped count of distinct identities in the subtree. Candidate
    /// order follows the traversal and is unspecified; callers rank. A query
    /// that walks off the tree yields an empty list and zero count, with no
    /// partial fallback.
    pub fn search(&self, query: &str, limit: usize) -> (Vec<Record>, usize) {
        let folded = fold(query, self.fold_diacritics);
        let mut current = ROOT;
        for ch in folded.chars() {
            match self.nodes[current].children.get(&ch) {
                Some(&child) => current = child,
                None => return (Vec::new(), 0),
            }
        }

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![current];
        while let Some(node) = stack.pop() {
            for (identity, record) in &self.nodes[node].terminals {
                if seen.insert(identity.clone()) && candidates.len() < limit {
                    candidates.push(record.clone());
                }
            }
            stack.extend(self.nodes[node].children.values().copied());
        }

        (candidates, seen.len())
    }

    fn walk_or_create(&mut self, token: &str) -> usize {
        let mut current = ROOT;
        for ch in token.chars() {
            current = match self.nodes[current].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children.insert(ch, child);
                    child
                }
            };
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{display_string, normalize};
    use serde_json::json;

    fn identity(record: &Record) -> String {
        display_string(record, "label")
    }

    fn fruit_trie() -> Trie {
        let records = normalize(
            &[json!("Apple"), json!("Apricot"), json!("Banana")],
            "label",
        )
        .unwrap();
        let mut trie = Trie::new(false);
        trie.add(&records, "label", identity);
        trie
    }

    #[test]
    fn test_prefix_search() {
        let trie = fruit_trie();
        let (candidates, count) = trie.search("ap", 5);
        assert_eq!(count, 2);
        let labels: Vec<String> = candidates.iter().map(identity).collect();
        assert!(labels.contains(&"Apple".to_string()));
        assert!(labels.contains(&"Apricot".to_string()));
        assert!(!labels.contains(&"Banana".to_string()));
    }

    #[test]
    fn test_no_match_has_no_fallback() {
        let trie = fruit_trie();
        let (candidates, count) = trie.search("apx", 5);
        assert!(candidates.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn test_every_prefix_matches() {
        let trie = fruit_trie();
        for prefix in ["a", "ap", "apr", "apri", "apric", "aprico", "apricot"] {
            let (candidates, _) = trie.search(prefix, 5);
            let labels: Vec<String> = candidates.iter().map(identity).collect();
            assert!(labels.contains(&"Apricot".to_string()), "prefix {prefix}");
        }
    }

    #[test]
    fn test_case_insensitive() {
        let trie = fruit_trie();
        let (candidates, count) = trie.search("APP", 5);
        assert_eq!(count, 1);
        assert_eq!(identity(&candidates[0]), "Apple");
    }

    #[test]
    fn test_idempotent_add() {
        let records = normalize(&[json!("Apple"), json!("Apricot")], "label").unwrap();
        let mut trie = Trie::new(false);
        trie.add(&records, "label", identity);
        let nodes_before = trie.node_count();
        trie.add(&records, "label", identity);

        assert_eq!(trie.node_count(), nodes_before);
        let (candidates, count) = trie.search("ap", 10);
        assert_eq!(count, 2);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_reinsertion_replaces_by_identity() {
        let old = normalize(&[json!({"label": "Apple", "rank": 1})], "label").unwrap();
        let new = normalize(&[json!({"label": "Apple", "rank": 2})], "label").unwrap();
        let mut trie = Trie::new(false);
        trie.add(&old, "label", identity);
        trie.add(&new, "label", identity);

        let (candidates, count) = trie.search("apple", 5);
        assert_eq!(count, 1);
        assert_eq!(candidates[0]["rank"], 2);
    }

    #[test]
    fn test_multi_token_reachability_dedups() {
        let records = normalize(&[json!({"label": "Granny Smith"})], "label").unwrap();
        let mut trie = Trie::new(false);
        trie.add(&records, "label", identity);

        // reachable via both tokens, reported once each
        let (granny, count) = trie.search("gra", 5);
        assert_eq!(count, 1);
        assert_eq!(granny.len(), 1);
        let (smith, count) = trie.search("smi", 5);
        assert_eq!(count, 1);
        assert_eq!(smith.len(), 1);

        // shared prefix of both tokens still yields the record once
        let records = normalize(&[json!({"label": "Sour Smith"})], "label").unwrap();
        trie.add(&records, "label", identity);
        let (s_matches, count) = trie.search("s", 5);
        assert_eq!(count, 2);
        assert_eq!(s_matches.len(), 2);
    }

    #[test]
    fn test_extra_field_tokens() {
        let records = normalize(
            &[json!({"label": "Apple", "keywords": "fruit pomme"})],
            "label",
        )
        .unwrap();
        let mut trie = Trie::new(false);
        trie.add(&records, "label", identity);
        trie.add(&records, "keywords", identity);

        let (candidates, count) = trie.search("pom", 5);
        assert_eq!(count, 1);
        assert_eq!(identity(&candidates[0]), "Apple");
    }

    #[test]
    fn test_missing_field_skipped() {
        let records = normalize(
            &[json!({"label": "Apple", "alias": "pomme"}), json!({"label": "Banana"})],
            "label",
        )
        .unwrap();
        let mut trie = Trie::new(false);
        trie.add(&records, "alias", identity);

        let (_, apple) = trie.search("pomme", 5);
        assert_eq!(apple, 1);
        let (_, banana) = trie.search("banana", 5);
        assert_eq!(banana, 0);
    }

    #[test]
    fn test_diacritic_insensitive() {
        let records = normalize(&[json!("crème brûlée")], "label").unwrap();
        let mut trie = Trie::new(true);
        trie.add(&records, "label", identity);

        let (candidates, count) = trie.search("creme", 5);
        assert_eq!(count, 1);
        assert_eq!(identity(&candidates[0]), "crème brûlée");
        let (candidates, _) = trie.search("brû", 5);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_count_independent_of_limit() {
        let records = normalize(
            &[json!("Apple"), json!("Apricot"), json!("Aprium"), json!("April")],
            "label",
        )
        .unwrap();
        let mut trie = Trie::new(false);
        trie.add(&records, "label", identity);

        let (candidates, count) = trie.search("ap", 2);
        assert_eq!(candidates.len(), 2);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_empty_query_returns_whole_index() {
        let trie = fruit_trie();
        let (candidates, count) = trie.search("", 10);
        assert_eq!(count, 3);
        assert_eq!(candidates.len(), 3);
    }
}
