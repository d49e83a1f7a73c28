//! Memory Store retrieval: keyword overlap with importance weighting
//! (spec.md §4.4).
//!
//! `score = 0.5 · |Q ∩ C| + 0.5 · importance`, top-k with positive score,
//! sorted descending; ties keep insertion order (a stable sort over the
//! entries in their stored order satisfies this).

use std::collections::HashSet;

use arena_types::MemoryEntry;

pub(crate) fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Score a single entry against a pre-tokenized query.
fn score(entry: &MemoryEntry, query_terms: &HashSet<String>) -> f32 {
    let content_terms = tokenize(&entry.content);
    let overlap = query_terms.intersection(&content_terms).count() as f32;
    0.5 * overlap + 0.5 * entry.importance.clamp(0.0, 1.0)
}

/// Returns up to `k` entries with positive score, sorted by score descending.
/// `entries` must be in insertion order for the tie-break to hold.
pub fn search<'a>(entries: &'a [MemoryEntry], query: &str, k: usize) -> Vec<(&'a MemoryEntry, f32)> {
    let query_terms = tokenize(query);

    let mut scored: Vec<(usize, &MemoryEntry, f32)> = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| (idx, entry, score(entry, &query_terms)))
        .filter(|(_, _, s)| *s > 0.0)
        .collect();

    // Stable sort by score descending; equal scores keep insertion order
    // because `idx` only participates when scores tie (sort_by is stable).
    scored.sort_by(|(ia, _, sa), (ib, _, sb)| sb.total_cmp(sa).then(ia.cmp(ib)));

    scored.into_iter().take(k).map(|(_, entry, s)| (entry, s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::MemoryKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(content: &str, importance: f32) -> MemoryEntry {
        MemoryEntry {
            entry_id: Uuid::new_v4(),
            session_id: "g1".to_string(),
            content: content.to_string(),
            kind: MemoryKind::Decision,
            importance,
            created_at: Utc::now(),
            source_message_id: None,
        }
    }

    #[test]
    fn returns_at_most_k_sorted_descending_with_positive_score() {
        let entries = vec![
            entry("use a b-tree for the index", 0.9),
            entry("switch to a hash map", 0.2),
            entry("totally unrelated fact about cats", 0.1),
        ];
        let hits = search(&entries, "b-tree index", 2);
        assert!(hits.len() <= 2);
        assert!(hits.iter().all(|(_, s)| *s > 0.0));
        assert!(hits.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let entries = vec![entry("alpha beta", 0.5), entry("alpha beta", 0.5)];
        let hits = search(&entries, "alpha beta", 5);
        assert_eq!(hits[0].0.entry_id, entries[0].entry_id);
        assert_eq!(hits[1].0.entry_id, entries[1].entry_id);
    }

    #[test]
    fn zero_overlap_and_zero_importance_is_excluded() {
        let entries = vec![entry("completely different topic", 0.0)];
        let hits = search(&entries, "unrelated query terms", 5);
        assert!(hits.is_empty());
    }
}
