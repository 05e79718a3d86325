use std::{cmp::Ordering, collections::HashSet};

use common::storage::types::question_entry::IndexHit;

/// Orders hits by score, highest first. Equal scores fall back to the entry
/// id so results are stable across runs.
pub fn sort_by_score_desc(hits: &mut [IndexHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
}

/// Drops hits scoring below `threshold`, along with non-finite scores.
pub fn apply_threshold(hits: Vec<IndexHit>, threshold: Option<f32>) -> Vec<IndexHit> {
    hits.into_iter()
        .filter(|hit| hit.score.is_finite())
        .filter(|hit| threshold.is_none_or(|min| hit.score >= min))
        .collect()
}

/// Keeps the first hit seen for each chunk. Expects `hits` sorted by score.
pub fn best_per_chunk(hits: Vec<IndexHit>) -> Vec<IndexHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.chunk_key.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(entry_id: &str, chunk_key: &str, score: f32) -> IndexHit {
        IndexHit {
            entry_id: entry_id.to_string(),
            chunk_key: chunk_key.to_string(),
            question: format!("question {entry_id}"),
            score,
        }
    }

    #[test]
    fn sorting_is_descending_and_stable_on_ties() {
        let mut hits = vec![hit("b", "x", 0.5), hit("c", "y", 0.9), hit("a", "z", 0.5)];

        sort_by_score_desc(&mut hits);

        let ids: Vec<&str> = hits.iter().map(|h| h.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn threshold_drops_low_and_nan_scores() {
        let hits = vec![hit("a", "x", 0.8), hit("b", "y", 0.2), hit("c", "z", f32::NAN)];

        let kept = apply_threshold(hits.clone(), Some(0.5));
        assert_eq!(kept.len(), 1);

        let unfiltered = apply_threshold(hits, None);
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn best_per_chunk_keeps_highest_ranked_hit() {
        let hits = vec![
            hit("a", "sky", 0.95),
            hit("b", "sky", 0.90),
            hit("c", "grass", 0.40),
            hit("d", "grass", 0.30),
        ];

        let deduped = best_per_chunk(hits);

        let ids: Vec<&str> = deduped.iter().map(|h| h.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
