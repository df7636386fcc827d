use crate::services::embedder::cosine_similarity;
use policyhub_models::{sort_by_score_desc, RetrievalResult, Vertical};
use std::collections::{BTreeMap, HashMap};

/// Merge per-vertical result lists into one ranked pool.
///
/// Scores are multiplied by the vertical weight, deduplicated by chunk id
/// keeping the max-scored occurrence, then max-normalized so downstream
/// boost thresholds see a 0..1 spread regardless of how many verticals
/// split the weight. Ordering depends only on weighted score and dedupe,
/// never on task completion order.
pub fn aggregate(
    per_vertical: Vec<(Vertical, Vec<RetrievalResult>)>,
    weights: &BTreeMap<Vertical, f32>,
) -> Vec<RetrievalResult> {
    let mut best: HashMap<String, RetrievalResult> = HashMap::new();

    for (vertical, results) in per_vertical {
        let weight = weights.get(&vertical).copied().unwrap_or(1.0);
        for mut result in results {
            result.score *= weight;
            match best.get(&result.chunk_id) {
                Some(existing) if existing.score >= result.score => {}
                _ => {
                    best.insert(result.chunk_id.clone(), result);
                }
            }
        }
    }

    let mut merged: Vec<RetrievalResult> = best.into_values().collect();

    let max = merged.iter().map(|r| r.score).fold(0.0_f32, f32::max);
    if max > 0.0 {
        for result in merged.iter_mut() {
            result.score /= max;
        }
    }

    sort_by_score_desc(&mut merged);
    merged
}

/// Maximal Marginal Relevance selection over dense vectors: greedily pick
/// the candidate maximizing `lambda * score - (1 - lambda) * max_sim` to
/// the already-selected set. Candidates without vectors contribute zero
/// similarity and compete on relevance alone.
pub fn mmr_select(
    mut candidates: Vec<RetrievalResult>,
    lambda: f32,
    top_k: usize,
) -> Vec<RetrievalResult> {
    if candidates.len() <= 1 || top_k == 0 {
        candidates.truncate(top_k);
        return candidates;
    }

    let mut selected: Vec<RetrievalResult> = Vec::with_capacity(top_k.min(candidates.len()));

    while selected.len() < top_k && !candidates.is_empty() {
        let mut best_index = 0;
        let mut best_value = f32::NEG_INFINITY;

        for (index, candidate) in candidates.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|chosen| match (&candidate.vector, &chosen.vector) {
                    (Some(a), Some(b)) => cosine_similarity(a, b),
                    _ => 0.0,
                })
                .fold(0.0_f32, f32::max);
            let value = lambda * candidate.score - (1.0 - lambda) * max_sim;
            if value > best_value {
                best_value = value;
                best_index = index;
            }
        }

        selected.push(candidates.swap_remove(best_index));
    }

    selected
}

/// Count of final results per vertical, for the response envelope.
pub fn vertical_coverage(results: &[RetrievalResult]) -> BTreeMap<String, usize> {
    let mut coverage = BTreeMap::new();
    for result in results {
        *coverage.entry(result.vertical.as_str().to_string()).or_insert(0) += 1;
    }
    coverage
}
