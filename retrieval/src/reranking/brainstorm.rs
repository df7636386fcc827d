use crate::services::embedder::cosine_similarity;
use policyhub_models::{sort_by_score_desc, RetrievalResult};

/// Score multiplier for a chunk nearly identical to a higher-ranked one.
const DUPLICATE_PENALTY: f32 = 0.5;
/// Score multiplier for chunks referencing global or comparative material.
const GLOBAL_REWARD: f32 = 1.15;

/// Keywords signaling global or comparative perspectives, which Brainstorm
/// mode rewards.
const GLOBAL_KEYWORDS: &[&str] = &[
    "global",
    "international",
    "finland",
    "singapore",
    "south korea",
    "japan",
    "oecd",
    "unesco",
    "world bank",
    "best practice",
    "best practices",
    "comparative",
    "benchmarking",
    "innovation",
    "innovative",
];

/// Brainstorm reranking: reward global/comparative content and penalize
/// near-duplicates (cosine above `duplicate_threshold`) so the ideation
/// context stays diverse.
pub fn rerank(
    mut candidates: Vec<RetrievalResult>,
    duplicate_threshold: f32,
    top: usize,
) -> Vec<RetrievalResult> {
    for candidate in candidates.iter_mut() {
        let mut score = candidate.score;
        if has_global_keyword(&candidate.content) {
            score *= GLOBAL_REWARD;
        }
        candidate.rerank_score = Some(score);
    }
    sort_by_score_desc(&mut candidates);

    // Walk down the ranking and penalize anything too close to a chunk
    // that already survived un-penalized above it.
    for i in 0..candidates.len() {
        let is_duplicate = (0..i).any(|j| {
            candidates[j].rerank_score >= candidates[i].rerank_score
                && similarity(&candidates[i], &candidates[j]) > duplicate_threshold
        });
        if is_duplicate {
            let penalized = candidates[i].effective_score() * DUPLICATE_PENALTY;
            candidates[i].rerank_score = Some(penalized);
        }
    }

    sort_by_score_desc(&mut candidates);
    candidates.truncate(top);
    candidates
}

fn similarity(a: &RetrievalResult, b: &RetrievalResult) -> f32 {
    match (&a.vector, &b.vector) {
        (Some(va), Some(vb)) => cosine_similarity(va, vb),
        _ => 0.0,
    }
}

fn has_global_keyword(content: &str) -> bool {
    let lower = content.to_lowercase();
    GLOBAL_KEYWORDS.iter().any(|k| lower.contains(k))
}
