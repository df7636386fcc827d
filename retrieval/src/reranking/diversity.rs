use crate::query_processing::category_predictor::{count_word_occurrences, PolicyCategory};
use policyhub_models::{
    sort_by_score_desc, CategoryCoverage, CoverageReport, RetrievalResult,
};
use std::collections::{BTreeMap, HashSet};

const FIRST_IN_CATEGORY_BONUS: f32 = 0.3;
const SECOND_IN_CATEGORY_BONUS: f32 = 0.1;

/// Final list plus the coverage report surfaced in the trace.
pub struct DiversityOutcome {
    pub results: Vec<RetrievalResult>,
    pub report: CoverageReport,
}

/// Enforce category coverage over the reranked candidates.
///
/// First pass guarantees up to `min_per_category` of the highest-scored
/// candidates for every predicted category; the second pass fills the
/// remaining slots by combined relevance + diversity score. Returns the
/// selection sorted by final score.
pub fn enforce(
    candidates: Vec<RetrievalResult>,
    predicted: &[PolicyCategory],
    top_k: usize,
    min_per_category: usize,
    diversity_weight: f32,
) -> DiversityOutcome {
    if candidates.is_empty() || predicted.is_empty() {
        let mut results = candidates;
        results.truncate(top_k);
        let report = coverage_report(&results, predicted);
        return DiversityOutcome { results, report };
    }

    // Classify every candidate once; record matches on the result so the
    // envelope can show them.
    let mut classified: Vec<RetrievalResult> = candidates
        .into_iter()
        .map(|mut candidate| {
            candidate.matched_categories = categories_of(&candidate.content, predicted)
                .into_iter()
                .map(|c| c.as_str().to_string())
                .collect();
            candidate
        })
        .collect();
    sort_by_score_desc(&mut classified);

    let mut chosen_ids: HashSet<String> = HashSet::new();
    let mut selected: Vec<RetrievalResult> = Vec::new();

    // Mandatory coverage pass.
    for category in predicted {
        let name = category.as_str();
        let mut taken = 0;
        for candidate in classified.iter() {
            if taken >= min_per_category || selected.len() >= top_k {
                break;
            }
            if chosen_ids.contains(&candidate.chunk_id) {
                continue;
            }
            if candidate.matched_categories.iter().any(|c| c == name) {
                chosen_ids.insert(candidate.chunk_id.clone());
                selected.push(candidate.clone());
                taken += 1;
            }
        }
    }

    // Relevance + diversity fill pass.
    let mut remaining: Vec<RetrievalResult> = classified
        .into_iter()
        .filter(|c| !chosen_ids.contains(&c.chunk_id))
        .collect();

    while selected.len() < top_k && !remaining.is_empty() {
        let counts = category_counts(&selected);
        let (best_index, _) = remaining
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let bonus = diversity_bonus(candidate, &counts);
                let combined = (1.0 - diversity_weight) * candidate.effective_score()
                    + diversity_weight * bonus;
                (i, combined)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("remaining is non-empty");
        selected.push(remaining.swap_remove(best_index));
    }

    sort_by_score_desc(&mut selected);
    let report = coverage_report(&selected, predicted);
    DiversityOutcome {
        results: selected,
        report,
    }
}

/// Categories whose indicator keywords appear in the content.
pub fn categories_of(content: &str, predicted: &[PolicyCategory]) -> Vec<PolicyCategory> {
    let lower = content.to_lowercase();
    predicted
        .iter()
        .filter(|category| {
            category
                .indicator_keywords()
                .iter()
                .any(|kw| count_word_occurrences(&lower, kw) > 0)
        })
        .cloned()
        .collect()
}

fn category_counts(selected: &[RetrievalResult]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for result in selected {
        for category in &result.matched_categories {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
    }
    counts
}

fn diversity_bonus(candidate: &RetrievalResult, counts: &BTreeMap<String, usize>) -> f32 {
    let mut bonus = 0.0_f32;
    for category in &candidate.matched_categories {
        bonus += match counts.get(category).copied().unwrap_or(0) {
            0 => FIRST_IN_CATEGORY_BONUS,
            1 => SECOND_IN_CATEGORY_BONUS,
            _ => 0.0,
        };
    }
    bonus
}

/// Coverage of the predicted categories in the final list.
pub fn coverage_report(results: &[RetrievalResult], predicted: &[PolicyCategory]) -> CoverageReport {
    let mut category_coverage = BTreeMap::new();
    let mut missing = Vec::new();
    let mut covered = 0usize;

    for category in predicted {
        let name = category.as_str();
        let count = results
            .iter()
            .filter(|r| r.matched_categories.iter().any(|c| c == name))
            .count();
        if count > 0 {
            covered += 1;
        } else {
            missing.push(name.to_string());
        }
        category_coverage.insert(
            name.to_string(),
            CategoryCoverage {
                result_count: count,
                covered: count > 0,
            },
        );
    }

    CoverageReport {
        predicted_categories: predicted.iter().map(|c| c.as_str().to_string()).collect(),
        total_results: results.len(),
        category_coverage,
        missing_categories: missing,
        coverage_score: if predicted.is_empty() {
            1.0
        } else {
            covered as f32 / predicted.len() as f32
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyhub_models::{ChunkPayload, Vertical};
    use serde_json::Map;

    fn candidate(id: &str, content: &str, score: f32) -> RetrievalResult {
        RetrievalResult::new(
            id.to_string(),
            format!("doc-{id}"),
            Vertical::Go,
            content.to_string(),
            score,
            ChunkPayload(Map::new()),
        )
    }

    #[test]
    fn mandatory_pass_rescues_low_scored_categories() {
        let predicted = vec![PolicyCategory::Infrastructure, PolicyCategory::Teacher];
        let candidates = vec![
            candidate("i1", "classroom construction and toilet facilities", 0.9),
            candidate("i2", "boundary wall and drinking water works", 0.85),
            candidate("i3", "library and laboratory upgrades", 0.8),
            candidate("t1", "teacher recruitment notification", 0.2),
        ];
        let outcome = enforce(candidates, &predicted, 3, 1, 0.4);
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.chunk_id.as_str()).collect();
        assert!(ids.contains(&"t1"), "teacher chunk must be rescued: {ids:?}");
        assert!(outcome.report.category_coverage["teacher"].covered);
        assert_eq!(outcome.report.coverage_score, 1.0);
    }

    #[test]
    fn missing_categories_are_reported() {
        let predicted = vec![PolicyCategory::Infrastructure, PolicyCategory::Assessment];
        let candidates = vec![candidate("i1", "classroom construction works", 0.9)];
        let outcome = enforce(candidates, &predicted, 5, 1, 0.4);
        assert_eq!(outcome.report.missing_categories, vec!["assessment"]);
        assert!((outcome.report.coverage_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fill_pass_prefers_new_categories_over_marginal_score() {
        let predicted = vec![
            PolicyCategory::Infrastructure,
            PolicyCategory::Welfare,
            PolicyCategory::Teacher,
        ];
        let candidates = vec![
            candidate("i1", "toilet construction programme", 0.95),
            candidate("i2", "classroom construction phase two", 0.93),
            candidate("w1", "amma vodi scholarship benefit", 0.90),
            candidate("t1", "teacher training calendar", 0.89),
            candidate("i3", "playground development", 0.92),
        ];
        // top_k 4: mandatory pass takes i1, w1, t1; fill pass takes one more.
        let outcome = enforce(candidates, &predicted, 4, 1, 0.4);
        assert_eq!(outcome.results.len(), 4);
        assert!(outcome.report.coverage_score >= 0.99);
    }

    #[test]
    fn empty_predictions_keep_ranking_untouched() {
        let candidates = vec![
            candidate("a", "anything", 0.9),
            candidate("b", "else", 0.8),
        ];
        let outcome = enforce(candidates, &[], 1, 1, 0.4);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].chunk_id, "a");
        assert_eq!(outcome.report.coverage_score, 1.0);
    }

    #[test]
    fn classification_tags_matched_categories() {
        let predicted = vec![PolicyCategory::Infrastructure, PolicyCategory::Welfare];
        let cats = categories_of("nadu nedu toilet and midday meal coverage", &predicted);
        assert_eq!(cats.len(), 2);
    }
}
