use crate::retrieval_core::bm25;
use policyhub_models::{sort_by_score_desc, RetrievalResult};
use std::collections::BTreeMap;

/// Candidates scoring below this are never boosted; promoting irrelevant
/// keyword matches hurts more than missing a boost.
const BOOST_SCORE_FLOOR: f32 = 0.5;
/// Boosts are additive on top of the working score, capped at 1.0.
const BOOST_SCALE: f32 = 0.1;

/// Query substrings that switch keyword boosting on at all.
const BOOST_TRIGGERS: &[&str] = &[
    "infrastructure",
    "facility",
    "building",
    "construction",
    "scheme",
    "welfare",
    "benefit",
    "assistance",
    "safety",
    "security",
    "compliance",
    "standard",
    "technical",
    "specification",
    "procurement",
];

struct BoostCategory {
    name: &'static str,
    factor: f32,
    keywords: &'static [&'static str],
}

/// Keyword-heavy domains that dense similarity underrates.
const BOOST_CATEGORIES: &[BoostCategory] = &[
    BoostCategory {
        name: "infrastructure",
        factor: 1.5,
        keywords: &[
            "nadu nedu", "infrastructure", "building", "classroom", "toilet", "drinking water",
            "electricity", "boundary wall", "compound wall", "furniture", "laboratory", "library",
            "playground", "kitchen", "ramp", "construction", "renovation", "maintenance", "repair",
            "cctv", "fire safety", "sanitation",
        ],
    },
    BoostCategory {
        name: "welfare_schemes",
        factor: 1.4,
        keywords: &[
            "amma vodi", "vidya kanuka", "vidya deevena", "gorumudda", "mid day meal",
            "midday meal", "school kit", "uniform", "scholarship", "financial assistance",
            "transport scheme", "hostel", "residential school", "welfare scheme", "benefit",
            "incentive", "allowance", "stipend", "nutrition program",
        ],
    },
    BoostCategory {
        name: "safety",
        factor: 1.3,
        keywords: &[
            "fire safety", "emergency procedure", "evacuation plan", "safety drill",
            "accident prevention", "child protection", "safety audit", "compliance check",
            "safety standard", "security protocol", "cctv monitoring", "visitor management",
            "child safety policy", "grievance",
        ],
    },
    BoostCategory {
        name: "technical",
        factor: 1.2,
        keywords: &[
            "specification", "technical requirement", "standard", "norm", "measurement",
            "dimension", "capacity", "procurement", "tender", "supplier", "vendor", "contract",
            "rate analysis", "cost estimation", "budget allocation", "expenditure",
            "utilization certificate",
        ],
    },
];

pub fn should_boost(query: &str) -> bool {
    let lower = query.to_lowercase();
    BOOST_TRIGGERS.iter().any(|t| lower.contains(t))
}

/// Per-category query terms that participate in boosting.
fn boost_terms(query: &str) -> BTreeMap<&'static str, Vec<String>> {
    let lower = query.to_lowercase();
    let mut terms = BTreeMap::new();
    for category in BOOST_CATEGORIES {
        let matched: Vec<String> = category
            .keywords
            .iter()
            .filter(|kw| lower.contains(*kw))
            .map(|kw| kw.to_string())
            .collect();
        if !matched.is_empty() {
            terms.insert(category.name, matched);
        }
    }
    terms
}

/// Apply additive BM25 boosts to keyword-matching candidates and re-sort.
/// Returns the number of boosted candidates for the trace.
pub fn boost(query: &str, results: &mut Vec<RetrievalResult>) -> usize {
    if !should_boost(query) {
        return 0;
    }
    let terms_by_category = boost_terms(query);
    if terms_by_category.is_empty() {
        return 0;
    }

    let avg_len = if results.is_empty() {
        100.0
    } else {
        results
            .iter()
            .map(|r| bm25::tokenize(&r.content).len() as f32)
            .sum::<f32>()
            / results.len() as f32
    };

    let mut boosted = 0usize;
    for result in results.iter_mut() {
        let original = result.effective_score();
        if original < BOOST_SCORE_FLOOR {
            continue;
        }

        let mut total_boost = 0.0;
        for (name, terms) in &terms_by_category {
            let phrase_terms: Vec<String> = terms
                .iter()
                .flat_map(|phrase| bm25::tokenize(phrase))
                .collect();
            let keyword_score = bm25::score(&phrase_terms, &result.content, avg_len);
            if keyword_score > 0.0 {
                let factor = BOOST_CATEGORIES
                    .iter()
                    .find(|c| c.name == *name)
                    .map(|c| c.factor)
                    .unwrap_or(1.0);
                total_boost += keyword_score * factor * BOOST_SCALE;
            }
        }

        if total_boost > 0.0 {
            result.rerank_score = Some((original + total_boost).min(1.0));
            result.bm25_boost = Some(total_boost);
            boosted += 1;
        }
    }

    if boosted > 0 {
        sort_by_score_desc(results);
        tracing::debug!(boosted, "bm25 boost applied");
    }
    boosted
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
            Vertical::Schemes,
            content.to_string(),
            score,
            ChunkPayload(Map::new()),
        )
    }

    #[test]
    fn trigger_detection_is_selective() {
        assert!(should_boost("nadu nedu infrastructure development"));
        assert!(should_boost("amma vodi welfare scheme implementation"));
        assert!(!should_boost("what is section 12 of the rte act"));
    }

    #[test]
    fn keyword_heavy_chunks_get_boosted_and_resorted() {
        let mut results = vec![
            candidate("semantic", "education policy discussion in general terms", 0.8),
            candidate(
                "keyword",
                "nadu nedu infrastructure works: toilet blocks, classroom construction",
                0.75,
            ),
        ];
        let boosted = boost("nadu nedu infrastructure development", &mut results);
        assert_eq!(boosted, 1);
        assert_eq!(results[0].chunk_id, "keyword");
        assert!(results[0].bm25_boost.unwrap() > 0.0);
        assert!(results[0].effective_score() <= 1.0);
    }

    #[test]
    fn low_scored_candidates_are_never_promoted() {
        let mut results = vec![candidate(
            "weak",
            "nadu nedu infrastructure toilet construction",
            0.2,
        )];
        let boosted = boost("nadu nedu infrastructure", &mut results);
        assert_eq!(boosted, 0);
        assert!(results[0].bm25_boost.is_none());
    }

    #[test]
    fn non_trigger_queries_leave_results_alone() {
        let mut results = vec![candidate("a", "nadu nedu infrastructure", 0.9)];
        assert_eq!(boost("what is section 12", &mut results), 0);
        assert!(results[0].bm25_boost.is_none());
    }
}
