use crate::errors::ClassifierError;
use crate::query_processing::entity_extractor::ExtractedEntities;
use once_cell::sync::Lazy;
use policyhub_models::QueryMode;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keywords indicating short factual lookups.
const QA_KEYWORDS: &[&str] = &[
    "what is",
    "define",
    "who is",
    "when was",
    "where is",
    "how many",
    "list",
    "show me",
    "section",
    "rule",
    "go number",
    "notification",
    "order",
    "judgment",
    "case",
];

/// Keywords indicating structured policy analysis.
const DEEP_THINK_KEYWORDS: &[&str] = &[
    "analyze",
    "explain in detail",
    "comprehensive",
    "deep dive",
    "policy analysis",
    "constitutional",
    "legal framework",
    "360",
    "holistic",
    "integrated",
    "synthesis",
    "implications",
    "impact",
    "assessment",
    "evaluation",
    "review",
];

/// Keywords indicating exploratory ideation.
const BRAINSTORM_KEYWORDS: &[&str] = &[
    "ideas",
    "suggestions",
    "brainstorm",
    "innovative",
    "creative",
    "new approaches",
    "best practices",
    "global models",
    "alternatives",
    "options",
    "possibilities",
    "improvements",
    "recommendations",
    "international",
    "comparison",
    "benchmarking",
];

/// Keywords indicating the query wants exhaustive coverage.
const COMPREHENSIVE_KEYWORDS: &[&str] = &[
    "comprehensive",
    "complete",
    "all",
    "entire",
    "overall",
    "holistic",
    "framework",
    "analyze",
    "analysis",
    "360",
];

static SPECIFIC_ENTITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"section\s+\d+",
        r"article\s+\d+",
        r"rule\s+\d+",
        r"go\s*[\d-]+",
        r"g\.o\.",
        r"notification\s*no",
        r"case\s*no",
        r"\d{4}\s*\(\d+\)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Normalized intent signals, each in [0, 1] after min-max scaling over the
/// raw scores observed for this query. Consumed by the router and dynamic
/// top-k.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentSignals {
    pub qa_score: f32,
    pub deep_think_score: f32,
    pub brainstorm_score: f32,
    pub comprehensive_score: f32,
    pub specificity_score: f32,
}

/// Classification output: mode, confidence, and the signal vector.
#[derive(Debug, Clone)]
pub struct Classification {
    pub mode: QueryMode,
    pub confidence: f32,
    pub signals: IntentSignals,
}

/// Rule-based intent classification. Deterministic; the only failure is a
/// null input.
pub fn classify(
    normalized_query: &str,
    entities: &ExtractedEntities,
) -> Result<Classification, ClassifierError> {
    if normalized_query.trim().is_empty() {
        return Err(ClassifierError::EmptyQuery);
    }

    let qa = count_keywords(normalized_query, QA_KEYWORDS);
    let deep = count_keywords(normalized_query, DEEP_THINK_KEYWORDS);
    let brainstorm = count_keywords(normalized_query, BRAINSTORM_KEYWORDS);
    let signals = build_signals(normalized_query, entities, qa, deep, brainstorm);

    let word_count = normalized_query.split_whitespace().count();

    // Shortcut rules, in fixed order.
    if word_count <= 5 && qa > 0 {
        return Ok(Classification {
            mode: QueryMode::Qa,
            confidence: 0.9,
            signals,
        });
    }
    if has_specific_entity(normalized_query) {
        return Ok(Classification {
            mode: QueryMode::Qa,
            confidence: 0.85,
            signals,
        });
    }
    if word_count > 15 && deep == 0 && brainstorm == 0 {
        return Ok(Classification {
            mode: QueryMode::DeepThink,
            confidence: 0.7,
            signals,
        });
    }

    // Highest keyword score wins; ties break QA > DeepThink > Brainstorm.
    let max = qa.max(deep).max(brainstorm);
    let mode = if max == 0 || qa == max {
        QueryMode::Qa
    } else if deep == max {
        QueryMode::DeepThink
    } else {
        QueryMode::Brainstorm
    };
    let confidence = (0.6 + 0.1 * max as f32).min(0.95);

    Ok(Classification {
        mode,
        confidence,
        signals,
    })
}

/// Explicit mode from the caller overrides classification entirely.
pub fn classification_for_override(
    mode: QueryMode,
    normalized_query: &str,
    entities: &ExtractedEntities,
) -> Classification {
    let signals = classify(normalized_query, entities)
        .map(|c| c.signals)
        .unwrap_or_default();
    Classification {
        mode,
        confidence: 1.0,
        signals,
    }
}

pub fn has_specific_entity(query: &str) -> bool {
    SPECIFIC_ENTITY_PATTERNS.iter().any(|p| p.is_match(query))
}

fn count_keywords(query: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| query.contains(*k)).count()
}

fn build_signals(
    query: &str,
    entities: &ExtractedEntities,
    qa: usize,
    deep: usize,
    brainstorm: usize,
) -> IntentSignals {
    let comprehensive = count_keywords(query, COMPREHENSIVE_KEYWORDS);
    let specificity: usize = entities.0.values().map(|v| v.len()).sum::<usize>()
        + if has_specific_entity(query) { 1 } else { 0 };

    let raw = [
        qa as f32,
        deep as f32,
        brainstorm as f32,
        comprehensive as f32,
        specificity as f32,
    ];
    let min = raw.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

    let norm = |x: f32| {
        if (max - min).abs() < f32::EPSILON {
            if max > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            (x - min) / (max - min)
        }
    };

    IntentSignals {
        qa_score: norm(raw[0]),
        deep_think_score: norm(raw[1]),
        brainstorm_score: norm(raw[2]),
        comprehensive_score: norm(raw[3]),
        specificity_score: norm(raw[4]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_processing::entity_extractor::extract;

    fn classify_q(q: &str) -> Classification {
        classify(q, &extract(q)).unwrap()
    }

    #[test]
    fn empty_query_is_an_error() {
        assert!(classify("  ", &ExtractedEntities::default()).is_err());
    }

    #[test]
    fn short_lookup_is_qa_with_high_confidence() {
        let c = classify_q("what is rte");
        assert_eq!(c.mode, QueryMode::Qa);
        assert!((c.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn specific_entity_forces_qa() {
        let c = classify_q("explain the implications and impact of section 12 in practice today");
        assert_eq!(c.mode, QueryMode::Qa);
        assert!((c.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn long_unmarked_query_leans_deep_think() {
        let q = "how do the state education department and local bodies share funding \
                 responsibility for primary schooling across rural and urban districts";
        let c = classify_q(q);
        assert_eq!(c.mode, QueryMode::DeepThink);
        assert!((c.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn brainstorm_keywords_win_on_score() {
        let c = classify_q("innovative ideas and creative suggestions for improving enrollment");
        assert_eq!(c.mode, QueryMode::Brainstorm);
        assert!(c.confidence >= 0.6 && c.confidence <= 0.95);
    }

    #[test]
    fn ties_break_toward_qa() {
        // "review" (deep) vs "list" (qa): one keyword each.
        let c = classify_q("review committee member ordering procedure details here now extra");
        // qa score from "order" substring of "ordering" also counts; mode must
        // not be Brainstorm either way.
        assert_ne!(c.mode, QueryMode::Brainstorm);
    }

    #[test]
    fn override_has_full_confidence() {
        let q = "what is section 12";
        let c = classification_for_override(QueryMode::Brainstorm, q, &extract(q));
        assert_eq!(c.mode, QueryMode::Brainstorm);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn signals_are_normalized() {
        let c = classify_q("comprehensive analysis of all teacher training policies");
        let s = c.signals;
        for value in [
            s.qa_score,
            s.deep_think_score,
            s.brainstorm_score,
            s.comprehensive_score,
            s.specificity_score,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!(s.comprehensive_score > 0.5);
    }
}
