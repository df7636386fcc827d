use crate::query_processing::QueryPlan;
use once_cell::sync::Lazy;
use policyhub_models::{sort_by_score_desc, RetrievalResult};
use regex::Regex;
use std::collections::BTreeMap;

const ENTITY_BOOST: f32 = 0.1;
const ENTITY_BOOST_CAP: f32 = 0.3;
const CITED_REF_BOOST: f32 = 0.1;

static CITED_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)section\s+\d+|g\.o\.|notification\s+no").unwrap());

/// Light reranking: multiplicative boosts from exact entity matches and the
/// presence of citable references in the chunk body. No external calls.
pub fn rerank(
    mut candidates: Vec<RetrievalResult>,
    plan: &QueryPlan,
    top: usize,
) -> Vec<RetrievalResult> {
    for candidate in candidates.iter_mut() {
        let boost = entity_boost(&candidate.content, &plan.filters) + cited_ref_boost(&candidate.content);
        candidate.rerank_score = Some(candidate.score * (1.0 + boost));
    }
    sort_by_score_desc(&mut candidates);
    candidates.truncate(top);
    candidates
}

/// +0.1 per filter value found verbatim in the content, capped at +0.3.
pub(crate) fn entity_boost(content: &str, filters: &BTreeMap<String, Vec<String>>) -> f32 {
    let content_lower = content.to_lowercase();
    let mut boost = 0.0;

    for (field, values) in filters {
        for value in values {
            if entity_appears(&content_lower, field, value) {
                boost += ENTITY_BOOST;
            }
        }
    }

    boost.min(ENTITY_BOOST_CAP)
}

pub(crate) fn cited_ref_boost(content: &str) -> f32 {
    if CITED_REF.is_match(content) {
        CITED_REF_BOOST
    } else {
        0.0
    }
}

fn entity_appears(content_lower: &str, field: &str, value: &str) -> bool {
    let value_lower = value.to_lowercase();
    match field {
        "sections" => contains_any(
            content_lower,
            &[
                format!("section {value_lower}"),
                format!("sections {value_lower}"),
                format!("sec. {value_lower}"),
            ],
        ),
        "go_number" => contains_any(
            content_lower,
            &[
                format!("no.{value_lower}"),
                format!("no. {value_lower}"),
                format!("go {value_lower}"),
                format!("order {value_lower}"),
            ],
        ),
        _ => contains_word(content_lower, &value_lower),
    }
}

fn contains_any(content: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| content.contains(n.as_str()))
}

fn contains_word(content: &str, word: &str) -> bool {
    let bytes = content.as_bytes();
    let mut offset = 0;
    while let Some(pos) = content[offset..].find(word) {
        let start = offset + pos;
        let end = start + word.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end >= content.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        offset = start + 1;
    }
    false
}
