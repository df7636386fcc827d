use crate::query_processing::entity_extractor::{EntityKind, ExtractedEntities};
use policyhub_models::QueryMode;
use std::collections::BTreeMap;

/// Domain synonym dictionary. Closed and deterministic; no LLM rewrites.
const SYNONYMS: &[(&str, &[&str])] = &[
    // Education terms
    ("teacher", &["faculty", "educator", "instructor"]),
    ("student", &["pupil", "learner"]),
    ("school", &["institution", "educational institution"]),
    ("transfer", &["posting", "shifting", "relocation"]),
    ("salary", &["pay", "remuneration", "wages"]),
    ("qualification", &["eligibility", "credentials"]),
    // Administrative terms
    ("budget", &["finance", "allocation", "expenditure"]),
    ("policy", &["guideline", "directive", "framework"]),
    ("scheme", &["program", "initiative", "project"]),
    ("department", &["directorate", "ministry"]),
    // Legal terms
    ("provision", &["clause", "section", "article"]),
    ("mandate", &["requirement", "obligation"]),
    ("amendment", &["modification", "revision"]),
    // Data terms
    ("statistics", &["data", "metrics", "figures"]),
    ("enrollment", &["admission", "intake"]),
    ("dropout", &["attrition", "leaving"]),
];

/// Build the enhanced query: the normalized query, followed by the entity
/// string, optional synonym expansion, and a per-mode context suffix.
pub fn enhance(
    normalized_query: &str,
    entities: &ExtractedEntities,
    mode: QueryMode,
    expand_synonyms: bool,
) -> String {
    let mut parts = vec![normalized_query.to_string()];

    let entity_str = entities.entity_string();
    if !entity_str.is_empty() {
        parts.push(entity_str.to_lowercase());
    }

    if expand_synonyms {
        let synonyms = matching_synonyms(normalized_query);
        if !synonyms.is_empty() {
            parts.push(synonyms.join(" "));
        }
    }

    match mode {
        QueryMode::Brainstorm => {
            parts.push("global best practices international models".to_string())
        }
        QueryMode::DeepThink => {
            parts.push("legal framework constitutional judicial administrative".to_string())
        }
        QueryMode::Qa => {}
    }

    parts.join(" ")
}

fn matching_synonyms(query: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (term, synonyms) in SYNONYMS {
        if query.contains(term) {
            for syn in *synonyms {
                if !query.contains(syn) && !out.iter().any(|s| s == syn) {
                    out.push((*syn).to_string());
                }
            }
        }
    }
    out
}

/// Build the logical filter map from extracted entities. Keys are logical
/// filter fields; the retriever maps them to physical payload fields per
/// vertical at search time.
pub fn build_filters(entities: &ExtractedEntities) -> BTreeMap<String, Vec<String>> {
    let mut filters = BTreeMap::new();

    let years = entities.values(EntityKind::Year);
    if !years.is_empty() {
        filters.insert("year".to_string(), years);
    }

    let go_numbers = entities.values(EntityKind::GoNumber);
    if !go_numbers.is_empty() {
        filters.insert("go_number".to_string(), go_numbers);
    }

    let sections = entities.values(EntityKind::Section);
    if !sections.is_empty() {
        filters.insert("sections".to_string(), sections);
    }

    filters
}
