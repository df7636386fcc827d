use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity kinds recognized by the closed regex families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Section,
    Article,
    Rule,
    GoNumber,
    Year,
    CaseNumber,
    ActName,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Section => "section",
            EntityKind::Article => "article",
            EntityKind::Rule => "rule",
            EntityKind::GoNumber => "go_number",
            EntityKind::Year => "year",
            EntityKind::CaseNumber => "case_number",
            EntityKind::ActName => "act_name",
        }
    }
}

/// One extracted reference with its raw span and normalized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: EntityKind,
    pub raw: String,
    pub normalized: String,
    pub start: usize,
    pub end: usize,
}

/// All entities extracted from a query, keyed by kind. Duplicates (same
/// normalized form) are kept per occurrence; deduplication happens when
/// filters are built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities(pub BTreeMap<EntityKind, Vec<ExtractedEntity>>);

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, kind: EntityKind) -> bool {
        self.0.get(&kind).map(|v| !v.is_empty()).unwrap_or(false)
    }

    /// Normalized values for a kind, in match order, deduplicated.
    pub fn values(&self, kind: EntityKind) -> Vec<String> {
        let mut seen = Vec::new();
        if let Some(entities) = self.0.get(&kind) {
            for e in entities {
                if !seen.contains(&e.normalized) {
                    seen.push(e.normalized.clone());
                }
            }
        }
        seen
    }

    /// Compact entity string appended to the enhanced query, e.g.
    /// "section 12 year 2019".
    pub fn entity_string(&self) -> String {
        let mut parts = Vec::new();
        for kind in [
            EntityKind::Section,
            EntityKind::Article,
            EntityKind::Rule,
            EntityKind::GoNumber,
            EntityKind::Year,
        ] {
            let values = self.values(kind);
            if !values.is_empty() {
                let label = kind.as_str().replace('_', " ");
                parts.push(format!("{} {}", label, values.join(", ")));
            }
        }
        parts.join(" ")
    }
}

struct PatternFamily {
    kind: EntityKind,
    patterns: Vec<Regex>,
}

static FAMILIES: Lazy<Vec<PatternFamily>> = Lazy::new(|| {
    let rx = |p: &str| Regex::new(p).unwrap();
    vec![
        PatternFamily {
            kind: EntityKind::Section,
            patterns: vec![
                rx(r"(?i)\bsection\s+(\d+[A-Za-z]*(?:\(\d+\))?(?:\([a-z]\))?)"),
                rx(r"(?i)\bsec\.?\s+(\d+[A-Za-z]*)"),
                rx(r"(?i)\bs\.\s*(\d+[A-Za-z]*)"),
            ],
        },
        PatternFamily {
            kind: EntityKind::Article,
            patterns: vec![
                rx(r"(?i)\barticle\s+(\d+[A-Za-z]*)"),
                rx(r"(?i)\bart\.?\s+(\d+[A-Za-z]*)"),
            ],
        },
        PatternFamily {
            kind: EntityKind::Rule,
            patterns: vec![rx(r"(?i)\brule\s+(\d+[A-Za-z]*(?:\(\d+\))?)")],
        },
        PatternFamily {
            kind: EntityKind::GoNumber,
            patterns: vec![
                rx(r"(?i)\bG\.?O\.?\s*(?:MS|RT)?\.?\s*(?:No\.?\s*)?(\d+)"),
                rx(r"(?i)\bNotification\s*No\.?\s*(\d+)"),
            ],
        },
        PatternFamily {
            kind: EntityKind::Year,
            patterns: vec![
                rx(r"\b(19\d{2}|20\d{2})-(\d{2,4})\b"),
                rx(r"\b(19\d{2}|20\d{2})\b"),
            ],
        },
        PatternFamily {
            kind: EntityKind::CaseNumber,
            patterns: vec![
                rx(r"(?i)\bW\.?P\.?\s*No\.?\s*(\d+)\s*of\s*(\d{4})"),
                rx(r"(?i)\bW\.?A\.?\s*No\.?\s*(\d+)\s*of\s*(\d{4})"),
                rx(r"(?i)\bC\.?A\.?\s*No\.?\s*(\d+)\s*of\s*(\d{4})"),
            ],
        },
        PatternFamily {
            kind: EntityKind::ActName,
            patterns: vec![
                rx(r"(?i)\b([a-z][a-z\s]+act(?:,?\s*\d{4})?)"),
                rx(r"(?i)\brte\s*act\b"),
            ],
        },
    ]
});

/// Extract all entities from a (normalized) query. Deterministic: regex
/// only, no model calls. Idempotent on its own normalized outputs.
pub fn extract(query: &str) -> ExtractedEntities {
    let mut out: BTreeMap<EntityKind, Vec<ExtractedEntity>> = BTreeMap::new();

    for family in FAMILIES.iter() {
        let mut entities = Vec::new();
        for pattern in &family.patterns {
            for caps in pattern.captures_iter(query) {
                let whole = caps.get(0).unwrap();
                // The year-range pattern also matches the bare-year one;
                // skip spans already claimed by an earlier pattern.
                if entities
                    .iter()
                    .any(|e: &ExtractedEntity| e.start <= whole.start() && whole.end() <= e.end)
                {
                    continue;
                }
                entities.push(ExtractedEntity {
                    kind: family.kind,
                    raw: whole.as_str().to_string(),
                    normalized: normalize_match(family.kind, &caps),
                    start: whole.start(),
                    end: whole.end(),
                });
            }
        }
        if !entities.is_empty() {
            out.insert(family.kind, entities);
        }
    }

    ExtractedEntities(out)
}

fn normalize_match(kind: EntityKind, caps: &regex::Captures<'_>) -> String {
    match kind {
        EntityKind::Section | EntityKind::Article | EntityKind::Rule | EntityKind::GoNumber => {
            caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default()
        }
        EntityKind::Year => match (caps.get(1), caps.get(2)) {
            (Some(a), Some(b)) => format!("{}-{}", a.as_str(), b.as_str()),
            (Some(a), None) => a.as_str().to_string(),
            _ => caps.get(0).unwrap().as_str().to_string(),
        },
        EntityKind::CaseNumber => match (caps.get(1), caps.get(2)) {
            (Some(n), Some(y)) => format!("{}/{}", n.as_str(), y.as_str()),
            _ => caps.get(0).unwrap().as_str().to_string(),
        },
        EntityKind::ActName => {
            let raw = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_else(|| caps.get(0).unwrap().as_str());
            title_case(raw.trim())
        }
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_section_with_subclauses() {
        let entities = extract("what is section 12a(1) of the rte act");
        assert_eq!(entities.values(EntityKind::Section), vec!["12a(1)"]);
    }

    #[test]
    fn extracts_go_number_variants() {
        for q in ["g.o.ms.no.190", "go 190", "notification no. 190", "g.o. no 190"] {
            let entities = extract(q);
            assert_eq!(entities.values(EntityKind::GoNumber), vec!["190"], "query: {q}");
        }
    }

    #[test]
    fn extracts_year_and_ranges() {
        let entities = extract("enrollment data 2020-21 and budget 2023");
        let years = entities.values(EntityKind::Year);
        assert!(years.contains(&"2020-21".to_string()));
        assert!(years.contains(&"2023".to_string()));
        // The range span must not also surface as a bare 2020
        assert!(!years.contains(&"2020".to_string()));
    }

    #[test]
    fn extracts_case_number() {
        let entities = extract("w.p. no. 123 of 2020 regarding admissions");
        assert_eq!(entities.values(EntityKind::CaseNumber), vec!["123/2020"]);
    }

    #[test]
    fn title_cases_act_names() {
        let entities = extract("right to education act, 2009");
        let acts = entities.values(EntityKind::ActName);
        assert!(acts.iter().any(|a| a.starts_with("Right To Education Act")));
    }

    #[test]
    fn preserves_offsets() {
        let query = "section 12 and section 21";
        let entities = extract(query);
        let sections = &entities.0[&EntityKind::Section];
        assert_eq!(sections.len(), 2);
        assert_eq!(&query[sections[0].start..sections[0].end], "section 12");
        assert_eq!(&query[sections[1].start..sections[1].end], "section 21");
    }

    #[test]
    fn values_deduplicate_but_occurrences_remain() {
        let entities = extract("section 12 read with section 12");
        assert_eq!(entities.0[&EntityKind::Section].len(), 2);
        assert_eq!(entities.values(EntityKind::Section), vec!["12"]);
    }

    #[test]
    fn is_idempotent_on_entity_strings() {
        let first = extract("section 12 of rte act in 2019");
        let again = extract(&first.entity_string().to_lowercase());
        assert_eq!(
            first.values(EntityKind::Section),
            again.values(EntityKind::Section)
        );
        assert_eq!(first.values(EntityKind::Year), again.values(EntityKind::Year));
    }
}
