use crate::query_processing::entity_extractor::{EntityKind, ExtractedEntities};
use crate::query_processing::intent_classifier::IntentSignals;
use once_cell::sync::Lazy;
use policyhub_models::{QueryMode, Vertical};
use regex::Regex;
use std::collections::BTreeMap;

const KEYWORD_WEIGHT: f32 = 0.2;
const PATTERN_WEIGHT: f32 = 0.4;
const ENTITY_WEIGHT: f32 = 0.3;
const FALLBACK_THRESHOLD: f32 = 0.3;
const MAX_VERTICALS: usize = 3;

/// Routing outcome: ordered verticals plus aggregation weights normalized
/// to sum to 1.0 over the selected verticals. `scores` keeps the full
/// pre-truncation score map for callers that widen the selection.
#[derive(Debug, Clone)]
pub struct RouterOutcome {
    pub verticals: Vec<Vertical>,
    pub weights: BTreeMap<Vertical, f32>,
    pub scores: BTreeMap<Vertical, f32>,
}

struct VerticalProfile {
    vertical: Vertical,
    keywords: &'static [&'static str],
    entity_kinds: &'static [EntityKind],
    patterns: Vec<Regex>,
    /// Context boost by mode: (qa, deep_think, brainstorm).
    context_boost: (f32, f32, f32),
}

static PROFILES: Lazy<Vec<VerticalProfile>> = Lazy::new(|| {
    let rx = |p: &str| Regex::new(p).unwrap();
    vec![
        VerticalProfile {
            vertical: Vertical::Legal,
            keywords: &[
                "act", "law", "legislation", "section", "article", "provision", "clause", "rule",
                "regulation", "rte", "constitution", "amendment", "bill", "ordinance", "statute",
            ],
            entity_kinds: &[EntityKind::Section, EntityKind::Article, EntityKind::Rule, EntityKind::ActName],
            patterns: vec![
                rx(r"\b(?:section|article|rule|provision|clause)\s+\d+"),
                rx(r"\b(?:act|law|regulation)\s+\d{4}"),
                rx(r"\brte\s+(?:act|law|provision)"),
                rx(r"\b(?:constitutional|legal)\s+(?:provision|requirement|mandate)"),
            ],
            context_boost: (1.2, 1.5, 0.8),
        },
        VerticalProfile {
            vertical: Vertical::Go,
            keywords: &[
                "government order", "notification", "circular", "directive", "memo", "memorandum",
                "education policy", "curriculum framework", "teacher training",
                "school infrastructure", "mana badi", "technology integration",
            ],
            entity_kinds: &[EntityKind::GoNumber],
            patterns: vec![
                rx(r"\bg\.?o\.?\s*(?:ms|rt)?\s*\.?\s*(?:no\.?\s*)?\d+"),
                rx(r"\bgovernment\s+order\s+no"),
                rx(r"\bnotification\s+no"),
                rx(r"\bcircular\s+no"),
            ],
            context_boost: (1.3, 1.0, 0.7),
        },
        VerticalProfile {
            vertical: Vertical::Judicial,
            keywords: &[
                "judgment", "court", "case", "writ", "petition", "supreme court", "high court",
                "judicial", "bench", "magistrate", "civil", "criminal",
            ],
            entity_kinds: &[EntityKind::CaseNumber],
            patterns: vec![
                rx(r"\b(?:judgment|case|writ|petition)\s+no"),
                rx(r"\b(?:supreme|high)\s+court"),
                rx(r"\bwp\s+no\s+\d+"),
            ],
            context_boost: (1.1, 1.2, 0.9),
        },
        VerticalProfile {
            vertical: Vertical::Data,
            keywords: &[
                "statistics", "data", "report", "survey", "udise", "enrollment", "dropout",
                "percentage", "ratio", "census", "baseline", "achievement", "indicators",
            ],
            entity_kinds: &[EntityKind::Year],
            patterns: vec![
                rx(r"\b(?:statistics|data|report)\s+(?:on|for|of)"),
                rx(r"\b(?:enrollment|dropout|performance)\s+(?:rate|ratio|data)"),
                rx(r"\budise\s+(?:data|report|statistics)"),
            ],
            context_boost: (1.0, 1.1, 1.3),
        },
        VerticalProfile {
            vertical: Vertical::Schemes,
            keywords: &[
                "scheme", "program", "initiative", "project", "mission", "mana badi", "nadu nedu",
                "nadu-nedu", "infrastructure", "midday meal", "scholarship", "incentive", "fund",
                "grant", "national education policy", "samagra shiksha", "digital education",
                "smart classroom", "innovation", "curriculum", "syllabus", "stem", "training",
            ],
            entity_kinds: &[],
            patterns: vec![
                rx(r"\b(?:scheme|program|initiative|project)\s+(?:for|of|under)"),
                rx(r"\bmana\s+badi"),
                rx(r"\bnadu[\s-]+nedu"),
                rx(r"\bmidday\s+meal"),
                rx(r"\bscholarship\s+(?:scheme|program)"),
                rx(r"\bnational\s+education\s+policy"),
                rx(r"\b(?:technology|digital)\s+(?:integration|education)"),
            ],
            context_boost: (0.9, 1.2, 1.4),
        },
    ]
});

/// Route a query to its top verticals.
///
/// Scores each vertical from keyword, pattern, and entity evidence, applies
/// the per-mode context boost, and (on the v2 path) intent-signal boosts
/// and query-length heuristics. Falls back to a mode-specific distribution
/// when nothing scores above the threshold.
pub fn route(
    query: &str,
    entities: &ExtractedEntities,
    mode: QueryMode,
    signals: Option<&IntentSignals>,
    use_v2_heuristics: bool,
) -> RouterOutcome {
    let mut scores: BTreeMap<Vertical, f32> = BTreeMap::new();

    for profile in PROFILES.iter() {
        let score = score_vertical(profile, query, entities, mode, signals, use_v2_heuristics);
        if score > 0.0 {
            scores.insert(profile.vertical, score);
        }
    }

    let max_score = scores.values().cloned().fold(0.0_f32, f32::max);
    if scores.is_empty() || max_score < FALLBACK_THRESHOLD {
        tracing::debug!(%mode, "router falling back to mode distribution");
        scores = fallback_scores(query, entities, mode);
    }

    let all_scores = scores.clone();
    let mut ranked: Vec<(Vertical, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.priority().cmp(&b.0.priority()))
    });
    ranked.truncate(MAX_VERTICALS);

    let total: f32 = ranked.iter().map(|(_, s)| s).sum();
    let weights: BTreeMap<Vertical, f32> = ranked
        .iter()
        .map(|(v, s)| (*v, if total > 0.0 { s / total } else { 1.0 / ranked.len() as f32 }))
        .collect();

    RouterOutcome {
        verticals: ranked.into_iter().map(|(v, _)| v).collect(),
        weights,
        scores: all_scores,
    }
}

fn score_vertical(
    profile: &VerticalProfile,
    query: &str,
    entities: &ExtractedEntities,
    mode: QueryMode,
    signals: Option<&IntentSignals>,
    use_v2_heuristics: bool,
) -> f32 {
    let mut score = 0.0;

    for keyword in profile.keywords {
        if query.contains(keyword) {
            score += KEYWORD_WEIGHT;
        }
    }
    for pattern in &profile.patterns {
        if pattern.is_match(query) {
            score += PATTERN_WEIGHT;
        }
    }
    for kind in profile.entity_kinds {
        if entities.has(*kind) {
            score += ENTITY_WEIGHT;
        }
    }

    let (qa_boost, deep_boost, brainstorm_boost) = profile.context_boost;
    score *= match mode {
        QueryMode::Qa => qa_boost,
        QueryMode::DeepThink => deep_boost,
        QueryMode::Brainstorm => brainstorm_boost,
    };

    if use_v2_heuristics {
        if let Some(signals) = signals {
            score = apply_intent_boost(score, profile.vertical, signals);
        }

        let words = query.split_whitespace().count();
        if words > 15 && matches!(profile.vertical, Vertical::Legal | Vertical::Schemes) {
            score *= 1.2;
        } else if words < 5 && matches!(profile.vertical, Vertical::Go | Vertical::Judicial) {
            score *= 1.1;
        }
    }

    score.min(1.0)
}

fn apply_intent_boost(mut score: f32, vertical: Vertical, signals: &IntentSignals) -> f32 {
    if signals.comprehensive_score > 0.6 {
        match vertical {
            Vertical::Legal | Vertical::Schemes => score *= 1.3,
            Vertical::Data => score *= 1.2,
            _ => {}
        }
    }
    if signals.qa_score > 0.7 && matches!(vertical, Vertical::Go | Vertical::Judicial) {
        score *= 1.2;
    }
    if signals.brainstorm_score > 0.6 && matches!(vertical, Vertical::Schemes | Vertical::Data) {
        score *= 1.4;
    }
    score
}

fn fallback_scores(
    query: &str,
    entities: &ExtractedEntities,
    mode: QueryMode,
) -> BTreeMap<Vertical, f32> {
    let mut scores: BTreeMap<Vertical, f32> = match mode {
        QueryMode::Qa => [
            (Vertical::Legal, 0.6),
            (Vertical::Go, 0.5),
            (Vertical::Judicial, 0.3),
        ]
        .into_iter()
        .collect(),
        QueryMode::DeepThink => [
            (Vertical::Legal, 0.7),
            (Vertical::Schemes, 0.6),
            (Vertical::Data, 0.5),
            (Vertical::Go, 0.4),
            (Vertical::Judicial, 0.3),
        ]
        .into_iter()
        .collect(),
        QueryMode::Brainstorm => [
            (Vertical::Schemes, 0.8),
            (Vertical::Data, 0.7),
            (Vertical::Legal, 0.4),
        ]
        .into_iter()
        .collect(),
    };

    if entities.has(EntityKind::Year) {
        *scores.entry(Vertical::Data).or_insert(0.0) += 0.3;
    }
    if entities.has(EntityKind::Section) || entities.has(EntityKind::Article) {
        *scores.entry(Vertical::Legal).or_insert(0.0) += 0.4;
    }
    if query.split_whitespace().count() > 10 {
        *scores.entry(Vertical::Legal).or_insert(0.0) += 0.2;
        *scores.entry(Vertical::Schemes).or_insert(0.0) += 0.2;
    }

    scores
}
