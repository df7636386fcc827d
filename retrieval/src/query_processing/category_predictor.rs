use once_cell::sync::Lazy;
use policyhub_models::QueryMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The seven policy categories every comprehensive answer must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCategory {
    Access,
    Infrastructure,
    Governance,
    Welfare,
    Curriculum,
    Assessment,
    Teacher,
}

pub const ALL_CATEGORIES: [PolicyCategory; 7] = [
    PolicyCategory::Access,
    PolicyCategory::Infrastructure,
    PolicyCategory::Governance,
    PolicyCategory::Welfare,
    PolicyCategory::Curriculum,
    PolicyCategory::Assessment,
    PolicyCategory::Teacher,
];

/// Priority order used for tie-breaking and broad-query truncation
/// (most fundamental first).
const PRIORITY_ORDER: [PolicyCategory; 7] = [
    PolicyCategory::Access,
    PolicyCategory::Infrastructure,
    PolicyCategory::Governance,
    PolicyCategory::Welfare,
    PolicyCategory::Teacher,
    PolicyCategory::Curriculum,
    PolicyCategory::Assessment,
];

impl PolicyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyCategory::Access => "access",
            PolicyCategory::Infrastructure => "infrastructure",
            PolicyCategory::Governance => "governance",
            PolicyCategory::Welfare => "welfare",
            PolicyCategory::Curriculum => "curriculum",
            PolicyCategory::Assessment => "assessment",
            PolicyCategory::Teacher => "teacher",
        }
    }

    fn priority_rank(&self) -> usize {
        PRIORITY_ORDER.iter().position(|c| c == self).unwrap_or(99)
    }

    /// Primary keywords, worth 2.0 per occurrence.
    pub fn primary_keywords(&self) -> &'static [&'static str] {
        match self {
            PolicyCategory::Access => &[
                "admission", "enrollment", "enrolment", "dropout", "out of school", "access",
                "inclusion", "equity", "girl child", "minority", "disabled children", "cwsn",
                "vulnerable", "disadvantaged", "school mapping", "catchment area", "distance norms",
            ],
            PolicyCategory::Infrastructure => &[
                "nadu nedu", "nadu-nedu", "infrastructure", "building", "classroom", "toilet",
                "drinking water", "electricity", "playground", "library", "laboratory", "kitchen",
                "boundary wall", "ramp", "cctv", "fire safety", "maintenance", "construction",
            ],
            PolicyCategory::Governance => &[
                "administration", "governance", "management", "inspection", "monitoring",
                "supervision", "compliance", "regulation", "deo", "meo", "diet", "scert",
                "headmaster", "principal", "district collector",
            ],
            PolicyCategory::Welfare => &[
                "amma vodi", "vidya kanuka", "vidya deevena", "gorumudda", "mid day meal",
                "midday meal", "school kit", "uniform", "scholarship", "financial assistance",
                "transport", "hostel", "residential school", "welfare scheme", "benefit",
            ],
            PolicyCategory::Curriculum => &[
                "curriculum", "syllabus", "textbook", "subject", "course", "content",
                "learning material", "digital content", "e-content", "pedagogy", "teaching method",
                "learning outcome", "competency", "skill development", "foundational literacy",
            ],
            PolicyCategory::Assessment => &[
                "assessment", "evaluation", "examination", "test", "cce",
                "continuous comprehensive evaluation", "grading", "marking", "progress tracking",
                "learning assessment", "achievement", "performance", "result", "promotion",
            ],
            PolicyCategory::Teacher => &[
                "teacher", "teaching", "faculty", "staff", "recruitment", "appointment",
                "transfer", "posting", "training", "capacity building", "professional development",
                "in-service training", "teacher education", "b.ed", "tet", "dsc",
            ],
        }
    }

    /// Secondary keywords, worth 1.0 per occurrence.
    pub fn secondary_keywords(&self) -> &'static [&'static str] {
        match self {
            PolicyCategory::Access => &[
                "barrier", "retention", "attendance", "participation", "inclusive education",
                "special needs", "tribal", "urban slum",
            ],
            PolicyCategory::Infrastructure => &[
                "facility", "equipment", "furniture", "sanitation", "hygiene", "safety",
                "security", "accessibility", "barrier free",
            ],
            PolicyCategory::Governance => &[
                "authority", "responsibility", "accountability", "oversight", "quality assurance",
                "institutional framework",
            ],
            PolicyCategory::Welfare => &[
                "incentive", "support", "assistance", "allowance", "stipend", "nutrition",
                "health checkup", "medical care",
            ],
            PolicyCategory::Curriculum => &[
                "academic", "educational content", "lesson plan", "activity",
                "project based learning", "experiential learning",
            ],
            PolicyCategory::Assessment => &[
                "measurement", "scoring", "feedback", "report card", "academic performance",
                "learning level",
            ],
            PolicyCategory::Teacher => &[
                "educator", "instructor", "human resource", "personnel", "qualification",
                "certification", "skill enhancement",
            ],
        }
    }

    /// All indicator keywords, used by the coverage enforcer to classify
    /// result content.
    pub fn indicator_keywords(&self) -> Vec<&'static str> {
        let mut all = self.primary_keywords().to_vec();
        all.extend_from_slice(self.secondary_keywords());
        all
    }
}

static BROAD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:current|latest|all|comprehensive|complete|overall)\s+(?:education\s+)?policies?\b",
        r"\beducation\s+(?:system|framework|structure|overview)\b",
        r"\b(?:list|overview|summary)\s+(?:of\s+)?(?:all\s+)?(?:education\s+)?(?:policies|initiatives|schemes)\b",
        r"\beducation\s+(?:in\s+)?(?:andhra\s+pradesh|ap)\b",
        r"\bap\s+education\s+(?:department|system|policies)\b",
        r"\bstate\s+education\s+policies?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static IMPLEMENTATION_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:implementation|execution|roll|deploy)\b").unwrap());
static QUALITY_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:quality|outcome|performance|improvement)\b").unwrap());
static EQUITY_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:inclusive|equity|equal|disadvantaged|vulnerable)\b").unwrap());
static STAFFING_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:recruitment|transfer|posting)\b").unwrap());

/// Categories guaranteed for broad lookup queries, most fundamental first.
const BROAD_POLICY_TOP5: [PolicyCategory; 5] = [
    PolicyCategory::Access,
    PolicyCategory::Infrastructure,
    PolicyCategory::Governance,
    PolicyCategory::Welfare,
    PolicyCategory::Curriculum,
];

const IMPLEMENTATION_COMBO: [PolicyCategory; 4] = [
    PolicyCategory::Governance,
    PolicyCategory::Infrastructure,
    PolicyCategory::Welfare,
    PolicyCategory::Teacher,
];
const QUALITY_COMBO: [PolicyCategory; 4] = [
    PolicyCategory::Curriculum,
    PolicyCategory::Assessment,
    PolicyCategory::Teacher,
    PolicyCategory::Infrastructure,
];
const EQUITY_COMBO: [PolicyCategory; 4] = [
    PolicyCategory::Access,
    PolicyCategory::Welfare,
    PolicyCategory::Infrastructure,
    PolicyCategory::Governance,
];
/// Teacher staffing decisions route through the administrative machinery,
/// so those queries always cover governance too.
const STAFFING_COMBO: [PolicyCategory; 2] =
    [PolicyCategory::Teacher, PolicyCategory::Governance];

/// Score every category against the (lowercased) query: +2.0 per primary
/// keyword occurrence, +1.0 per secondary.
pub fn score_categories(query: &str) -> BTreeMap<PolicyCategory, f32> {
    let mut scores = BTreeMap::new();
    for category in ALL_CATEGORIES {
        let mut score = 0.0;
        for kw in category.primary_keywords() {
            score += 2.0 * count_word_occurrences(query, kw) as f32;
        }
        for kw in category.secondary_keywords() {
            score += count_word_occurrences(query, kw) as f32;
        }
        scores.insert(category, score);
    }
    scores
}

pub fn is_broad_query(query: &str) -> bool {
    BROAD_PATTERNS.iter().any(|p| p.is_match(query))
}

/// Predict which categories the final results must cover.
pub fn predict(query: &str, mode: QueryMode) -> Vec<PolicyCategory> {
    let scores = score_categories(query);

    if is_broad_query(query) {
        return match mode {
            QueryMode::DeepThink | QueryMode::Brainstorm => ALL_CATEGORIES.to_vec(),
            QueryMode::Qa => prioritize(BROAD_POLICY_TOP5.to_vec(), &scores),
        };
    }

    let mut predicted: Vec<PolicyCategory> = scores
        .iter()
        .filter(|(_, score)| **score >= 2.0)
        .map(|(cat, _)| *cat)
        .collect();

    if IMPLEMENTATION_CUE.is_match(query) {
        predicted.extend(IMPLEMENTATION_COMBO);
    }
    if QUALITY_CUE.is_match(query) {
        predicted.extend(QUALITY_COMBO);
    }
    if EQUITY_CUE.is_match(query) {
        predicted.extend(EQUITY_COMBO);
    }
    if STAFFING_CUE.is_match(query) {
        predicted.extend(STAFFING_COMBO);
    }

    predicted.sort();
    predicted.dedup();
    prioritize(predicted, &scores)
}

/// Sort by score descending, then by the fixed priority order.
fn prioritize(
    mut categories: Vec<PolicyCategory>,
    scores: &BTreeMap<PolicyCategory, f32>,
) -> Vec<PolicyCategory> {
    categories.sort_by(|a, b| {
        let sa = scores.get(a).copied().unwrap_or(0.0);
        let sb = scores.get(b).copied().unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.priority_rank().cmp(&b.priority_rank()))
    });
    categories
}

pub(crate) fn count_word_occurrences(text: &str, keyword: &str) -> usize {
    // Word-boundary matching without recompiling per call for the common
    // single-token case.
    let mut count = 0;
    let mut offset = 0;
    let text_bytes = text.as_bytes();
    while let Some(pos) = text[offset..].find(keyword) {
        let start = offset + pos;
        let end = start + keyword.len();
        let boundary_before = start == 0 || !is_word_byte(text_bytes[start - 1]);
        let boundary_after = end >= text.len() || !is_word_byte(text_bytes[end]);
        if boundary_before && boundary_after {
            count += 1;
        }
        offset = start + 1;
    }
    count
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
