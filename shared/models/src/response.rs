use crate::vertical::Vertical;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One turn of prior conversation, injected into the synthesis prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Query echo in the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfo {
    pub original: String,
    pub mode: String,
    pub mode_confidence: f32,
}

/// Search summary in the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchInfo {
    pub verticals_searched: Vec<String>,
    pub vertical_coverage: BTreeMap<String, usize>,
    pub total_results: usize,
}

/// A result formatted for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedResult {
    pub rank: usize,
    pub id: String,
    pub text: String,
    pub vertical: Vertical,
    pub score: f32,
    pub metadata: Map<String, Value>,
    pub highlights: String,
}

/// One bibliography entry, numbered to match bracketed citations in the
/// answer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BibliographyEntry {
    pub number: usize,
    /// Human-readable citation line, formatted per vertical.
    pub display: String,
    pub vertical: Vertical,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub go_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Synthesized answer with citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub text: String,
    pub citations: Vec<usize>,
    pub bibliography: Vec<BibliographyEntry>,
    pub confidence: f32,
}

impl AnswerPayload {
    pub fn empty(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
            bibliography: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Coverage of one predicted category in the final result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCoverage {
    pub result_count: usize,
    pub covered: bool,
}

/// Report on how well the final results cover the predicted categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub predicted_categories: Vec<String>,
    pub total_results: usize,
    pub category_coverage: BTreeMap<String, CategoryCoverage>,
    pub missing_categories: Vec<String>,
    pub coverage_score: f32,
}

/// Which process-wide caches served this query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheHits {
    pub embedding: bool,
    pub llm: bool,
}

/// Execution trace returned alongside the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceInfo {
    /// Serialized query plan, for debugging.
    pub plan: Value,
    pub steps: Vec<String>,
    pub predicted_categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_report: Option<CoverageReport>,
    pub cache_hits: CacheHits,
    pub timing_ms: u64,
}

/// The single struct the core returns to the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub query: QueryInfo,
    pub search: SearchInfo,
    pub results: Vec<FormattedResult>,
    pub answer: AnswerPayload,
    pub trace: TraceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
