use crate::chunk::ChunkPayload;
use crate::vertical::Vertical;
use serde::{Deserialize, Serialize};

/// A single retrieved chunk flowing through the pipeline.
///
/// `score` is the working score and is rewritten at each stage (weighting,
/// fusion, boosting); `dense_score` keeps the store-reported similarity for
/// inspection. Rerankers record their output in `rerank_score` so the final
/// envelope can distinguish the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub doc_id: String,
    pub vertical: Vertical,
    pub content: String,
    pub score: f32,
    pub dense_score: f32,
    pub payload: ChunkPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bm25_boost: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub matched_categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_source: Option<String>,
    /// Set by the supersession filter in DeepThink mode, where superseded
    /// documents are downranked but kept for historical analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
}

impl RetrievalResult {
    pub fn new(
        chunk_id: String,
        doc_id: String,
        vertical: Vertical,
        content: String,
        score: f32,
        payload: ChunkPayload,
    ) -> Self {
        Self {
            chunk_id,
            doc_id,
            vertical,
            content,
            score,
            dense_score: score,
            payload,
            vector: None,
            rerank_score: None,
            bm25_boost: None,
            matched_categories: Vec::new(),
            rewrite_source: None,
            superseded_by: None,
        }
    }

    /// The score the next pipeline stage should rank by.
    pub fn effective_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.score)
    }
}

/// Sort results by effective score, descending, with chunk id as the
/// tiebreak so equal-scored runs order identically across executions.
pub fn sort_by_score_desc(results: &mut [RetrievalResult]) {
    results.sort_by(|a, b| {
        b.effective_score()
            .partial_cmp(&a.effective_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}
