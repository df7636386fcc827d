use crate::RetrievalConfig;
use policyhub_models::{EmbeddingModelKind, QueryMode, RerankerKind, SynthesisStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-mode execution parameters resolved from [`RetrievalConfig`].
///
/// QA is fast and precise, DeepThink is comprehensive, Brainstorm trades
/// precision for diversity. The planner copies these into the query plan;
/// nothing reads them after planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeParams {
    pub mode: QueryMode,
    pub top_k: usize,
    pub rerank_top: usize,
    pub embedding_model: EmbeddingModelKind,
    pub reranker: RerankerKind,
    pub synthesis_style: SynthesisStyle,
    pub include_citations: bool,
    pub max_context_chunks: usize,
    pub expand_synonyms: bool,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl ModeParams {
    pub fn for_mode(mode: QueryMode, retrieval: &RetrievalConfig) -> Self {
        match mode {
            QueryMode::Qa => Self {
                mode,
                top_k: retrieval.qa_top_k,
                rerank_top: retrieval.qa_rerank_top,
                embedding_model: EmbeddingModelKind::Fast,
                reranker: RerankerKind::Light,
                synthesis_style: SynthesisStyle::Concise,
                include_citations: true,
                max_context_chunks: 5,
                expand_synonyms: false,
                timeout: retrieval.qa_timeout,
            },
            QueryMode::DeepThink => Self {
                mode,
                top_k: retrieval.deep_top_k,
                rerank_top: retrieval.deep_rerank_top,
                embedding_model: EmbeddingModelKind::Deep,
                reranker: RerankerKind::Policy,
                synthesis_style: SynthesisStyle::DeepPolicy,
                include_citations: true,
                max_context_chunks: 20,
                expand_synonyms: true,
                timeout: retrieval.deep_timeout,
            },
            QueryMode::Brainstorm => Self {
                mode,
                top_k: retrieval.brainstorm_top_k,
                rerank_top: retrieval.brainstorm_rerank_top,
                embedding_model: EmbeddingModelKind::Deep,
                reranker: RerankerKind::Brainstorm,
                synthesis_style: SynthesisStyle::Exploratory,
                include_citations: false,
                max_context_chunks: 15,
                expand_synonyms: true,
                timeout: retrieval.brainstorm_timeout,
            },
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
