//! Configuration for the policyhub retrieval engine.
//!
//! Everything is loaded once at process start via `Settings::from_env()`
//! and treated as immutable afterwards. Tests construct `Settings::default()`
//! and override fields directly.

pub mod feature_flags;
pub mod mode_params;

pub use feature_flags::FeatureFlags;
pub use mode_params::ModeParams;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Vector store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Embedding provider settings. `dimension` must match the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "gemini" for the hosted provider, "fallback" for the deterministic
    /// hashed embedder (degraded quality, never fails).
    pub provider: String,
    pub fast_model: String,
    pub deep_model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fallback".to_string(),
            fast_model: "text-embedding-004".to_string(),
            deep_model: "text-embedding-004".to_string(),
            dimension: 768,
        }
    }
}

/// Retrieval settings per mode plus the shared scoring knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub qa_top_k: usize,
    pub qa_rerank_top: usize,
    #[serde(with = "duration_secs")]
    pub qa_timeout: Duration,

    pub deep_top_k: usize,
    pub deep_rerank_top: usize,
    #[serde(with = "duration_secs")]
    pub deep_timeout: Duration,

    pub brainstorm_top_k: usize,
    pub brainstorm_rerank_top: usize,
    #[serde(with = "duration_secs")]
    pub brainstorm_timeout: Duration,

    /// Minimum dense score accepted from the store. 0.0 disables the cut.
    pub score_threshold: f32,
    /// Dense weight in hybrid fusion: fused = alpha*dense + (1-alpha)*bm25.
    pub hybrid_alpha: f32,
    /// Relevance/diversity trade-off for Brainstorm MMR selection.
    pub mmr_lambda: f32,
    /// Weight of the diversity bonus in coverage-enforcer fill passes.
    pub diversity_weight: f32,
    /// Minimum results per predicted category in the mandatory pass.
    pub min_per_category: usize,
    /// Cosine similarity above which Brainstorm treats chunks as duplicates.
    pub near_duplicate_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qa_top_k: 20,
            qa_rerank_top: 10,
            qa_timeout: Duration::from_secs(2),
            deep_top_k: 80,
            deep_rerank_top: 30,
            deep_timeout: Duration::from_secs(10),
            brainstorm_top_k: 60,
            brainstorm_rerank_top: 20,
            brainstorm_timeout: Duration::from_secs(8),
            score_threshold: 0.0,
            hybrid_alpha: 0.7,
            mmr_lambda: 0.5,
            diversity_weight: 0.4,
            min_per_category: 1,
            near_duplicate_threshold: 0.85,
        }
    }
}

/// LLM provider settings for answer synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 4000,
            timeout_secs: 60,
        }
    }
}

/// Cache locations and sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for content-addressed LLM response files.
    pub llm_dir: PathBuf,
    /// Maximum entries held by the in-memory embedding cache.
    pub embedding_budget: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            llm_dir: PathBuf::from("cache/llm_responses"),
            embedding_budget: 10_000,
        }
    }
}

/// Top-level settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub features: FeatureFlags,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    /// Reads a `.env` file when present.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        let mut settings = Self {
            features: FeatureFlags::from_env(),
            ..Self::default()
        };

        if let Ok(url) = std::env::var("QDRANT_URL") {
            settings.qdrant.url = url;
        }
        settings.qdrant.api_key = std::env::var("QDRANT_API_KEY").ok();

        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            settings.embedding.provider = provider;
        }
        if let Some(dim) = env_parse("EMBEDDING_DIMENSION") {
            settings.embedding.dimension = dim;
        }

        if let Some(v) = env_parse("RETRIEVAL_QA_TOP_K") {
            settings.retrieval.qa_top_k = v;
        }
        if let Some(v) = env_parse("RETRIEVAL_DEEP_TOP_K") {
            settings.retrieval.deep_top_k = v;
        }
        if let Some(v) = env_parse("RETRIEVAL_BRAINSTORM_TOP_K") {
            settings.retrieval.brainstorm_top_k = v;
        }
        if let Some(v) = env_parse::<f32>("RETRIEVAL_SCORE_THRESHOLD") {
            settings.retrieval.score_threshold = v;
        }
        if let Some(v) = env_parse::<f32>("RETRIEVAL_MMR_LAMBDA") {
            settings.retrieval.mmr_lambda = v;
        }
        if let Some(v) = env_parse::<u64>("RETRIEVAL_QA_TIMEOUT_SECS") {
            settings.retrieval.qa_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("RETRIEVAL_DEEP_TIMEOUT_SECS") {
            settings.retrieval.deep_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("RETRIEVAL_BRAINSTORM_TIMEOUT_SECS") {
            settings.retrieval.brainstorm_timeout = Duration::from_secs(v);
        }

        if let Ok(model) = std::env::var("LLM_MODEL") {
            settings.llm.model = model;
        }
        if let Some(v) = env_parse("LLM_MAX_TOKENS") {
            settings.llm.max_tokens = v;
        }

        if let Ok(dir) = std::env::var("LLM_CACHE_DIR") {
            settings.cache.llm_dir = PathBuf::from(dir);
        }
        if let Some(v) = env_parse("EMBEDDING_CACHE_BUDGET") {
            settings.cache.embedding_budget = v;
        }

        tracing::info!(
            qdrant_url = %settings.qdrant.url,
            embedding_provider = %settings.embedding.provider,
            "settings loaded"
        );

        settings
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable env override");
            None
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
