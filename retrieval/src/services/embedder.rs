use crate::errors::EmbedError;
use async_trait::async_trait;
use policyhub_config::EmbeddingConfig;
use policyhub_models::EmbeddingModelKind;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Opaque "encode text → fixed-dim unit vector" service.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn encode(&self, text: &str, model: EmbeddingModelKind) -> Result<Vec<f32>, EmbedError>;

    fn dimension(&self) -> usize;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

// ============================================================================
// DETERMINISTIC FALLBACK
// ============================================================================

/// Deterministic hashed embedder: each token hashes to a pseudo-random unit
/// direction, token directions are summed and L2-normalized. Quality is
/// degraded compared to a real model, but shared tokens still pull query
/// and chunk vectors together, and it can never fail.
pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous encoding, useful when seeding test stores.
    pub fn encode_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();

        if tokens.is_empty() {
            self.accumulate_token(&mut vector, text);
        } else {
            for token in &tokens {
                self.accumulate_token(&mut vector, token);
            }
        }

        l2_normalize(&mut vector);
        vector
    }

    fn accumulate_token(&self, vector: &mut [f32], token: &str) {
        let digest = Sha256::digest(token.as_bytes());
        let mut seed = u64::from_le_bytes(digest[..8].try_into().unwrap());
        if seed == 0 {
            seed = 0x9e3779b97f4a7c15;
        }
        for slot in vector.iter_mut() {
            // xorshift64*: cheap, deterministic, well-distributed.
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let unit = (seed >> 11) as f32 / (1u64 << 53) as f32;
            *slot += unit * 2.0 - 1.0;
        }
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    async fn encode(&self, text: &str, _model: EmbeddingModelKind) -> Result<Vec<f32>, EmbedError> {
        Ok(self.encode_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// GEMINI PROVIDER
// ============================================================================

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Hosted embedding provider over the Gemini REST API.
pub struct GeminiEmbedder {
    api_key: String,
    client: reqwest::Client,
    fast_model: String,
    deep_model: String,
    dimension: usize,
}

impl GeminiEmbedder {
    pub fn from_env(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| {
                EmbedError::Unavailable("GEMINI_API_KEY or GOOGLE_API_KEY not set".to_string())
            })?;
        Ok(Self {
            api_key,
            client: reqwest::Client::new(),
            fast_model: config.fast_model.clone(),
            deep_model: config.deep_model.clone(),
            dimension: config.dimension,
        })
    }

    fn model_for(&self, kind: EmbeddingModelKind) -> &str {
        match kind {
            EmbeddingModelKind::Fast => &self.fast_model,
            EmbeddingModelKind::Deep => &self.deep_model,
        }
    }

    fn api_url(&self, model: &str) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:embedContent?key={}",
            model, self.api_key
        )
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn encode(&self, text: &str, model: EmbeddingModelKind) -> Result<Vec<f32>, EmbedError> {
        let model_name = self.model_for(model);
        let payload = serde_json::json!({
            "model": format!("models/{model_name}"),
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(self.api_url(model_name))
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmbedError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(EmbedError::PermissionDenied(status.to_string()));
        }
        if !status.is_success() {
            return Err(EmbedError::Transient(format!("status {status}")));
        }

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Transient(e.to_string()))?;

        let mut values = body.embedding.values;
        if values.len() != self.dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        l2_normalize(&mut values);
        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// FALLBACK WRAPPER
// ============================================================================

/// Wraps a primary provider with the hashed fallback. Provider errors
/// degrade to fallback vectors instead of failing the query; a permission
/// denial disables the provider for the remainder of the process.
pub struct FallbackEmbedder {
    primary: Option<Arc<dyn Embedder>>,
    fallback: HashedEmbedder,
    primary_disabled: AtomicBool,
}

impl FallbackEmbedder {
    pub fn new(primary: Option<Arc<dyn Embedder>>, dimension: usize) -> Self {
        Self {
            primary,
            fallback: HashedEmbedder::new(dimension),
            primary_disabled: AtomicBool::new(false),
        }
    }

    /// Build from config: "gemini" uses the hosted provider when its key is
    /// available, anything else (or a missing key) is fallback-only.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let primary: Option<Arc<dyn Embedder>> = if config.provider == "gemini" {
            match GeminiEmbedder::from_env(config) {
                Ok(embedder) => Some(Arc::new(embedder)),
                Err(e) => {
                    tracing::warn!(error = %e, "embedding provider unavailable, using hashed fallback");
                    None
                }
            }
        } else {
            None
        };
        Self::new(primary, config.dimension)
    }
}

#[async_trait]
impl Embedder for FallbackEmbedder {
    async fn encode(&self, text: &str, model: EmbeddingModelKind) -> Result<Vec<f32>, EmbedError> {
        if let Some(primary) = &self.primary {
            if !self.primary_disabled.load(Ordering::Relaxed) {
                match primary.encode(text, model).await {
                    Ok(vector) => return Ok(vector),
                    Err(EmbedError::PermissionDenied(msg)) => {
                        tracing::warn!(%msg, "embedding provider denied access, disabling for this process");
                        self.primary_disabled.store(true, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "embedding provider failed, using hashed fallback");
                    }
                }
            }
        }
        Ok(self.fallback.encode_sync(text))
    }

    fn dimension(&self) -> usize {
        self.fallback.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashed_embeddings_are_deterministic_unit_vectors() {
        let embedder = HashedEmbedder::new(64);
        let a = embedder.encode("section 12 rte act", EmbeddingModelKind::Fast).await.unwrap();
        let b = embedder.encode("section 12 rte act", EmbeddingModelKind::Deep).await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn shared_tokens_raise_similarity() {
        let embedder = HashedEmbedder::new(128);
        let query = embedder.encode_sync("section 12 admission rte");
        let related = embedder.encode_sync("rte act section 12 mandates free admission for children");
        let unrelated = embedder.encode_sync("quarterly budget expenditure statement irrigation");
        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related content must score higher"
        );
    }

    #[tokio::test]
    async fn empty_text_still_embeds() {
        let embedder = HashedEmbedder::new(32);
        let v = embedder.encode("", EmbeddingModelKind::Fast).await.unwrap();
        assert_eq!(v.len(), 32);
    }

    #[test]
    fn cosine_handles_degenerate_input() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn fallback_embedder_never_fails() {
        let embedder = FallbackEmbedder::new(None, 16);
        let v = embedder.encode("anything", EmbeddingModelKind::Fast).await.unwrap();
        assert_eq!(v.len(), 16);
    }
}
