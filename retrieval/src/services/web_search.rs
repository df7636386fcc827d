use async_trait::async_trait;
use policyhub_models::RetrievalResult;

/// Optional web backend for the `internet` pseudo-vertical. When no backend
/// is configured the engine records a trace note and the vertical yields an
/// empty list; the query still succeeds.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<RetrievalResult>>;
}
