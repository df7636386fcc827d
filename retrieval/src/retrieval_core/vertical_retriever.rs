use crate::query_processing::normalizer;
use crate::query_processing::QueryPlan;
use crate::retrieval_core::{bm25, field_mappings};
use crate::services::vector_store::{FilterSpec, StoreHit, VectorStore};
use crate::services::web_search::WebSearcher;
use policyhub_config::Settings;
use policyhub_models::{ChunkPayload, QueryMode, RetrievalResult, Vertical};
use std::sync::Arc;
use tokio::time::timeout;

/// Fan-out results plus the trace notes describing how each vertical fared.
pub struct FanOutOutcome {
    pub per_vertical: Vec<(Vertical, Vec<RetrievalResult>)>,
    pub steps: Vec<String>,
}

/// Executes dense search across the plan's verticals in parallel.
///
/// Every vertical runs as its own task under the plan timeout; a slow or
/// failing vertical yields an empty list and a trace note without
/// disturbing its siblings.
pub struct VerticalRetriever {
    store: Arc<dyn VectorStore>,
    web: Option<Arc<dyn WebSearcher>>,
    score_threshold: f32,
    hybrid_alpha: f32,
    hybrid_enabled: bool,
}

impl VerticalRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        web: Option<Arc<dyn WebSearcher>>,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            web,
            score_threshold: settings.retrieval.score_threshold,
            hybrid_alpha: settings.retrieval.hybrid_alpha,
            hybrid_enabled: settings.features.hybrid_search,
        }
    }

    /// The query vector is encoded exactly once per query and shared across
    /// vertical tasks.
    pub async fn retrieve(&self, plan: &QueryPlan, query_vector: Arc<Vec<f32>>) -> FanOutOutcome {
        let query_terms: Arc<Vec<String>> = Arc::new(
            normalizer::keyword_tokens(&plan.enhanced_query),
        );

        let mut handles = Vec::new();

        for &vertical in &plan.verticals {
            if vertical == Vertical::Internet {
                handles.push(self.spawn_internet_task(plan));
                continue;
            }
            handles.push(self.spawn_vertical_task(plan, vertical, &query_vector, &query_terms));
        }

        let mut per_vertical = Vec::new();
        let mut steps = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((vertical, results, step)) => {
                    steps.push(step);
                    per_vertical.push((vertical, results));
                }
                Err(e) => {
                    tracing::error!(error = %e, "vertical task panicked");
                    steps.push(format!("vertical task failed: {e}"));
                }
            }
        }

        FanOutOutcome {
            per_vertical,
            steps,
        }
    }

    fn spawn_vertical_task(
        &self,
        plan: &QueryPlan,
        vertical: Vertical,
        query_vector: &Arc<Vec<f32>>,
        query_terms: &Arc<Vec<String>>,
    ) -> tokio::task::JoinHandle<(Vertical, Vec<RetrievalResult>, String)> {
        let store = Arc::clone(&self.store);
        let vector = Arc::clone(query_vector);
        let terms = Arc::clone(query_terms);
        let filter = field_mappings::build_filter_spec(&plan.filters, vertical);
        let top_k = plan.top_k;
        let deadline = plan.timeout;
        let mode = plan.mode;
        let threshold = self.score_threshold;
        let alpha = self.hybrid_alpha;
        let hybrid = self.hybrid_enabled;

        tokio::spawn(async move {
            let collection = match vertical.collection() {
                Some(name) => name,
                None => return (vertical, Vec::new(), format!("{vertical}: no collection")),
            };

            if top_k == 0 {
                return (vertical, Vec::new(), format!("{vertical}: top_k is 0"));
            }

            let search = search_with_retry(
                store.as_ref(),
                collection,
                &vector,
                top_k,
                threshold,
                filter.as_ref(),
                mode,
            );

            match timeout(deadline, search).await {
                Ok(Ok(hits)) => {
                    let mut results = hits_to_results(hits, vertical);
                    if hybrid && !results.is_empty() {
                        fuse_with_keywords(&mut results, &terms, alpha);
                    }
                    let step = format!("{vertical}: {} results", results.len());
                    (vertical, results, step)
                }
                Ok(Err(e)) => {
                    tracing::warn!(%vertical, error = %e, "vertical search failed");
                    (vertical, Vec::new(), format!("{vertical}: store error, returning empty"))
                }
                Err(_) => {
                    tracing::warn!(%vertical, ?deadline, "vertical search deadline fired");
                    (
                        vertical,
                        Vec::new(),
                        format!("{vertical}: deadline after {deadline:?}, returning empty"),
                    )
                }
            }
        })
    }

    fn spawn_internet_task(
        &self,
        plan: &QueryPlan,
    ) -> tokio::task::JoinHandle<(Vertical, Vec<RetrievalResult>, String)> {
        let web = self.web.clone();
        let query = plan.normalized_query.clone();
        let top_k = plan.top_k.min(10);
        let deadline = plan.timeout;

        tokio::spawn(async move {
            let Some(web) = web else {
                return (
                    Vertical::Internet,
                    Vec::new(),
                    "internet: backend not configured, returning empty".to_string(),
                );
            };
            match timeout(deadline, web.search(&query, top_k)).await {
                Ok(Ok(results)) => {
                    let step = format!("internet: {} results", results.len());
                    (Vertical::Internet, results, step)
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "web search failed");
                    (
                        Vertical::Internet,
                        Vec::new(),
                        "internet: search failed, returning empty".to_string(),
                    )
                }
                Err(_) => (
                    Vertical::Internet,
                    Vec::new(),
                    format!("internet: deadline after {deadline:?}, returning empty"),
                ),
            }
        })
    }
}

/// Transient store failures get one retry in DeepThink and none in QA or
/// Brainstorm, whose deadlines are too tight to spend on a second attempt.
async fn search_with_retry(
    store: &dyn VectorStore,
    collection: &str,
    vector: &[f32],
    top_k: usize,
    threshold: f32,
    filter: Option<&FilterSpec>,
    mode: QueryMode,
) -> Result<Vec<StoreHit>, crate::errors::StoreError> {
    match store.search(collection, vector, top_k, threshold, filter).await {
        Ok(hits) => Ok(hits),
        Err(first_error) => {
            if mode != QueryMode::DeepThink {
                return Err(first_error);
            }
            tracing::debug!(collection, "retrying vertical search once");
            store.search(collection, vector, top_k, threshold, filter).await
        }
    }
}

fn hits_to_results(hits: Vec<StoreHit>, vertical: Vertical) -> Vec<RetrievalResult> {
    hits.into_iter()
        .filter_map(|hit| {
            let payload = ChunkPayload::new(hit.payload);
            let content = payload.content()?;
            if content.is_empty() {
                return None;
            }
            let chunk_id = payload.chunk_id().unwrap_or_else(|| hit.id.clone());
            let doc_id = payload.doc_id().unwrap_or_else(|| chunk_id.clone());
            let mut result = RetrievalResult::new(
                chunk_id,
                doc_id,
                vertical,
                content,
                hit.score.max(0.0),
                payload,
            );
            result.vector = hit.vector;
            Some(result)
        })
        .collect()
}

/// Hybrid fusion: fused = alpha * dense + (1 - alpha) * normalized BM25
/// over the returned chunk contents.
fn fuse_with_keywords(results: &mut [RetrievalResult], query_terms: &[String], alpha: f32) {
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    let keyword_scores = bm25::normalized_scores(query_terms, &contents);
    for (result, keyword) in results.iter_mut().zip(keyword_scores) {
        result.score = alpha * result.score + (1.0 - alpha) * keyword;
    }
    policyhub_models::sort_by_score_desc(results);
}
