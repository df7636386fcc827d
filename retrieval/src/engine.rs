use crate::answer::AnswerComposer;
use crate::cache::{EmbeddingCache, LlmCache};
use crate::errors::RetrievalError;
use crate::query_processing::{QueryPlan, QueryPlanner};
use crate::reranking::{self, bm25_boost, RerankerSet};
use crate::retrieval_core::{aggregator, SupersessionManager, VerticalRetriever};
use crate::services::embedder::{Embedder, FallbackEmbedder};
use crate::services::llm::{GeminiLlm, LlmClient};
use crate::services::vector_store::{QdrantStore, VectorStore};
use crate::services::web_search::WebSearcher;
use chrono::Utc;
use policyhub_config::Settings;
use policyhub_models::{
    ChatTurn, FormattedResult, QueryInfo, QueryMode, QueryResponse, RetrievalResult, SearchInfo,
    TraceInfo, CacheHits, AnswerPayload,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

const HIGHLIGHT_CHARS: usize = 200;

/// One incoming query with its optional overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Explicit mode string ("qa", "deep_think", "brainstorm"); unknown
    /// values are rejected with `bad_request`.
    pub mode: Option<String>,
    pub use_internet: Option<bool>,
    /// Uploaded-file context, injected into the prompt as non-citable.
    pub external_context: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    /// Caps the number of final results, overriding the mode default.
    pub top_k: Option<usize>,
}

impl QueryRequest {
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// The whole pipeline behind one explicit service container: plan, fan
/// out, merge, rescore, enforce coverage, filter superseded documents,
/// and synthesize the answer. Constructed once at process start; each
/// `query` call owns its state end to end and mutates nothing shared but
/// the caches.
pub struct RetrievalEngine {
    settings: Settings,
    planner: QueryPlanner,
    retriever: VerticalRetriever,
    rerankers: RerankerSet,
    composer: AnswerComposer,
    supersession: SupersessionManager,
    embedder: Arc<dyn Embedder>,
    embedding_cache: EmbeddingCache,
}

impl RetrievalEngine {
    /// Wire the engine from explicit collaborators. The supersession index
    /// is built here by scanning the GO collection; a failing store logs
    /// and leaves the index empty.
    pub async fn new(
        settings: Settings,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Option<Arc<dyn LlmClient>>,
        web: Option<Arc<dyn WebSearcher>>,
    ) -> Result<Self, RetrievalError> {
        if embedder.dimension() != settings.embedding.dimension {
            return Err(RetrievalError::Internal(format!(
                "embedder dimension {} does not match configured {}",
                embedder.dimension(),
                settings.embedding.dimension
            )));
        }

        let supersession = SupersessionManager::build(store.as_ref()).await;

        let judge = if settings.features.llm_judge_rerank {
            llm.clone()
        } else {
            None
        };
        let llm_cache = Arc::new(LlmCache::new(settings.cache.llm_dir.clone()));
        let composer = AnswerComposer::new(
            llm,
            Arc::clone(&llm_cache),
            settings.llm.model.clone(),
            settings.llm.max_tokens,
        );

        Ok(Self {
            planner: QueryPlanner::new(settings.retrieval.clone(), settings.features.clone()),
            retriever: VerticalRetriever::new(store, web, &settings),
            rerankers: RerankerSet::new(judge, settings.retrieval.near_duplicate_threshold),
            composer,
            supersession,
            embedder,
            embedding_cache: EmbeddingCache::new(settings.cache.embedding_budget),
            settings,
        })
    }

    /// Production wiring: Qdrant store, provider-or-fallback embedder, and
    /// the Gemini LLM when credentials are present.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn VectorStore> = Arc::new(QdrantStore::connect(&settings.qdrant)?);
        let embedder: Arc<dyn Embedder> =
            Arc::new(FallbackEmbedder::from_config(&settings.embedding));
        let llm: Option<Arc<dyn LlmClient>> = match GeminiLlm::from_env(&settings.llm) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "llm unavailable, answers will degrade gracefully");
                None
            }
        };
        Ok(Self::new(settings, store, embedder, llm, None).await?)
    }

    /// Execute the full pipeline for one query.
    ///
    /// Validation failures and internal invariant violations are errors;
    /// everything else (failed verticals, missing providers, timeouts)
    /// degrades inside a successful response with notes in `trace.steps`.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, RetrievalError> {
        let started = Instant::now();
        let mut steps: Vec<String> = Vec::new();

        let mode_override = match &request.mode {
            Some(raw) => Some(
                QueryMode::from_str(raw)
                    .map_err(|e| RetrievalError::UnknownMode(e.0))?,
            ),
            None => None,
        };

        let mut plan =
            self.planner
                .plan(&request.query, mode_override, request.use_internet)?;
        if let Some(top_k) = request.top_k {
            plan.rerank_top = top_k;
        }
        steps.push(format!(
            "planned: mode={} verticals={:?} top_k={}",
            plan.mode, plan.verticals, plan.top_k
        ));

        // One embedding per query, shared across all vertical tasks.
        let (query_vector, embedding_cache_hit) = self.embed_query(&plan).await?;
        if embedding_cache_hit {
            steps.push("embedding served from cache".to_string());
        }

        let fan_out = self
            .retriever
            .retrieve(&plan, Arc::new(query_vector))
            .await;
        steps.extend(fan_out.steps);

        let mut candidates = aggregator::aggregate(fan_out.per_vertical, &plan.vertical_weights);

        if plan.mode == QueryMode::Brainstorm && candidates.len() > plan.top_k {
            candidates = aggregator::mmr_select(
                candidates,
                self.settings.retrieval.mmr_lambda,
                plan.top_k,
            );
            steps.push(format!("mmr selected {} candidates", candidates.len()));
        }

        let mut ranked = self.rerankers.rerank(candidates, &plan).await;

        let boosted = bm25_boost::boost(&plan.normalized_query, &mut ranked);
        if boosted > 0 {
            steps.push(format!("bm25 boost applied to {boosted} results"));
        }

        let coverage_report = if plan.predicted_categories.is_empty() {
            None
        } else {
            let outcome = reranking::enforce(
                ranked,
                &plan.predicted_categories,
                plan.rerank_top,
                self.settings.retrieval.min_per_category,
                self.settings.retrieval.diversity_weight,
            );
            ranked = outcome.results;
            steps.push(format!(
                "category coverage {:.0}%",
                outcome.report.coverage_score * 100.0
            ));
            Some(outcome.report)
        };

        let (results, dropped) = self.supersession.apply(ranked, plan.mode);
        if dropped > 0 {
            steps.push(format!("dropped {dropped} superseded documents"));
        }

        let (answer, llm_cache_hit) = self
            .composer
            .compose(
                &plan.original_query,
                &results,
                plan.mode,
                plan.synthesis_style,
                plan.max_context_chunks,
                request.external_context.as_deref(),
                &request.history,
            )
            .await;
        if llm_cache_hit {
            steps.push("answer served from cache".to_string());
        }

        Ok(self.build_response(
            &plan,
            results,
            answer,
            steps,
            coverage_report,
            CacheHits {
                embedding: embedding_cache_hit,
                llm: llm_cache_hit,
            },
            started,
        ))
    }

    async fn embed_query(&self, plan: &QueryPlan) -> Result<(Vec<f32>, bool), RetrievalError> {
        if let Some(cached) = self
            .embedding_cache
            .get(&plan.enhanced_query, plan.embedding_model)
        {
            return Ok((cached, true));
        }

        let vector = self
            .embedder
            .encode(&plan.enhanced_query, plan.embedding_model)
            .await
            .map_err(|e| RetrievalError::Internal(format!("embedding failed: {e}")))?;

        if vector.len() != self.settings.embedding.dimension {
            return Err(RetrievalError::Internal(format!(
                "embedding dimension {} does not match configured {}",
                vector.len(),
                self.settings.embedding.dimension
            )));
        }

        self.embedding_cache
            .put(&plan.enhanced_query, plan.embedding_model, vector.clone());
        Ok((vector, false))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_response(
        &self,
        plan: &QueryPlan,
        results: Vec<RetrievalResult>,
        answer: AnswerPayload,
        steps: Vec<String>,
        coverage_report: Option<policyhub_models::CoverageReport>,
        cache_hits: CacheHits,
        started: Instant,
    ) -> QueryResponse {
        let formatted: Vec<FormattedResult> = results
            .iter()
            .enumerate()
            .map(|(i, result)| FormattedResult {
                rank: i + 1,
                id: result.chunk_id.clone(),
                text: result.content.clone(),
                vertical: result.vertical,
                score: result.effective_score(),
                metadata: format_metadata(result),
                highlights: highlight_snippet(&result.content),
            })
            .collect();

        QueryResponse {
            success: true,
            timestamp: Utc::now(),
            query: QueryInfo {
                original: plan.original_query.clone(),
                mode: plan.mode.as_str().to_string(),
                mode_confidence: plan.mode_confidence,
            },
            search: SearchInfo {
                verticals_searched: plan.verticals.iter().map(|v| v.to_string()).collect(),
                vertical_coverage: aggregator::vertical_coverage(&results),
                total_results: results.len(),
            },
            results: formatted,
            answer,
            trace: TraceInfo {
                plan: serde_json::to_value(plan).unwrap_or(Value::Null),
                steps,
                predicted_categories: plan
                    .predicted_categories
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
                coverage_report,
                cache_hits,
                timing_ms: started.elapsed().as_millis() as u64,
            },
            error: None,
        }
    }
}

fn format_metadata(result: &RetrievalResult) -> Map<String, Value> {
    let payload = &result.payload;
    let mut metadata = Map::new();

    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            metadata.insert(key.to_string(), value);
        }
    };

    put("source", payload.source().map(Value::from));
    put("doc_type", payload.doc_type().map(Value::from));
    put("year", payload.year().map(Value::from));
    put("section", payload.section().map(Value::from));
    put("go_number", payload.go_number().map(Value::from));
    put("case_number", payload.case_number().map(Value::from));
    put("department", payload.department().map(Value::from));
    put("court", payload.court().map(Value::from));
    put("act_name", payload.act_name().map(Value::from));
    put("scheme_name", payload.scheme_name().map(Value::from));
    put(
        "bm25_boost",
        result.bm25_boost.map(|b| Value::from(b as f64)),
    );
    put(
        "superseded_by",
        result.superseded_by.clone().map(Value::from),
    );
    if !result.matched_categories.is_empty() {
        metadata.insert(
            "matched_categories".to_string(),
            Value::Array(
                result
                    .matched_categories
                    .iter()
                    .map(|c| Value::from(c.as_str()))
                    .collect(),
            ),
        );
    }

    metadata
}

/// Short display snippet, broken at a sentence or word edge when one falls
/// late enough.
fn highlight_snippet(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= HIGHLIGHT_CHARS {
        return text.to_string();
    }
    let snippet: String = chars[..HIGHLIGHT_CHARS].iter().collect();
    let floor = (HIGHLIGHT_CHARS as f32 * 0.7) as usize;

    if let Some(period) = snippet.rfind('.') {
        if period > floor {
            return snippet[..=period].to_string();
        }
    }
    if let Some(space) = snippet.rfind(' ') {
        if space > floor {
            return format!("{}...", &snippet[..space]);
        }
    }
    format!("{snippet}...")
}
