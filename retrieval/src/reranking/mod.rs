//! Rescoring stages: the three rerankers, the category-coverage enforcer,
//! and keyword boosting for embedding-light domains.

pub mod bm25_boost;
pub mod brainstorm;
pub mod diversity;
pub mod light;
pub mod policy;

pub use diversity::{coverage_report, enforce, DiversityOutcome};

use crate::query_processing::QueryPlan;
use crate::services::llm::LlmClient;
use policyhub_models::{RerankerKind, RetrievalResult};
use std::sync::Arc;

/// Dispatches to the reranker the plan selected. The inheritance hierarchy
/// of rescoring strategies collapses to one capability: rerank candidates
/// under a plan.
pub struct RerankerSet {
    judge: Option<Arc<dyn LlmClient>>,
    near_duplicate_threshold: f32,
}

impl RerankerSet {
    /// `judge` enables LLM rescoring inside the policy reranker; pass
    /// `None` to keep reranking fully local.
    pub fn new(judge: Option<Arc<dyn LlmClient>>, near_duplicate_threshold: f32) -> Self {
        Self {
            judge,
            near_duplicate_threshold,
        }
    }

    pub async fn rerank(
        &self,
        candidates: Vec<RetrievalResult>,
        plan: &QueryPlan,
    ) -> Vec<RetrievalResult> {
        if candidates.is_empty() {
            return candidates;
        }
        match plan.reranker {
            RerankerKind::Light => light::rerank(candidates, plan, plan.rerank_top),
            RerankerKind::Policy => {
                policy::rerank(candidates, plan, plan.rerank_top, self.judge.as_ref()).await
            }
            RerankerKind::Brainstorm => {
                brainstorm::rerank(candidates, self.near_duplicate_threshold, plan.rerank_top)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_processing::QueryPlanner;
    use policyhub_config::{FeatureFlags, RetrievalConfig};
    use policyhub_models::{ChunkPayload, QueryMode, Vertical};
    use serde_json::Map;

    fn candidate(id: &str, score: f32) -> RetrievalResult {
        RetrievalResult::new(
            id.to_string(),
            format!("doc-{id}"),
            Vertical::Legal,
            "content".to_string(),
            score,
            ChunkPayload(Map::new()),
        )
    }

    #[tokio::test]
    async fn dispatches_by_plan_kind() {
        let set = RerankerSet::new(None, 0.85);
        let planner = QueryPlanner::new(RetrievalConfig::default(), FeatureFlags::default());

        let qa_plan = planner.plan("what is section 12", None, None).unwrap();
        assert_eq!(qa_plan.reranker, RerankerKind::Light);
        let out = set.rerank(vec![candidate("a", 0.9)], &qa_plan).await;
        assert!(out[0].rerank_score.is_some());

        let brainstorm_plan = planner
            .plan("new ideas", Some(QueryMode::Brainstorm), None)
            .unwrap();
        assert_eq!(brainstorm_plan.reranker, RerankerKind::Brainstorm);
        let out = set.rerank(vec![candidate("b", 0.9)], &brainstorm_plan).await;
        assert!(out[0].rerank_score.is_some());
    }

    #[tokio::test]
    async fn empty_candidates_short_circuit() {
        let set = RerankerSet::new(None, 0.85);
        let planner = QueryPlanner::new(RetrievalConfig::default(), FeatureFlags::default());
        let plan = planner.plan("anything at all", None, None).unwrap();
        assert!(set.rerank(Vec::new(), &plan).await.is_empty());
    }
}
