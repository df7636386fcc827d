use crate::errors::RetrievalError;
use crate::query_processing::category_predictor::{self, PolicyCategory};
use crate::query_processing::entity_extractor::{self, ExtractedEntities};
use crate::query_processing::intent_classifier::{self, IntentSignals};
use crate::query_processing::query_enhancer;
use crate::query_processing::query_router;
use crate::query_processing::normalizer;
use policyhub_config::{FeatureFlags, ModeParams, RetrievalConfig};
use policyhub_models::{
    EmbeddingModelKind, QueryMode, RerankerKind, SynthesisStyle, Vertical,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Query substrings that indicate the user wants fresh, possibly
/// post-corpus information.
const RECENCY_TRIGGERS: &[&str] = &[
    "latest", "recent", "current", "news", "this year", "2024", "2025", "2026",
];

const COMPREHENSIVE_MULTIPLIER: f32 = 1.5;
const MULTI_VERTICAL_MULTIPLIER: f32 = 1.2;

/// The deterministic execution blueprint for one query. Immutable after
/// creation; discarded with the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub original_query: String,
    pub normalized_query: String,
    pub enhanced_query: String,

    pub mode: QueryMode,
    pub mode_confidence: f32,

    pub verticals: Vec<Vertical>,
    pub vertical_weights: BTreeMap<Vertical, f32>,

    pub entities: ExtractedEntities,
    /// Logical filter fields; mapped to physical payload fields per
    /// vertical by the retriever.
    pub filters: BTreeMap<String, Vec<String>>,

    pub top_k: usize,
    pub rerank_top: usize,
    pub max_context_chunks: usize,

    pub embedding_model: EmbeddingModelKind,
    pub reranker: RerankerKind,
    pub synthesis_style: SynthesisStyle,
    pub include_citations: bool,

    #[serde(with = "serde_duration")]
    pub timeout: Duration,

    pub predicted_categories: Vec<PolicyCategory>,
    pub use_internet: bool,

    pub intent_signals: IntentSignals,
}

/// Composes normalization, entity extraction, intent classification,
/// category prediction, and routing into a [`QueryPlan`].
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    retrieval: RetrievalConfig,
    features: FeatureFlags,
}

impl QueryPlanner {
    pub fn new(retrieval: RetrievalConfig, features: FeatureFlags) -> Self {
        Self {
            retrieval,
            features,
        }
    }

    /// Build the execution plan.
    ///
    /// `mode_override` pins the mode with confidence 1.0; validation of the
    /// mode string happens before this call. `use_internet_override` forces
    /// web search on regardless of recency triggers.
    pub fn plan(
        &self,
        query: &str,
        mode_override: Option<QueryMode>,
        use_internet_override: Option<bool>,
    ) -> Result<QueryPlan, RetrievalError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(RetrievalError::InvalidQuery("query is empty".to_string()));
        }

        let normalized = normalizer::normalize(trimmed);
        if normalized.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query contains no searchable text".to_string(),
            ));
        }

        let entities = entity_extractor::extract(&normalized);

        let classification = match mode_override {
            Some(mode) => {
                intent_classifier::classification_for_override(mode, &normalized, &entities)
            }
            None => intent_classifier::classify(&normalized, &entities)
                .map_err(|e| RetrievalError::InvalidQuery(e.to_string()))?,
        };
        let mode = classification.mode;
        let params = ModeParams::for_mode(mode, &self.retrieval);

        // Enhancement happens before routing so router patterns see the
        // appended entity and context terms.
        let enhanced =
            query_enhancer::enhance(&normalized, &entities, mode, params.expand_synonyms);

        let signals = if self.features.use_intent_classifier_v2 {
            Some(classification.signals)
        } else {
            None
        };
        let routed = query_router::route(
            &enhanced,
            &entities,
            mode,
            signals.as_ref(),
            self.features.use_query_router_v2,
        );

        let use_internet = self.decide_internet(
            use_internet_override,
            &normalized,
            mode,
        );

        // DeepThink searches the whole corpus: every vertical, ordered by
        // router evidence, weighted by vertical priority. The other modes
        // take the router's top selection as-is.
        let (mut verticals, mut vertical_weights) = if mode == QueryMode::DeepThink {
            deep_think_selection(&routed.scores)
        } else {
            (routed.verticals, routed.weights)
        };
        if use_internet {
            verticals.push(Vertical::Internet);
            vertical_weights.insert(Vertical::Internet, 0.5);
        }

        let top_k = self.dynamic_top_k(params.top_k, &classification.signals, verticals.len());
        let filters = query_enhancer::build_filters(&entities);
        let predicted_categories = category_predictor::predict(&normalized, mode);

        tracing::info!(
            mode = %mode,
            confidence = classification.confidence,
            verticals = ?verticals,
            top_k,
            use_internet,
            "query plan built"
        );

        Ok(QueryPlan {
            original_query: trimmed.to_string(),
            normalized_query: normalized,
            enhanced_query: enhanced,
            mode,
            mode_confidence: classification.confidence,
            verticals,
            vertical_weights,
            entities,
            filters,
            top_k,
            rerank_top: params.rerank_top,
            max_context_chunks: params.max_context_chunks,
            embedding_model: params.embedding_model,
            reranker: params.reranker,
            synthesis_style: params.synthesis_style,
            include_citations: params.include_citations,
            timeout: params.timeout,
            predicted_categories,
            use_internet,
            intent_signals: classification.signals,
        })
    }

    fn decide_internet(
        &self,
        override_flag: Option<bool>,
        normalized: &str,
        mode: QueryMode,
    ) -> bool {
        if override_flag == Some(true) {
            return true;
        }
        let triggered = RECENCY_TRIGGERS.iter().any(|t| normalized.contains(t));
        if !triggered {
            return false;
        }
        // A specific-entity lookup wants the corpus answer, not the web.
        let specific_qa =
            mode == QueryMode::Qa && intent_classifier::has_specific_entity(normalized);
        !specific_qa
    }

    fn dynamic_top_k(&self, base: usize, signals: &IntentSignals, vertical_count: usize) -> usize {
        if !self.features.dynamic_top_k {
            return base;
        }
        let mut top_k = base;
        if signals.comprehensive_score > 0.5 {
            top_k = (top_k as f32 * COMPREHENSIVE_MULTIPLIER) as usize;
            tracing::debug!(base, top_k, "boosting top-k for comprehensive query");
        }
        if vertical_count > 3 {
            top_k = (top_k as f32 * MULTI_VERTICAL_MULTIPLIER) as usize;
        }
        top_k
    }
}

/// All five corpus verticals, ordered by router score (priority as the
/// tiebreak), weighted by inverse priority and normalized to sum to 1.0.
/// Legal evidence anchors deep policy analysis, so it keeps the largest
/// share regardless of surface keyword matches.
fn deep_think_selection(
    scores: &BTreeMap<Vertical, f32>,
) -> (Vec<Vertical>, BTreeMap<Vertical, f32>) {
    let mut verticals: Vec<Vertical> = policyhub_models::CORPUS_VERTICALS.to_vec();
    verticals.sort_by(|a, b| {
        let sa = scores.get(a).copied().unwrap_or(0.0);
        let sb = scores.get(b).copied().unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.priority().cmp(&b.priority()))
    });

    let total: f32 = verticals.iter().map(|v| 1.0 / v.priority() as f32).sum();
    let weights = verticals
        .iter()
        .map(|v| (*v, (1.0 / v.priority() as f32) / total))
        .collect();
    (verticals, weights)
}

pub(crate) mod serde_duration {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> QueryPlanner {
        QueryPlanner::new(RetrievalConfig::default(), FeatureFlags::default())
    }

    #[test]
    fn empty_query_fails_fast() {
        let err = planner().plan("   ", None, None).unwrap_err();
        assert_eq!(err.kind(), "bad_request");
    }

    #[test]
    fn section_lookup_plans_qa_with_filters() {
        let plan = planner()
            .plan("What is Section 12 of RTE Act?", None, None)
            .unwrap();
        assert_eq!(plan.mode, QueryMode::Qa);
        assert!(plan.mode_confidence >= 0.85);
        assert_eq!(plan.verticals[0], Vertical::Legal);
        assert_eq!(plan.filters["sections"], vec!["12"]);
        assert_eq!(plan.reranker, RerankerKind::Light);
        assert!(!plan.use_internet);
    }

    #[test]
    fn bare_entity_query_still_plans_fully() {
        let plan = planner().plan("Section 12", None, None).unwrap();
        assert_eq!(plan.mode, QueryMode::Qa);
        assert_eq!(plan.verticals[0], Vertical::Legal);
        assert_eq!(plan.filters["sections"], vec!["12"]);
    }

    #[test]
    fn mode_override_pins_confidence() {
        let plan = planner()
            .plan("teacher training", Some(QueryMode::Brainstorm), None)
            .unwrap();
        assert_eq!(plan.mode, QueryMode::Brainstorm);
        assert_eq!(plan.mode_confidence, 1.0);
        assert_eq!(plan.synthesis_style, SynthesisStyle::Exploratory);
        assert!(plan.enhanced_query.contains("global best practices"));
    }

    #[test]
    fn recency_trigger_enables_internet() {
        let plan = planner()
            .plan("latest education policy 2025", None, None)
            .unwrap();
        assert!(plan.use_internet);
        assert!(plan.verticals.contains(&Vertical::Internet));
    }

    #[test]
    fn specific_entity_lookup_suppresses_internet() {
        let plan = planner()
            .plan("latest amendment to section 12", None, None)
            .unwrap();
        assert_eq!(plan.mode, QueryMode::Qa);
        assert!(!plan.use_internet);
    }

    #[test]
    fn comprehensive_query_boosts_top_k() {
        let plan = planner()
            .plan(
                "Analyze the complete teacher recruitment and posting policy framework",
                Some(QueryMode::DeepThink),
                None,
            )
            .unwrap();
        let base = RetrievalConfig::default().deep_top_k;
        assert!(plan.top_k > base);
    }

    #[test]
    fn dynamic_top_k_respects_flag() {
        let features = FeatureFlags {
            dynamic_top_k: false,
            ..FeatureFlags::default()
        };
        let planner = QueryPlanner::new(RetrievalConfig::default(), features);
        let plan = planner
            .plan(
                "Analyze the complete teacher recruitment and posting policy framework",
                Some(QueryMode::DeepThink),
                None,
            )
            .unwrap();
        assert_eq!(plan.top_k, RetrievalConfig::default().deep_top_k);
    }

    #[test]
    fn deep_think_searches_every_corpus_vertical() {
        let plan = planner()
            .plan(
                "Analyze the complete teacher recruitment and posting policy framework",
                Some(QueryMode::DeepThink),
                None,
            )
            .unwrap();
        assert_eq!(plan.verticals.len(), 5);
        let total: f32 = plan.vertical_weights.values().sum();
        assert!((total - 1.0).abs() < 1e-5);
        // Legal keeps the largest aggregation share.
        let legal = plan.vertical_weights[&Vertical::Legal];
        for (vertical, weight) in &plan.vertical_weights {
            if *vertical != Vertical::Legal {
                assert!(legal >= *weight);
            }
        }
    }

    #[test]
    fn weights_cover_every_routed_vertical() {
        let plan = planner()
            .plan("nadu nedu infrastructure development", None, None)
            .unwrap();
        for vertical in &plan.verticals {
            assert!(plan.vertical_weights.contains_key(vertical));
        }
    }

    #[test]
    fn plan_serializes_for_the_trace() {
        let plan = planner().plan("what is section 12", None, None).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["mode"], "qa");
        assert!(value["timeout"].as_f64().unwrap() > 0.0);
    }
}
