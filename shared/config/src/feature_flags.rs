use serde::{Deserialize, Serialize};

/// Feature toggles, loaded once at startup and never mutated at request
/// time. Tests construct these directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Fuse dense scores with a BM25 signal per vertical.
    pub hybrid_search: bool,
    /// Boost top-k for comprehensive and multi-vertical queries.
    pub dynamic_top_k: bool,
    /// Intent-signal-aware classifier path. When off, classification falls
    /// back to keyword scoring and shortcut rules only.
    pub use_intent_classifier_v2: bool,
    /// Intent-signal-aware router path. When off, routing skips signal
    /// boosts and length heuristics.
    pub use_query_router_v2: bool,
    /// Let the policy reranker rescore top candidates with an LLM judge.
    pub llm_judge_rerank: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            hybrid_search: true,
            dynamic_top_k: true,
            use_intent_classifier_v2: true,
            use_query_router_v2: true,
            llm_judge_rerank: false,
        }
    }
}

impl FeatureFlags {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hybrid_search: env_flag("FEATURE_HYBRID_SEARCH", defaults.hybrid_search),
            dynamic_top_k: env_flag("FEATURE_DYNAMIC_TOP_K", defaults.dynamic_top_k),
            use_intent_classifier_v2: env_flag(
                "FEATURE_INTENT_CLASSIFIER_V2",
                defaults.use_intent_classifier_v2,
            ),
            use_query_router_v2: env_flag("FEATURE_QUERY_ROUTER_V2", defaults.use_query_router_v2),
            llm_judge_rerank: env_flag("FEATURE_LLM_JUDGE_RERANK", defaults.llm_judge_rerank),
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_v2_paths() {
        let flags = FeatureFlags::default();
        assert!(flags.use_intent_classifier_v2);
        assert!(flags.use_query_router_v2);
        assert!(flags.hybrid_search);
        assert!(!flags.llm_judge_rerank);
    }
}
