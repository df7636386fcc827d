use crate::query_processing::QueryPlan;
use crate::reranking::light;
use crate::services::llm::LlmClient;
use once_cell::sync::Lazy;
use policyhub_models::{sort_by_score_desc, RetrievalResult, Vertical};
use regex::Regex;
use std::sync::Arc;

/// Weight of the judge's opinion when LLM rescoring is enabled.
const JUDGE_WEIGHT: f32 = 0.3;
const JUDGE_TEMPERATURE: f32 = 0.0;
const JUDGE_MAX_TOKENS: u32 = 512;
const JUDGE_SNIPPET_CHARS: usize = 300;

static JUDGE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(\d+)\s*[:.]\s*(\d+)").unwrap());

/// Policy reranking: the light rules plus a vertical-priority multiplier
/// (legal outranks administrative outranks judicial outranks data outranks
/// schemes) and optional LLM-judge rescoring over the widest candidates.
pub async fn rerank(
    mut candidates: Vec<RetrievalResult>,
    plan: &QueryPlan,
    top: usize,
    judge: Option<&Arc<dyn LlmClient>>,
) -> Vec<RetrievalResult> {
    for candidate in candidates.iter_mut() {
        let boost = light::entity_boost(&candidate.content, &plan.filters)
            + light::cited_ref_boost(&candidate.content);
        let priority_multiplier = vertical_multiplier(candidate.vertical);
        candidate.rerank_score = Some(candidate.score * (1.0 + boost) * priority_multiplier);
    }
    sort_by_score_desc(&mut candidates);

    if let Some(judge) = judge {
        let window = (2 * top).min(candidates.len());
        judge_rescore(&mut candidates[..window], plan, judge).await;
        sort_by_score_desc(&mut candidates);
    }

    candidates.truncate(top);
    candidates
}

/// Monotonically decreasing in vertical priority: 1.25 - 0.05 * priority.
fn vertical_multiplier(vertical: Vertical) -> f32 {
    1.25 - 0.05 * vertical.priority() as f32
}

/// Ask the LLM to rate each candidate 0-10 and blend the rating into the
/// rerank score. Any failure leaves the heuristic scores untouched.
async fn judge_rescore(
    candidates: &mut [RetrievalResult],
    plan: &QueryPlan,
    judge: &Arc<dyn LlmClient>,
) {
    if candidates.is_empty() {
        return;
    }

    let mut prompt = format!(
        "Rate how relevant each document is to the query on a 0-10 scale.\n\
         Respond with one line per document, formatted as `<number>: <rating>`.\n\n\
         Query: {}\n\n",
        plan.normalized_query
    );
    for (i, candidate) in candidates.iter().enumerate() {
        let snippet: String = candidate.content.chars().take(JUDGE_SNIPPET_CHARS).collect();
        prompt.push_str(&format!("{}. {}\n", i + 1, snippet));
    }

    let response = match judge.generate(&prompt, JUDGE_TEMPERATURE, JUDGE_MAX_TOKENS).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "llm judge rescoring failed, keeping heuristic order");
            return;
        }
    };

    for caps in JUDGE_LINE.captures_iter(&response) {
        let index: usize = caps[1].parse().unwrap_or(0);
        let rating: f32 = caps[2].parse().unwrap_or(0.0);
        if index == 0 || index > candidates.len() {
            continue;
        }
        let candidate = &mut candidates[index - 1];
        let heuristic = candidate.effective_score();
        let blended =
            (1.0 - JUDGE_WEIGHT) * heuristic + JUDGE_WEIGHT * (rating / 10.0).clamp(0.0, 1.0);
        candidate.rerank_score = Some(blended);
    }
}
