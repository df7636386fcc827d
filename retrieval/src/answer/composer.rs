use crate::answer::citations;
use crate::cache::LlmCache;
use crate::errors::LlmError;
use crate::services::llm::LlmClient;
use once_cell::sync::Lazy;
use policyhub_models::{
    AnswerPayload, BibliographyEntry, ChatRole, ChatTurn, QueryMode, RetrievalResult,
    SynthesisStyle,
};
use regex::Regex;
use std::sync::Arc;

pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find relevant information to answer your query.";
pub const GENERATION_FAILED_ANSWER: &str = "No answer could be generated.";

const CONTEXT_BODY_CHARS: usize = 800;
const HISTORY_TURN_LIMIT: usize = 10;

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// Synthesizes the final answer from the ranked chunks, with mandatory
/// bracketed citations and a vertical-formatted bibliography.
pub struct AnswerComposer {
    llm: Option<Arc<dyn LlmClient>>,
    cache: Arc<LlmCache>,
    model: String,
    max_tokens: u32,
}

impl AnswerComposer {
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        cache: Arc<LlmCache>,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            cache,
            model,
            max_tokens,
        }
    }

    /// Compose the answer. Returns the payload and whether the LLM cache
    /// served it. Bibliography numbers are assigned here, after final
    /// truncation, so they are stable for a given (query, plan, store
    /// snapshot).
    pub async fn compose(
        &self,
        query: &str,
        results: &[RetrievalResult],
        mode: QueryMode,
        style: SynthesisStyle,
        max_context_chunks: usize,
        external_context: Option<&str>,
        history: &[ChatTurn],
    ) -> (AnswerPayload, bool) {
        let context_chunks = &results[..results.len().min(max_context_chunks)];

        if context_chunks.is_empty() && external_context.is_none() {
            return (AnswerPayload::empty(NO_RESULTS_ANSWER), false);
        }

        let bibliography: Vec<BibliographyEntry> = context_chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| citations::bibliography_entry(chunk, i + 1))
            .collect();

        let context = format_context(context_chunks);
        let prompt = build_prompt(query, &context, style, external_context, history);
        let temperature = match mode {
            QueryMode::Qa | QueryMode::DeepThink => 0.1,
            QueryMode::Brainstorm => 0.4,
        };

        if let Some(cached) = self.cache.get("answer", &self.model, &prompt) {
            let payload = self.finish(cached, context_chunks.len(), bibliography);
            return (payload, true);
        }

        let Some(llm) = &self.llm else {
            tracing::warn!("no llm configured, returning graceful no-answer");
            return (self.failed(bibliography), false);
        };

        let generated = match llm.generate(&prompt, temperature, self.max_tokens).await {
            Ok(text) => text,
            Err(LlmError::Transient(first)) if mode == QueryMode::DeepThink => {
                tracing::warn!(error = %first, "llm call failed, retrying once");
                match llm.generate(&prompt, temperature, self.max_tokens).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "llm retry failed");
                        return (self.failed(bibliography), false);
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "answer generation failed");
                return (self.failed(bibliography), false);
            }
        };

        self.cache.put("answer", &self.model, &prompt, &generated);
        (self.finish(generated, context_chunks.len(), bibliography), false)
    }

    fn finish(
        &self,
        text: String,
        context_count: usize,
        bibliography: Vec<BibliographyEntry>,
    ) -> AnswerPayload {
        let text = strip_out_of_range_citations(&text, context_count);
        let citations = extract_citations(&text);
        let confidence = estimate_confidence(&text, &citations);
        AnswerPayload {
            text,
            citations,
            bibliography,
            confidence,
        }
    }

    fn failed(&self, bibliography: Vec<BibliographyEntry>) -> AnswerPayload {
        AnswerPayload {
            text: GENERATION_FAILED_ANSWER.to_string(),
            citations: Vec::new(),
            bibliography,
            confidence: 0.0,
        }
    }
}

/// Context blocks: one numbered header per chunk, body truncated. The GO
/// number or section is surfaced in the header so the model can name it.
fn format_context(chunks: &[RetrievalResult]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let payload = &chunk.payload;
        let label = payload
            .go_number()
            .map(|n| format!("G.O.MS.No.{n}"))
            .or_else(|| payload.section().map(|s| format!("Section {s}")))
            .or_else(|| payload.source())
            .unwrap_or_else(|| chunk.chunk_id.clone());

        let mut header = format!("Doc {}: {} ({})", i + 1, label, chunk.vertical);
        if let Some(year) = payload.year() {
            header.push_str(&format!(" - Year: {year}"));
        }

        let body: String = chunk.content.chars().take(CONTEXT_BODY_CHARS).collect();
        let ellipsis = if chunk.content.chars().count() > CONTEXT_BODY_CHARS {
            "..."
        } else {
            ""
        };
        out.push_str(&format!("{header}\nContent: {body}{ellipsis}\n\n"));
    }
    out
}

fn build_prompt(
    query: &str,
    context: &str,
    style: SynthesisStyle,
    external_context: Option<&str>,
    history: &[ChatTurn],
) -> String {
    let mut context_section = context.to_string();
    if let Some(external) = external_context {
        // Uploaded files are deliberately unnumbered: they are context the
        // model may use but cannot cite.
        context_section.push_str(&format!(
            "\n---\nADDITIONAL CONTEXT FROM UPLOADED FILES (not citable):\n{external}\n---\n"
        ));
    }

    let history_section = format_history(history);

    match style {
        SynthesisStyle::Concise => format!(
            "You are a policy assistant providing precise answers from official documents.\n\n\
             CRITICAL INSTRUCTIONS FOR CITATIONS (NON-NEGOTIABLE):\n\
             1. You MUST cite EVERY factual claim using bracketed numbers\n\
             2. Place citations IMMEDIATELY after each relevant sentence\n\
             3. Use bracketed format: [1] [2] [3]\n\
             4. If info comes from multiple sources, cite all: [1][2]\n\
             5. NEVER make claims without citations\n\
             6. The numbers correspond to \"Doc N:\" in the context below\n\
             7. When mentioning Government Orders, include the specific GO number \
                from the document header, with the year when available\n\n\
             {history_section}\
             Context Documents:\n{context_section}\n\
             Question: {query}\n\n\
             Provide a concise, accurate answer with mandatory bracketed citations:"
        ),
        SynthesisStyle::DeepPolicy => format!(
            "You are a policy analyst providing comprehensive analysis with legal citations.\n\n\
             CRITICAL INSTRUCTIONS FOR CITATIONS (NON-NEGOTIABLE):\n\
             1. You MUST cite EVERY factual claim, legal provision, and policy reference \
                using bracketed numbers\n\
             2. Place citations IMMEDIATELY after each sentence or claim\n\
             3. Use bracketed format: [1] [2] [3]\n\
             4. NEVER make claims without citations\n\
             5. The numbers correspond to \"Doc N:\" in the context below\n\n\
             Structure your analysis:\n\
             - Overview\n- Key provisions\n- Legal framework\n- Implications\n- Related policies\n\
             Each section must carry bracketed citations.\n\n\
             {history_section}\
             Context Documents:\n{context_section}\n\
             Question: {query}\n\n\
             Provide comprehensive policy analysis with mandatory bracketed citations:"
        ),
        SynthesisStyle::Exploratory => format!(
            "You are a creative policy advisor suggesting innovative approaches.\n\n\
             CRITICAL INSTRUCTIONS FOR CITATIONS (NON-NEGOTIABLE):\n\
             1. When referencing existing policies or examples, cite using bracketed numbers\n\
             2. Clearly distinguish existing approaches (MUST be cited) from your new \
                suggestions (no citation needed)\n\
             3. Use bracketed format: [1] [2] [3]\n\n\
             {history_section}\
             Context Documents (existing approaches):\n{context_section}\n\
             Topic: {query}\n\n\
             Suggest innovative approaches, citing existing policies with bracketed \
             numbers where relevant:"
        ),
    }
}

fn format_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let recent = &history[history.len().saturating_sub(HISTORY_TURN_LIMIT)..];
    let mut out = String::from(
        "-----------------------------------------------------------\n\
         CONVERSATION HISTORY (for context)\n\
         -----------------------------------------------------------\n",
    );
    for turn in recent {
        match turn.role {
            ChatRole::User => out.push_str(&format!("User: {}\n", turn.content)),
            ChatRole::Assistant => out.push_str(&format!("Assistant: {}\n\n", turn.content)),
        }
    }
    out.push_str("-----------------------------------------------------------\n\n");
    out
}

/// Remove bracketed citations pointing past the context, so every
/// surviving `[K]` has a bibliography entry.
fn strip_out_of_range_citations(text: &str, context_count: usize) -> String {
    CITATION
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let number: usize = caps[1].parse().unwrap_or(0);
            if number >= 1 && number <= context_count {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn extract_citations(text: &str) -> Vec<usize> {
    let mut numbers: Vec<usize> = CITATION
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

fn estimate_confidence(text: &str, citations: &[usize]) -> f32 {
    let mut confidence: f32 = 0.5;
    if !citations.is_empty() {
        confidence += 0.3;
    }
    if text.len() > 200 {
        confidence += 0.1;
    }
    if citations.len() >= 3 {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::ScriptedLlm;
    use policyhub_models::{ChunkPayload, Vertical};
    use serde_json::json;
    use tempfile::TempDir;

    fn chunk(id: &str, vertical: Vertical, payload: serde_json::Value) -> RetrievalResult {
        let content = payload["text"].as_str().unwrap_or("body").to_string();
        RetrievalResult::new(
            id.to_string(),
            format!("doc-{id}"),
            vertical,
            content,
            0.9,
            ChunkPayload(payload.as_object().unwrap().clone()),
        )
    }

    fn composer(dir: &TempDir) -> AnswerComposer {
        AnswerComposer::new(
            Some(Arc::new(ScriptedLlm)),
            Arc::new(LlmCache::new(dir.path())),
            "scripted".to_string(),
            512,
        )
    }

    #[tokio::test]
    async fn composes_cited_answer_with_bibliography() {
        let dir = TempDir::new().unwrap();
        let results = vec![
            chunk(
                "l1",
                Vertical::Legal,
                json!({"text": "Section 12 mandates admission", "source": "RTE Act", "section": "12", "year": 2009}),
            ),
            chunk(
                "g1",
                Vertical::Go,
                json!({"text": "Order on admissions", "source": "School Education", "go_number": "26", "year": 2019}),
            ),
        ];

        let (answer, cache_hit) = composer(&dir)
            .compose(
                "what is section 12",
                &results,
                QueryMode::Qa,
                SynthesisStyle::Concise,
                5,
                None,
                &[],
            )
            .await;

        assert!(!cache_hit);
        assert!(answer.text.contains("[1]"));
        assert_eq!(answer.bibliography.len(), 2);
        assert_eq!(answer.bibliography[0].vertical, Vertical::Legal);
        assert!(answer.confidence >= 0.8);
        for k in &answer.citations {
            assert!(*k >= 1 && *k <= answer.bibliography.len());
        }
    }

    #[tokio::test]
    async fn second_call_hits_the_cache() {
        let dir = TempDir::new().unwrap();
        let composer = composer(&dir);
        let results = vec![chunk("l1", Vertical::Legal, json!({"text": "body"}))];

        let (first, hit1) = composer
            .compose("q", &results, QueryMode::Qa, SynthesisStyle::Concise, 5, None, &[])
            .await;
        let (second, hit2) = composer
            .compose("q", &results, QueryMode::Qa, SynthesisStyle::Concise, 5, None, &[])
            .await;

        assert!(!hit1);
        assert!(hit2);
        assert_eq!(first.text, second.text);
    }

    #[tokio::test]
    async fn no_results_yields_canonical_answer() {
        let dir = TempDir::new().unwrap();
        let (answer, _) = composer(&dir)
            .compose("q", &[], QueryMode::Qa, SynthesisStyle::Concise, 5, None, &[])
            .await;
        assert_eq!(answer.text, NO_RESULTS_ANSWER);
        assert!(answer.citations.is_empty());
        assert_eq!(answer.confidence, 0.0);
    }

    #[tokio::test]
    async fn llm_failure_keeps_bibliography() {
        let dir = TempDir::new().unwrap();
        let composer = AnswerComposer::new(
            None,
            Arc::new(LlmCache::new(dir.path())),
            "none".to_string(),
            512,
        );
        let results = vec![chunk("l1", Vertical::Legal, json!({"text": "body"}))];
        let (answer, _) = composer
            .compose("q", &results, QueryMode::Qa, SynthesisStyle::Concise, 5, None, &[])
            .await;
        assert_eq!(answer.text, GENERATION_FAILED_ANSWER);
        assert_eq!(answer.bibliography.len(), 1);
        assert_eq!(answer.confidence, 0.0);
    }

    #[test]
    fn out_of_range_citations_are_stripped() {
        let cleaned = strip_out_of_range_citations("claim [1] and bogus [9]", 2);
        assert_eq!(cleaned, "claim [1] and bogus ");
        assert_eq!(extract_citations(&cleaned), vec![1]);
    }

    #[test]
    fn context_headers_surface_go_numbers() {
        let chunks = vec![chunk(
            "g1",
            Vertical::Go,
            json!({"text": "order text", "go_number": "190", "year": 2022}),
        )];
        let context = format_context(&chunks);
        assert!(context.contains("Doc 1: G.O.MS.No.190 (go) - Year: 2022"));
    }

    #[test]
    fn history_is_limited_to_recent_turns() {
        let history: Vec<ChatTurn> = (0..15)
            .map(|i| ChatTurn {
                role: ChatRole::User,
                content: format!("turn {i}"),
            })
            .collect();
        let formatted = format_history(&history);
        assert!(!formatted.contains("turn 4"));
        assert!(formatted.contains("turn 5"));
        assert!(formatted.contains("turn 14"));
    }
}
