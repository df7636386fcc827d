use crate::errors::LlmError;
use async_trait::async_trait;
use policyhub_config::LlmConfig;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Opaque "generate text under a prompt" service. Errors are returned as
/// values; the composer maps every failure to the canonical "no answer"
/// response.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

// ============================================================================
// GEMINI PROVIDER
// ============================================================================

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini REST generation client. A permission denial disables the backend
/// for the remainder of the process; later calls fail fast as unavailable.
pub struct GeminiLlm {
    api_key: String,
    client: reqwest::Client,
    model: String,
    disabled: AtomicBool,
}

impl GeminiLlm {
    pub fn from_env(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| {
                LlmError::Unavailable("GEMINI_API_KEY or GOOGLE_API_KEY not set".to_string())
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(Self {
            api_key,
            client,
            model: config.model.clone(),
            disabled: AtomicBool::new(false),
        })
    }

    fn api_url(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }
}

#[async_trait]
impl LlmClient for GeminiLlm {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        if self.disabled.load(Ordering::Relaxed) {
            return Err(LlmError::Unavailable(
                "backend disabled after permission denial".to_string(),
            ));
        }

        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        let response = self
            .client
            .post(self.api_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            tracing::warn!("llm provider denied access, disabling for this process");
            self.disabled.store(true, Ordering::Relaxed);
            return Err(LlmError::PermissionDenied(status.to_string()));
        }
        if !status.is_success() {
            return Err(LlmError::Transient(format!("status {status}")));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transient(e.to_string()))?;

        let text: String = body
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(text)
    }
}

// ============================================================================
// SCRIPTED FAKE
// ============================================================================

/// Deterministic LLM for tests and offline development: echoes a grounded
/// answer that cites the first documents in the prompt.
pub struct ScriptedLlm;

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let doc_count = (1..=20)
            .take_while(|i| prompt.contains(&format!("Doc {i}:")))
            .count();
        if doc_count == 0 {
            return Err(LlmError::Empty);
        }

        let mut answer = String::from("Based on the retrieved documents, ");
        if prompt.contains("creative policy advisor") {
            answer.push_str(
                "several innovative approaches emerge from global best practice. \
                 Existing programs already cover this ground [1]. Building on \
                 international models, new pilots could extend them further",
            );
            if doc_count >= 2 {
                answer.push_str(" [2]");
            }
            answer.push('.');
        } else {
            answer.push_str("the provisions are set out in the cited sources [1].");
            if doc_count >= 2 {
                answer.push_str(" Supporting detail appears in the related orders [2].");
            }
            if doc_count >= 3 {
                answer.push_str(" Additional context is available in the record [3].");
            }
            if prompt.contains("policy analyst") {
                answer.push_str(
                    " Overview: the statutory basis for this policy area is established \
                     in the primary legislation and its enabling rules, which set out the \
                     duties of the state, the entitlements of students, and the \
                     obligations placed on institutions [1]. Key provisions: the operative \
                     sections define eligibility, procedure, and the sanctions available \
                     when obligations are not met, and the subordinate rules elaborate \
                     timelines and documentary requirements for each step [1][2]. Legal \
                     framework: implementation flows through administrative orders issued \
                     by the department, which translate the statutory mandate into \
                     schedules, staffing norms, and budget releases, and which are \
                     periodically revised as circumstances change [2]. Judicial \
                     treatment: where courts have examined these provisions they have \
                     generally upheld the administrative scheme while insisting on \
                     procedural fairness in individual cases, and those rulings now \
                     constrain how the department exercises its discretion [3]. \
                     Implications: taken together, the statute supplies the mandate, the \
                     orders supply the delivery mechanism, and the available outcome data \
                     closes the monitoring loop, so any reform proposal has to work \
                     within all three layers at once. Related policies: adjacent schemes \
                     and reporting systems interact with this framework at the district \
                     level, and coordination between them is where implementation \
                     friction most often appears in the record [2][3]. On the evidence \
                     retrieved here, the framework is coherent on paper; the open \
                     questions concern enforcement capacity, data completeness, and the \
                     pace at which superseded instructions are replaced in the field.",
                );
            }
        }
        Ok(answer)
    }
}
