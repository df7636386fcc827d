use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three response regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Qa,
    DeepThink,
    Brainstorm,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Qa => "qa",
            QueryMode::DeepThink => "deep_think",
            QueryMode::Brainstorm => "brainstorm",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized mode strings. Maps to a `bad_request` at the
/// HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode: {}", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for QueryMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qa" => Ok(QueryMode::Qa),
            "deep_think" | "deep" => Ok(QueryMode::DeepThink),
            "brainstorm" | "ideate" => Ok(QueryMode::Brainstorm),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Embedding model tier selected per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingModelKind {
    Fast,
    Deep,
}

impl EmbeddingModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingModelKind::Fast => "fast",
            EmbeddingModelKind::Deep => "deep",
        }
    }
}

/// Reranking strategy selected per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankerKind {
    Light,
    Policy,
    Brainstorm,
}

impl RerankerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RerankerKind::Light => "light",
            RerankerKind::Policy => "policy",
            RerankerKind::Brainstorm => "brainstorm",
        }
    }
}

/// Answer synthesis style selected per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStyle {
    Concise,
    DeepPolicy,
    Exploratory,
}

impl SynthesisStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisStyle::Concise => "concise",
            SynthesisStyle::DeepPolicy => "deep_policy",
            SynthesisStyle::Exploratory => "exploratory",
        }
    }
}
