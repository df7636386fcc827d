use thiserror::Error;

/// Top-level error taxonomy for the retrieval core.
///
/// Only input validation and internal invariant violations surface to the
/// caller; dependency failures degrade inside the pipeline (empty vertical,
/// fallback embeddings, graceful "no answer").
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl RetrievalError {
    /// Stable machine-readable kind for the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalError::InvalidQuery(_) | RetrievalError::UnknownMode(_) => "bad_request",
            RetrievalError::Internal(_) => "internal",
        }
    }
}

/// Vector store failures. The retriever reduces all of these to an empty
/// result set for the affected vertical; they never cross the engine
/// boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("search failed in {collection}: {message}")]
    Search { collection: String, message: String },

    #[error("scroll failed in {collection}: {message}")]
    Scroll { collection: String, message: String },
}

/// Embedding provider failures. The engine falls back to the deterministic
/// hashed embedder on any of these.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding provider denied access: {0}")]
    PermissionDenied(String),

    #[error("embedding request failed: {0}")]
    Transient(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// LLM provider failures. The composer maps all of these to the canonical
/// "no answer" response.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("llm provider unavailable: {0}")]
    Unavailable(String),

    #[error("llm provider denied access: {0}")]
    PermissionDenied(String),

    #[error("llm request failed: {0}")]
    Transient(String),

    #[error("llm returned an empty response")]
    Empty,
}

/// Classifier failures: only null input is an error; every real query
/// classifies to some mode.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("cannot classify an empty query")]
    EmptyQuery,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        assert_eq!(
            RetrievalError::InvalidQuery("empty".into()).kind(),
            "bad_request"
        );
        assert_eq!(RetrievalError::UnknownMode("x".into()).kind(), "bad_request");
        assert_eq!(RetrievalError::Internal("dim".into()).kind(), "internal");
    }
}
