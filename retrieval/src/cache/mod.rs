//! Process-wide caches: in-memory embedding vectors and file-backed LLM
//! responses. Both are read-mostly after warm-up; neither is consulted for
//! correctness, only to avoid repeated provider calls.

pub mod embedding_cache;
pub mod llm_cache;

pub use embedding_cache::{EmbeddingCache, EmbeddingCacheStats};
pub use llm_cache::{LlmCache, LlmCacheStats};
