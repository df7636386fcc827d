//! External service interfaces and their implementations: the vector
//! store, the embedding provider, the LLM, and optional web search.

pub mod embedder;
pub mod llm;
pub mod vector_store;
pub mod web_search;

pub use embedder::{cosine_similarity, Embedder, FallbackEmbedder, GeminiEmbedder, HashedEmbedder};
pub use llm::{GeminiLlm, LlmClient, ScriptedLlm};
pub use vector_store::{FieldClause, FilterSpec, InMemoryStore, QdrantStore, StoreHit, VectorStore};
pub use web_search::WebSearcher;
