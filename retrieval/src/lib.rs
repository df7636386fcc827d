//! # policyhub-retrieval
//!
//! Multi-vertical retrieval engine for a policy-knowledge corpus: acts,
//! government orders, judicial rulings, statistical reports, and schemes,
//! with optional live web results.
//!
//! One query flows understand → fan out → merge → rerank → answer:
//!
//! 1. **Query planning** ([`query_processing`]): normalization, regex
//!    entity extraction, rule-based intent classification (QA / DeepThink /
//!    Brainstorm), policy-category prediction, and vertical routing,
//!    composed into an immutable [`QueryPlan`].
//! 2. **Parallel retrieval** ([`retrieval_core`]): one task per selected
//!    vertical under the plan deadline, logical-to-physical filter
//!    mapping, optional BM25 fusion, weighted aggregation with dedup, and
//!    MMR selection for Brainstorm.
//! 3. **Rescoring and answering** ([`reranking`], [`answer`]): light /
//!    policy / brainstorm reranking, keyword boosting for embedding-light
//!    domains, mandatory category coverage, the supersession filter, and
//!    finally a cited answer with a vertical-formatted bibliography.
//!
//! The vector store, embedding provider, and LLM are consumed behind
//! traits ([`services`]); an in-memory store, a deterministic hashed
//! embedder, and a scripted LLM make the whole pipeline runnable offline.
//!
//! ```rust,ignore
//! use policyhub_config::Settings;
//! use policyhub_retrieval::{QueryRequest, RetrievalEngine};
//!
//! let engine = RetrievalEngine::from_settings(Settings::from_env()).await?;
//! let response = engine.query(QueryRequest::for_query("What is Section 12?")).await?;
//! println!("{}", response.answer.text);
//! ```

pub mod answer;
pub mod cache;
pub mod engine;
pub mod errors;
pub mod query_processing;
pub mod reranking;
pub mod retrieval_core;
pub mod services;

pub use engine::{QueryRequest, RetrievalEngine};
pub use errors::{ClassifierError, EmbedError, LlmError, RetrievalError, StoreError};
pub use query_processing::{IntentSignals, PolicyCategory, QueryPlan, QueryPlanner};
pub use retrieval_core::SupersessionManager;
pub use services::{
    Embedder, FallbackEmbedder, HashedEmbedder, InMemoryStore, LlmClient, QdrantStore,
    ScriptedLlm, VectorStore, WebSearcher,
};

// Re-export the model and config crates so downstream callers need only
// one dependency.
pub use policyhub_config as config;
pub use policyhub_models as models;
