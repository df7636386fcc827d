//! Shared data model for the policyhub retrieval engine.
//!
//! Everything here is serde-serializable and free of behavior beyond
//! accessors: verticals, query modes, chunk payloads, in-flight retrieval
//! results, and the response envelope handed to the HTTP layer.

pub mod chunk;
pub mod mode;
pub mod response;
pub mod result;
pub mod vertical;

pub use chunk::{ChunkPayload, Relation, RelationType};
pub use mode::{EmbeddingModelKind, QueryMode, RerankerKind, SynthesisStyle, UnknownMode};
pub use response::{
    AnswerPayload, BibliographyEntry, CacheHits, CategoryCoverage, ChatRole, ChatTurn,
    CoverageReport, FormattedResult, QueryInfo, QueryResponse, SearchInfo, TraceInfo,
};
pub use result::{sort_by_score_desc, RetrievalResult};
pub use vertical::{UnknownVertical, Vertical, CORPUS_VERTICALS};
