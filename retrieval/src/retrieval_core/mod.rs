//! The parallel multi-vertical retriever: filter mapping, per-vertical
//! fan-out, keyword fusion, aggregation, and the supersession index.

pub mod aggregator;
pub mod bm25;
pub mod field_mappings;
pub mod supersession;
pub mod vertical_retriever;

pub use supersession::SupersessionManager;
pub use vertical_retriever::{FanOutOutcome, VerticalRetriever};
