//! Answer composition: prompt assembly, citation extraction, and the
//! vertical-formatted bibliography.

pub mod citations;
pub mod composer;

pub use composer::{AnswerComposer, GENERATION_FAILED_ANSWER, NO_RESULTS_ANSWER};
