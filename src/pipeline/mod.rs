//! Email extraction pipeline.
//!
//! Every document with text flows through:
//! 1. `Classifier::classify()` picks one category and a confidence
//! 2. `Extractor::extract()` fills that category's schema from the text
//! 3. `Verifier::verify()` checks the payload against the schema and repairs it
//! 4. `RecordSink::append()` writes one output record
//!
//! A stage whose reply cannot be parsed is replaced by its fallback value and
//! the document still produces a record. A failed gateway call stops the run.

pub mod classifier;
pub mod extractor;
pub mod json;
pub mod orchestrator;
pub mod schema;
pub mod sink;
pub mod types;
pub mod verifier;

pub use orchestrator::{Orchestrator, PipelineOptions, RunSummary};
pub use sink::{JsonlSink, RecordSink};

/// Outcome of parsing a stage's reply. The outer `Result` of each stage call
/// carries gateway failures; this one carries unparseable model output.
pub type Parsed<T> = Result<T, crate::error::ParseError>;
