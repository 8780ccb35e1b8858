//! Email Extract: LLM-driven classification and field extraction for emails.

pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod testing;
