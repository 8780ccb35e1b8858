//! Error types for email-extract.

use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::types::Stage;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Completion gateway errors. All of them are fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors building the input document list.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file {} is not a JSON array of documents: {source}", path.display())]
    InvalidInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors appending to the results log.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A stage's raw model output could not be read as the expected structure.
///
/// Never fatal: the orchestrator substitutes the stage's fallback value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON object in model output")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Fatal pipeline errors. Carries the stage and document that were in flight.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage failed for document {document_id}: {source}")]
    Stage {
        stage: Stage,
        document_id: String,
        #[source]
        source: LlmError,
    },

    #[error("Failed to write record for document {document_id}: {source}")]
    Sink {
        document_id: String,
        #[source]
        source: SinkError,
    },
}

impl PipelineError {
    /// Stage that was running when the run aborted, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Sink { .. } => None,
        }
    }

    pub fn document_id(&self) -> &str {
        match self {
            Self::Stage { document_id, .. } | Self::Sink { document_id, .. } => document_id,
        }
    }
}
