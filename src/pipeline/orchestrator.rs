//! Pipeline orchestrator. Runs every document through
//! classify → extract → verify and appends one record per document.
//!
//! Strictly sequential: one document in flight, stages in order, records in
//! iteration order. Parse failures degrade to each stage's fallback value;
//! gateway failures abort the run with the stage and document attached.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{LlmError, PipelineError};
use crate::llm::provider::{DEFAULT_MAX_TOKENS, LlmProvider};
use crate::loader::{self, PendingDocument};
use crate::pipeline::classifier::Classifier;
use crate::pipeline::extractor::Extractor;
use crate::pipeline::sink::RecordSink;
use crate::pipeline::types::{
    Classification, Document, ExtractedPayload, OutputRecord, Stage, VerificationResult,
};
use crate::pipeline::verifier::{Verifier, VerifierConfig};

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Model identifier passed to every stage.
    pub model: String,
    /// Output cap for every stage's call.
    pub max_tokens: u32,
    pub verifier: VerifierConfig,
    /// Collapse documents that share an id; the first occurrence wins.
    pub deduplicate: bool,
}

impl PipelineOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            verifier: VerifierConfig::default(),
            deduplicate: false,
        }
    }
}

/// Counters for a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Records written.
    pub processed: usize,
    /// Documents with no text after loading.
    pub skipped_empty: usize,
    /// Documents dropped because their id was already seen.
    pub duplicates: usize,
    pub classify_fallbacks: usize,
    pub extract_fallbacks: usize,
    pub verify_fallbacks: usize,
    /// Records where the local schema check disagreed with `schema_ok = true`.
    pub schema_disagreements: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            processed: 0,
            skipped_empty: 0,
            duplicates: 0,
            classify_fallbacks: 0,
            extract_fallbacks: 0,
            verify_fallbacks: 0,
            schema_disagreements: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn fallbacks(&self) -> usize {
        self.classify_fallbacks + self.extract_fallbacks + self.verify_fallbacks
    }
}

/// Which stages fell back while processing one document, and whether the
/// local schema check disagreed with a verified `schema_ok = true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    pub classify: bool,
    pub extract: bool,
    pub verify: bool,
    pub schema_disagreement: bool,
}

/// Drives documents through the three stages.
pub struct Orchestrator {
    classifier: Classifier,
    extractor: Extractor,
    verifier: Verifier,
    options: PipelineOptions,
}

impl Orchestrator {
    /// Build the stages around one shared gateway client.
    pub fn new(llm: Arc<dyn LlmProvider>, options: PipelineOptions) -> Self {
        Self {
            classifier: Classifier::new(Arc::clone(&llm), options.max_tokens),
            extractor: Extractor::new(Arc::clone(&llm), options.max_tokens),
            verifier: Verifier::new(llm, options.max_tokens, options.verifier.clone()),
            options,
        }
    }

    /// Process `documents` in order, appending one record per document with
    /// text to `sink`.
    ///
    /// Returns on the first gateway or sink failure; records already appended
    /// stay in the sink.
    pub async fn run<I, S>(&self, documents: I, sink: &mut S) -> Result<RunSummary, PipelineError>
    where
        I: IntoIterator<Item = PendingDocument>,
        S: RecordSink + ?Sized,
    {
        let mut summary = RunSummary::start();
        let mut seen: HashSet<String> = HashSet::new();

        info!(model = %self.options.model, dedup = self.options.deduplicate, "Starting extraction run");

        for (index, pending) in documents.into_iter().enumerate() {
            let position = index + 1;

            if self.options.deduplicate && !seen.insert(pending.id.clone()) {
                debug!(position, id = %pending.id, "Already processed, skipping duplicate");
                summary.duplicates += 1;
                continue;
            }

            let text = loader::load_text(&pending.content).await;
            if text.trim().is_empty() {
                warn!(position, id = %pending.id, "No text for document, skipping");
                summary.skipped_empty += 1;
                continue;
            }

            let document = Document {
                id: pending.id,
                text,
            };
            let (record, recovery) = self.process_document(&document).await?;

            summary.classify_fallbacks += usize::from(recovery.classify);
            summary.extract_fallbacks += usize::from(recovery.extract);
            summary.verify_fallbacks += usize::from(recovery.verify);
            summary.schema_disagreements += usize::from(recovery.schema_disagreement);

            sink.append(&record).map_err(|source| PipelineError::Sink {
                document_id: document.id.clone(),
                source,
            })?;
            summary.processed += 1;

            info!(
                position,
                id = %document.id,
                category = %record.category,
                schema_ok = record.schema_ok,
                "Processed document"
            );
        }

        summary.finished_at = Utc::now();
        info!(
            processed = summary.processed,
            skipped_empty = summary.skipped_empty,
            duplicates = summary.duplicates,
            fallbacks = summary.fallbacks(),
            "Extraction run complete"
        );
        Ok(summary)
    }

    /// Run the three stages for one document with text.
    pub async fn process_document(
        &self,
        document: &Document,
    ) -> Result<(OutputRecord, Recovery), PipelineError> {
        let model = self.options.model.as_str();
        let mut recovery = Recovery::default();

        // Step 1: classify
        let classification = self
            .classifier
            .classify(&document.text, model)
            .await
            .map_err(|e| stage_error(Stage::Classify, document, e))?
            .unwrap_or_else(|e| {
                warn!(id = %document.id, error = %e, "Unparseable classification, using fallback");
                recovery.classify = true;
                Classification::fallback()
            });

        // Step 2: extract with the classified category
        let payload = self
            .extractor
            .extract(&document.text, classification.category, model)
            .await
            .map_err(|e| stage_error(Stage::Extract, document, e))?
            .unwrap_or_else(|e| {
                warn!(id = %document.id, error = %e, "Unparseable extraction, using empty payload");
                recovery.extract = true;
                ExtractedPayload::new()
            });

        // Step 3: verify / repair
        let verification = match self
            .verifier
            .verify(&payload, classification.category, &document.text, model)
            .await
            .map_err(|e| stage_error(Stage::Verify, document, e))?
        {
            Ok(verification) => verification,
            Err(e) => {
                warn!(id = %document.id, error = %e, "Unparseable verification, keeping candidate");
                recovery.verify = true;
                VerificationResult::fallback(payload)
            }
        };

        if verification.schema_ok {
            let violations = classification.category.schema().check(&verification.payload);
            if !violations.is_empty() {
                recovery.schema_disagreement = true;
                let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                warn!(
                    id = %document.id,
                    category = %classification.category,
                    violations = %details.join("; "),
                    "Verifier reported schema_ok but payload does not match schema"
                );
            }
        }

        let record = OutputRecord::assemble(document.id.clone(), &classification, verification);
        Ok((record, recovery))
    }
}

fn stage_error(stage: Stage, document: &Document, source: LlmError) -> PipelineError {
    PipelineError::Stage {
        stage,
        document_id: document.id.clone(),
        source,
    }
}
