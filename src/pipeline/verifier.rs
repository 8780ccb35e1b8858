//! Verifier stage: checks a candidate payload against its category's schema
//! and asks the model to repair it when it does not fit.
//!
//! Repairs may only use information present in the source email. Whether the
//! source email is sent along with the candidate is configurable.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::Parsed;
use crate::pipeline::json::parse_model_json;
use crate::pipeline::types::{Category, ExtractedPayload, VerificationResult};

const VERIFY_TEMPERATURE: f32 = 0.0;

/// Verifier settings.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Send the source email with the candidate so repairs have grounding.
    pub include_source: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            include_source: true,
        }
    }
}

/// Self-correction pass over extracted payloads.
pub struct Verifier {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, config: VerifierConfig) -> Self {
        Self {
            llm,
            max_tokens,
            config,
        }
    }

    /// Verify `payload` for `category`.
    ///
    /// Unparseable output comes back as `Ok(Err(ParseError))`; callers keep
    /// the candidate via [`VerificationResult::fallback`].
    pub async fn verify(
        &self,
        payload: &ExtractedPayload,
        category: Category,
        text: &str,
        model: &str,
    ) -> Result<Parsed<VerificationResult>, LlmError> {
        let source = self.config.include_source.then_some(text);
        let request = CompletionRequest::new(
            model,
            vec![
                ChatMessage::system(build_verify_system_prompt(category)),
                ChatMessage::user(build_verify_user_prompt(payload, source)),
            ],
        )
        .with_temperature(VERIFY_TEMPERATURE)
        .with_max_tokens(self.max_tokens);

        let response = self.llm.complete(request).await?;
        debug!(category = %category, raw = %response.content, "Verifier response");
        if response.is_truncated() {
            warn!(
                category = %category,
                max_tokens = self.max_tokens,
                "Verifier reply hit the output token cap"
            );
        }
        Ok(parse_verification(&response.content))
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_verify_system_prompt(category: Category) -> String {
    format!(
        "Check the JSON extracted from a \"{}\" email.\n\
         Schema:\n{}\n\n\
         - Does it match the schema: every field present, strings as strings, numbers as numbers, lists wrapped in arrays? (true/false)\n\
         - If not, fix it using only information in the source email. Never invent values; leave a field empty instead.\n\
         - Do not reformat dates or amounts that are already present.\n\n\
         Output only JSON:\n\
         {{\"schema_ok\": true/false, \"data\": {{...}}}}",
        category.label(),
        category.schema().skeleton()
    )
}

fn build_verify_user_prompt(payload: &ExtractedPayload, source: Option<&str>) -> String {
    let candidate = serde_json::Value::Object(payload.clone()).to_string();
    match source {
        Some(text) => format!("Candidate JSON:\n{candidate}\n\nSource email:\n{text}"),
        None => candidate,
    }
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    schema_ok: bool,
    #[serde(alias = "payload")]
    data: ExtractedPayload,
}

fn parse_verification(raw: &str) -> Parsed<VerificationResult> {
    let response: VerifyResponse = parse_model_json(raw)?;
    Ok(VerificationResult {
        schema_ok: response.schema_ok,
        payload: response.data,
    })
}
