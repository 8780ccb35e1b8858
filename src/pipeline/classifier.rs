//! Classifier stage: email text → category + confidence.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::Parsed;
use crate::pipeline::json::parse_model_json;
use crate::pipeline::types::{Category, Classification};

/// Classification must be reproducible for identical input.
const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// Maps normalized email text to a [`Classification`].
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Classify `text` with `model`.
    ///
    /// Gateway errors are returned as `Err`. Unparseable output comes back as
    /// `Ok(Err(ParseError))`; callers substitute [`Classification::fallback`].
    pub async fn classify(
        &self,
        text: &str,
        model: &str,
    ) -> Result<Parsed<Classification>, LlmError> {
        let request = CompletionRequest::new(
            model,
            vec![
                ChatMessage::system(build_classify_system_prompt()),
                ChatMessage::user(text),
            ],
        )
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(self.max_tokens);

        let response = self.llm.complete(request).await?;
        debug!(raw = %response.content, "Classifier response");
        if response.is_truncated() {
            warn!(max_tokens = self.max_tokens, "Classifier reply hit the output token cap");
        }
        Ok(parse_classification(&response.content))
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classify_system_prompt() -> String {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
    format!(
        "You are an email classifier.\n\
         Categories: {}.\n\n\
         Output JSON only:\n\
         {{\"category\": \"...\", \"confidence\": 0.0-1.0}}",
        labels.join(", ")
    )
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct ClassifyResponse {
    category: String,
    #[serde(default)]
    confidence: f64,
}

/// Parse the classifier's raw output.
///
/// A well-formed answer with a label outside the closed set resolves to
/// `other` and keeps its confidence.
fn parse_classification(raw: &str) -> Parsed<Classification> {
    let response: ClassifyResponse = parse_model_json(raw)?;
    let category = Category::from_label(&response.category).unwrap_or_else(|| {
        debug!(label = %response.category, "Unknown category label, using other");
        Category::Other
    });
    let confidence = if response.confidence.is_finite() {
        response.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ok(Classification {
        category,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::testing::ScriptedLlm;

    #[test]
    fn system_prompt_lists_every_category() {
        let prompt = build_classify_system_prompt();
        for category in Category::ALL {
            assert!(prompt.contains(category.label()));
        }
        assert!(prompt.contains("\"confidence\""));
    }

    #[test]
    fn parse_well_formed() {
        let c = parse_classification(r#"{"category": "invoice/bill", "confidence": 0.9}"#).unwrap();
        assert_eq!(c.category, Category::InvoiceBill);
        assert_eq!(c.confidence, 0.9);
    }

    #[test]
    fn parse_wrapped_in_markdown() {
        let raw = "```json\n{\"category\": \"newsletter\", \"confidence\": 0.7}\n```";
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.category, Category::Newsletter);
    }

    #[test]
    fn parse_unknown_label_resolves_to_other() {
        let c = parse_classification(r#"{"category": "receipt", "confidence": 0.6}"#).unwrap();
        assert_eq!(c.category, Category::Other);
        assert_eq!(c.confidence, 0.6);
    }

    #[test]
    fn parse_missing_confidence_defaults_to_zero() {
        let c = parse_classification(r#"{"category": "shipping/order"}"#).unwrap();
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn parse_confidence_clamped() {
        let c = parse_classification(r#"{"category": "other", "confidence": 1.5}"#).unwrap();
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn parse_non_numeric_confidence_fails() {
        assert!(parse_classification(r#"{"category": "other", "confidence": "high"}"#).is_err());
    }

    #[test]
    fn parse_wrong_field_names_fails() {
        assert!(parse_classification(r#"{"label": "invoice/bill", "score": 0.9}"#).is_err());
    }

    #[test]
    fn parse_not_json_fails() {
        assert_eq!(
            parse_classification("This looks like an invoice."),
            Err(ParseError::NoJsonObject)
        );
    }

    #[tokio::test]
    async fn classify_sends_deterministic_request() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"category": "calendar_invite", "confidence": 0.8}"#,
        ]));
        let classifier = Classifier::new(llm.clone(), 800);

        let result = classifier.classify("Meeting Tuesday", "test-model").await.unwrap();
        assert_eq!(result.unwrap().category, Category::CalendarInvite);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 800);
        assert_eq!(requests[0].messages[1], ChatMessage::user("Meeting Tuesday"));
    }

    #[tokio::test]
    async fn classify_reports_parse_failure_without_raising() {
        let llm = Arc::new(ScriptedLlm::new(["not json at all"]));
        let classifier = Classifier::new(llm, 800);
        let result = classifier.classify("anything", "m").await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn classify_uses_configured_cap() {
        let reply = r#"{"category": "newsletter", "confidence": 0.7}"#;
        let llm = Arc::new(ScriptedLlm::new([reply]));
        let classifier = Classifier::new(llm.clone(), 4096);

        let result = classifier.classify("Weekly digest", "m").await.unwrap();
        assert_eq!(result.unwrap().category, Category::Newsletter);
        assert_eq!(llm.requests()[0].max_tokens, 4096);
    }

    #[tokio::test]
    async fn cut_off_reply_is_a_parse_failure() {
        // Three words reach a cap of three, so the stub reports `Length`.
        let llm = Arc::new(ScriptedLlm::new([r#"{"category": "invoice/bill", "confi"#]));
        let classifier = Classifier::new(llm.clone(), 3);

        let result = classifier.classify("Invoice attached", "m").await.unwrap();
        assert!(result.is_err());
        assert_eq!(llm.requests()[0].max_tokens, 3);
    }
}
