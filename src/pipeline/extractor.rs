//! Extractor stage: (email text, category) → structured payload.
//!
//! Each category has its own schema (flat invoice fields vs. nested shipping
//! line items), so the instruction is chosen per category rather than using
//! one generic extraction prompt.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::Parsed;
use crate::pipeline::json::parse_payload;
use crate::pipeline::types::{Category, ExtractedPayload};

const EXTRACT_TEMPERATURE: f32 = 0.0;

/// Calls the model with the category's schema template.
pub struct Extractor {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Extract fields for `category` from `text`.
    ///
    /// Unparseable output comes back as `Ok(Err(ParseError))`; callers
    /// substitute an empty payload.
    pub async fn extract(
        &self,
        text: &str,
        category: Category,
        model: &str,
    ) -> Result<Parsed<ExtractedPayload>, LlmError> {
        let request = CompletionRequest::new(
            model,
            vec![
                ChatMessage::system(extraction_template(category)),
                ChatMessage::user(text),
            ],
        )
        .with_temperature(EXTRACT_TEMPERATURE)
        .with_max_tokens(self.max_tokens);

        let response = self.llm.complete(request).await?;
        debug!(category = %category, raw = %response.content, "Extractor response");
        if response.is_truncated() {
            warn!(
                category = %category,
                max_tokens = self.max_tokens,
                "Extractor reply hit the output token cap"
            );
        }
        Ok(parse_payload(&response.content))
    }
}

/// Instruction for `category`, rendered from its schema.
pub fn extraction_template(category: Category) -> String {
    let schema = category.schema();
    let guidance = match category {
        Category::InvoiceBill => "Copy amounts and dates exactly as written in the email.",
        Category::ShippingOrder => {
            "List every ordered item in \"items\"; quantity is a number. Use [] if none are listed."
        }
        Category::CalendarInvite => "Use the event's own title, not the email subject line.",
        Category::Newsletter => "\"topic\" is the main subject of this issue in a few words.",
        Category::Other => "\"summary\" is one sentence describing the email.",
    };
    format!(
        "Extract schema:\n{}\n\n{}\nLeave a field empty if the email does not contain it. Output JSON only.",
        schema.skeleton(),
        guidance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    #[test]
    fn every_category_has_its_own_template() {
        let templates: Vec<String> = Category::ALL.iter().map(|c| extraction_template(*c)).collect();
        for (i, a) in templates.iter().enumerate() {
            assert!(a.starts_with("Extract schema:"));
            for b in &templates[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn invoice_template_carries_schema_fields() {
        let template = extraction_template(Category::InvoiceBill);
        assert!(template.contains(r#"{"vendor":"", "invoice_total":"", "invoice_date":""}"#));
    }

    #[test]
    fn other_template_is_summary_only() {
        let template = extraction_template(Category::Other);
        assert!(template.contains(r#"{"summary":""}"#));
        assert!(!template.contains("vendor"));
    }

    #[tokio::test]
    async fn extract_uses_category_template() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"order_id": "A1", "ship_date": "2024-03-02", "carrier": "UPS", "items": []}"#,
        ]));
        let extractor = Extractor::new(llm.clone(), 800);

        let payload = extractor
            .extract("Your order A1 shipped via UPS", Category::ShippingOrder, "m")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload["carrier"], "UPS");

        let requests = llm.requests();
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 800);
        assert_eq!(
            requests[0].messages[0].content,
            extraction_template(Category::ShippingOrder)
        );
    }

    #[tokio::test]
    async fn extract_reports_parse_failure() {
        let llm = Arc::new(ScriptedLlm::new(["Sorry, I can't find anything."]));
        let extractor = Extractor::new(llm, 800);
        let result = extractor.extract("hi", Category::Other, "m").await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn extract_distinguishes_valid_empty_payload() {
        let llm = Arc::new(ScriptedLlm::new(["{}"]));
        let extractor = Extractor::new(llm, 800);
        let result = extractor.extract("hi", Category::Other, "m").await.unwrap();
        assert_eq!(result, Ok(ExtractedPayload::new()));
    }
}
