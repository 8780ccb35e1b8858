//! Shared types for the extraction pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use super::schema::Category;

/// Structured fields pulled out of an email. Untrusted model output: it should
/// follow the category's schema but nothing guarantees it.
pub type ExtractedPayload = serde_json::Map<String, serde_json::Value>;

// ── Document ────────────────────────────────────────────────────────

/// One email, ready for the stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

// ── Stage results ───────────────────────────────────────────────────

/// Pipeline stage, for logs and fatal-error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Classify,
    Extract,
    Verify,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Extract => "extract",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifier output.
///
/// `confidence` is advisory: it is copied to the record and never used to
/// make decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
}

impl Classification {
    /// Substituted when the classifier's output cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            category: Category::Other,
            confidence: 0.0,
        }
    }
}

/// Verifier output. `schema_ok = false` never stops the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub schema_ok: bool,
    #[serde(rename = "data")]
    pub payload: ExtractedPayload,
}

impl VerificationResult {
    /// Substituted when the verifier's output cannot be parsed: the candidate
    /// is kept as-is and flagged as unverified.
    pub fn fallback(candidate: ExtractedPayload) -> Self {
        Self {
            schema_ok: false,
            payload: candidate,
        }
    }
}

// ── Output record ───────────────────────────────────────────────────

/// One line of the results log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub email_id: String,
    pub category: Category,
    pub confidence: f64,
    pub schema_ok: bool,
    pub data: ExtractedPayload,
}

impl OutputRecord {
    pub fn assemble(
        document_id: impl Into<String>,
        classification: &Classification,
        verification: VerificationResult,
    ) -> Self {
        Self {
            email_id: document_id.into(),
            category: classification.category,
            confidence: classification.confidence,
            schema_ok: verification.schema_ok,
            data: verification.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_record_wire_format() {
        let classification = Classification {
            category: Category::InvoiceBill,
            confidence: 0.9,
        };
        let payload = json!({"vendor": "Acme", "invoice_total": "50", "invoice_date": "2024-01-01"})
            .as_object()
            .cloned()
            .unwrap();
        let record = OutputRecord::assemble(
            "e1",
            &classification,
            VerificationResult {
                schema_ok: true,
                payload,
            },
        );
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"email_id":"e1","category":"invoice/bill","confidence":0.9,"schema_ok":true,"data":{"vendor":"Acme","invoice_total":"50","invoice_date":"2024-01-01"}}"#
        );
    }

    #[test]
    fn classification_fallback_is_other_zero() {
        let fb = Classification::fallback();
        assert_eq!(fb.category, Category::Other);
        assert_eq!(fb.confidence, 0.0);
    }

    #[test]
    fn verification_fallback_keeps_candidate() {
        let candidate = json!({"vendor": "Acme"}).as_object().cloned().unwrap();
        let fb = VerificationResult::fallback(candidate.clone());
        assert!(!fb.schema_ok);
        assert_eq!(fb.payload, candidate);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::Classify.to_string(), "classify");
        assert_eq!(Stage::Verify.label(), "verify");
    }
}
