//! Provider-agnostic completion types and the `LlmProvider` trait.

use async_trait::async_trait;

use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Default temperature. Every pipeline stage wants reproducible output.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Default cap on output tokens per call.
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// A completion request: model, ordered messages, sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Output hit `max_tokens`.
    Length,
}

/// Raw completion text plus accounting.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

impl CompletionResponse {
    /// The reply was cut off at `max_tokens` and is probably incomplete.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}

/// Text-in/text-out completion gateway.
///
/// Implementations do not retry and know nothing about schemas. Callers treat
/// `content` as untrusted text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and errors (e.g. "groq").
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_are_deterministic() {
        let req = CompletionRequest::new("m", vec![ChatMessage::user("hi")]);
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(req.model, "m");
    }

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(ChatMessage::system("x").role, Role::System);
        assert_eq!(ChatMessage::user("y").role, Role::User);
    }

    #[test]
    fn length_finish_is_truncated() {
        let mut response = CompletionResponse {
            content: "{\"category\": \"invoice/bill\", \"confid".into(),
            input_tokens: 0,
            output_tokens: 800,
            finish_reason: FinishReason::Length,
        };
        assert!(response.is_truncated());
        response.finish_reason = FinishReason::Stop;
        assert!(!response.is_truncated());
    }
}
