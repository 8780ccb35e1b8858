//! Adapter from rig's OpenAI-compatible client to `LlmProvider`.
//!
//! rig owns the HTTP transport and wire format. This module maps our
//! role-tagged messages onto a rig completion request and rig's errors onto
//! `LlmError`.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use rig::client::CompletionClient;
use rig::completion::message::AssistantContent;
use rig::completion::{CompletionError, CompletionModel};
use rig::providers::groq;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

/// Groq's 429 bodies say "Please try again in 7.5s".
static RETRY_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)try again in (\d+(?:\.\d+)?)s").expect("valid regex")
});

/// `LlmProvider` backed by a rig chat-completions client.
pub struct RigAdapter {
    client: groq::Client,
    name: String,
    timeout: Duration,
}

impl RigAdapter {
    pub fn new(client: groq::Client, name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            name: name.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LlmProvider for RigAdapter {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let start = Instant::now();
        let (preamble, prompt) = split_messages(&request.messages);

        let model = self.client.completion_model(&request.model);
        let mut builder = model
            .completion_request(prompt)
            .temperature(f64::from(request.temperature))
            .max_tokens(u64::from(request.max_tokens));
        if !preamble.is_empty() {
            builder = builder.preamble(preamble);
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.name.clone(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| {
                warn!(provider = %self.name, error = %e, "Completion request failed");
                map_completion_error(&self.name, e)
            })?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        let input_tokens = u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX);
        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);
        let finish_reason = if output_tokens >= request.max_tokens {
            FinishReason::Length
        } else {
            FinishReason::Stop
        };

        debug!(
            provider = %self.name,
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            input_tokens,
            output_tokens,
            "Chat completion"
        );

        Ok(CompletionResponse {
            content: content.trim().to_string(),
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }
}

/// System messages become the preamble, user messages the prompt.
fn split_messages(messages: &[ChatMessage]) -> (String, String) {
    let join = |role: Role| {
        messages
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    (join(Role::System), join(Role::User))
}

/// rig reports non-success statuses as text, so auth and rate-limit
/// failures are recognised from the provider's message.
fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    let detail = err.to_string();
    let lower = detail.to_lowercase();

    const AUTH_MARKERS: [&str; 6] = [
        "401",
        "403",
        "unauthorized",
        "forbidden",
        "invalid_api_key",
        "invalid api key",
    ];
    const RATE_MARKERS: [&str; 4] = ["429", "rate limit", "rate_limit", "too many requests"];

    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return LlmError::AuthFailed {
            provider: provider.to_string(),
        };
    }
    if RATE_MARKERS.iter().any(|m| lower.contains(m)) {
        return LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: retry_hint(&detail),
        };
    }

    match err {
        CompletionError::JsonError(_) | CompletionError::ResponseError(_) => {
            LlmError::InvalidResponse {
                provider: provider.to_string(),
                reason: detail,
            }
        }
        _ => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: detail,
        },
    }
}

fn retry_hint(message: &str) -> Option<Duration> {
    let caps = RETRY_HINT.captures(message)?;
    let secs: f64 = caps[1].parse().ok()?;
    Some(Duration::from_secs_f64(secs))
}
