//! Stub completion gateways for tests.
//!
//! Both stubs record every request they receive so tests can assert on the
//! prompts and sampling parameters the stages send.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

/// Which stage sent a request, read off its system prompt.
pub fn stage_of(request: &CompletionRequest) -> Option<crate::pipeline::types::Stage> {
    use crate::pipeline::types::Stage;

    let system = request.messages.first()?.content.as_str();
    if system.starts_with("You are an email classifier") {
        Some(Stage::Classify)
    } else if system.starts_with("Extract schema") {
        Some(Stage::Extract)
    } else if system.starts_with("Check the JSON") {
        Some(Stage::Verify)
    } else {
        None
    }
}

/// Counts whitespace-separated words as tokens and reports `Length` once the
/// reply reaches the request's cap, like a gateway that cut the reply off.
fn response(request: &CompletionRequest, content: String) -> CompletionResponse {
    let output_tokens = u32::try_from(content.split_whitespace().count()).unwrap_or(u32::MAX);
    let finish_reason = if output_tokens >= request.max_tokens {
        FinishReason::Length
    } else {
        FinishReason::Stop
    };
    CompletionResponse {
        content,
        input_tokens: 0,
        output_tokens,
        finish_reason,
    }
}

enum Scripted {
    Reply(String),
    Fail(LlmError),
}

/// Replays canned replies in order. Runs out → `RequestFailed`.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| Scripted::Reply(r.into()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure after the existing script.
    pub fn then_fail(self, error: LlmError) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Fail(error));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(Scripted::Reply(content)) => Ok(response(&request, content)),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            }),
        };
        self.requests.lock().unwrap().push(request);
        result
    }
}

type Responder = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;

/// Answers each request with a function of the request. Deterministic as long
/// as the function is.
pub struct FnLlm {
    responder: Box<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FnLlm {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for FnLlm {
    fn provider_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let result = (self.responder)(&request).map(|content| response(&request, content));
        self.requests.lock().unwrap().push(request);
        result
    }
}
