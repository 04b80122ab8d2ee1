//! Scripted mock provider for deterministic tests.
//!
//! Responses are consumed FIFO; each enqueued entry answers exactly one call
//! (`complete`, `stream`, or `extract`). Requests are captured so tests can
//! assert on assembled prompts.

use super::error::{ProviderError, Result};
use super::r#trait::{Provider, ProviderStream};
use super::types::*;
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted model behavior.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Plain text; streamed as a single delta.
    Text(String),
    /// Streamed as one delta per entry, then a clean stop.
    Deltas(Vec<String>),
    /// A structured tool-call payload (for `extract`).
    ToolCall(serde_json::Value),
    /// Model answered with free text where a tool call was forced.
    NoToolCall,
    /// Stream that fails mid-flight after emitting `deltas`.
    StreamFailure {
        deltas: Vec<String>,
        message: String,
    },
    /// Hard failure before any output.
    Failure(String),
}

/// Mock client: replays a scripted queue of responses.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a response (builder form).
    pub fn with_response(self, response: MockResponse) -> Self {
        self.push(response);
        self
    }

    /// Enqueue a response on an existing provider.
    pub fn push(&self, response: MockResponse) {
        self.responses
            .lock()
            .expect("mock queue poisoned")
            .push_back(response);
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().expect("mock requests poisoned").clone()
    }

    fn next(&self, request: &LLMRequest) -> MockResponse {
        self.requests
            .lock()
            .expect("mock requests poisoned")
            .push(request.clone());
        self.responses
            .lock()
            .expect("mock queue poisoned")
            .pop_front()
            .unwrap_or(MockResponse::Text("(mock)".to_string()))
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let scripted = self.next(&request);
        let content = match scripted {
            MockResponse::Text(text) => vec![ContentBlock::Text { text }],
            MockResponse::Deltas(deltas) => vec![ContentBlock::Text {
                text: deltas.concat(),
            }],
            MockResponse::ToolCall(input) => vec![ContentBlock::ToolUse {
                id: "mock-tool-1".to_string(),
                name: request
                    .tool_choice
                    .clone()
                    .unwrap_or_else(|| "tool".to_string()),
                input,
            }],
            MockResponse::NoToolCall => vec![ContentBlock::Text {
                text: "I decline to call the tool.".to_string(),
            }],
            MockResponse::StreamFailure { message, .. } | MockResponse::Failure(message) => {
                return Err(ProviderError::StreamError(message));
            }
        };

        Ok(LLMResponse {
            id: "mock-msg-1".to_string(),
            model: request.model,
            content,
            stop_reason: Some(StopReason::EndTurn),
            usage: TokenUsage::default(),
        })
    }

    async fn stream(&self, request: LLMRequest) -> Result<ProviderStream> {
        let mut events: Vec<Result<StreamEvent>> = Vec::new();
        match self.next(&request) {
            MockResponse::Text(text) => {
                events.push(Ok(StreamEvent::TextDelta { text }));
                events.push(Ok(StreamEvent::MessageStop));
            }
            MockResponse::Deltas(deltas) => {
                for text in deltas {
                    events.push(Ok(StreamEvent::TextDelta { text }));
                }
                events.push(Ok(StreamEvent::MessageStop));
            }
            MockResponse::StreamFailure { deltas, message } => {
                for text in deltas {
                    events.push(Ok(StreamEvent::TextDelta { text }));
                }
                events.push(Err(ProviderError::StreamError(message)));
            }
            MockResponse::Failure(message) => {
                return Err(ProviderError::StreamError(message));
            }
            MockResponse::ToolCall(_) | MockResponse::NoToolCall => {
                events.push(Ok(StreamEvent::MessageStop));
            }
        }
        Ok(Box::pin(stream::iter(events)))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}
