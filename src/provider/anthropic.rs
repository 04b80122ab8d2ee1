//! Anthropic Messages API provider.
//!
//! Implements the Provider trait over the raw HTTP API: non-streaming
//! completion (used for extraction and episodic compression) and SSE
//! streaming (used for live turn generation).

use super::error::{ProviderError, Result};
use super::r#trait::{Provider, ProviderStream};
use super::retry::{RetryConfig, retry_with_backoff};
use super::types::*;
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anthropic provider for Claude models.
#[derive(Clone)]
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: Client,
    default_model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, default_model: String) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_max_idle_per_host(2)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            base_url: DEFAULT_ANTHROPIC_API_URL.to_string(),
            client,
            default_model,
        }
    }

    /// Point at a non-default endpoint (proxy, compatible gateway).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build request headers.
    fn headers(&self) -> Result<reqwest::header::HeaderMap> {
        let mut headers = reqwest::header::HeaderMap::new();

        let clean_key = self.api_key.trim();
        let key_value: reqwest::header::HeaderValue = clean_key.parse().map_err(|_| {
            tracing::error!(
                "API key contains invalid characters (length={})",
                clean_key.len()
            );
            ProviderError::InvalidApiKey
        })?;
        headers.insert("x-api-key", key_value);
        headers.insert(
            "anthropic-version",
            ANTHROPIC_VERSION.parse().expect("valid version header"),
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "application/json".parse().expect("valid content-type"),
        );

        Ok(headers)
    }

    /// Convert our generic request to the Anthropic wire format.
    fn to_wire_request(&self, request: LLMRequest, stream: bool) -> WireRequest {
        let messages = request
            .messages
            .into_iter()
            .map(|msg| WireMessage {
                role: match msg.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg
                    .content
                    .into_iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => WireContentBlock::Text { text },
                        ContentBlock::ToolUse { id, name, input } => {
                            WireContentBlock::ToolUse { id, name, input }
                        }
                    })
                    .collect(),
            })
            .collect();

        let tool_choice = request
            .tool_choice
            .map(|name| serde_json::json!({ "type": "tool", "name": name }));

        WireRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages,
            temperature: request.temperature,
            tools: request.tools,
            tool_choice,
            stream: if stream { Some(true) } else { None },
        }
    }

    /// Convert an Anthropic response to our generic format.
    fn from_wire_response(&self, response: WireResponse) -> LLMResponse {
        let content = response
            .content
            .into_iter()
            .map(|block| match block {
                WireContentBlock::Text { text } => ContentBlock::Text { text },
                WireContentBlock::ToolUse { id, name, input } => {
                    ContentBlock::ToolUse { id, name, input }
                }
            })
            .collect();

        let stop_reason = response
            .stop_reason
            .as_deref()
            .and_then(|reason| match reason {
                "end_turn" | "stop_sequence" => Some(StopReason::EndTurn),
                "max_tokens" => Some(StopReason::MaxTokens),
                "tool_use" => Some(StopReason::ToolUse),
                _ => None,
            });

        LLMResponse {
            id: response.id,
            model: response.model,
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens.unwrap_or(0),
                output_tokens: response.usage.output_tokens.unwrap_or(0),
            },
        }
    }

    /// Handle API error response.
    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();

        if let Ok(error_body) = response.json::<WireErrorResponse>().await {
            return if status == 429 {
                ProviderError::RateLimitExceeded(error_body.error.message)
            } else {
                ProviderError::ApiError {
                    status,
                    message: error_body.error.message,
                    error_type: Some(error_body.error.error_type),
                }
            };
        }

        if status == 429 {
            ProviderError::RateLimitExceeded("Rate limit exceeded, please retry later".into())
        } else {
            ProviderError::ApiError {
                status,
                message: "Unknown error".to_string(),
                error_type: None,
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let model = request.model.clone();
        let message_count = request.messages.len();
        let wire_request = self.to_wire_request(request, false);
        let retry_config = RetryConfig::default();

        tracing::debug!(
            "Anthropic request: model={}, messages={}, max_tokens={}",
            model,
            message_count,
            wire_request.max_tokens
        );

        let result = retry_with_backoff(
            || async {
                let response = self
                    .client
                    .post(&self.base_url)
                    .headers(self.headers()?)
                    .json(&wire_request)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(self.handle_error(response).await);
                }

                let wire_response: WireResponse = response.json().await?;
                Ok(self.from_wire_response(wire_response))
            },
            &retry_config,
        )
        .await;

        if let Ok(ref resp) = result {
            tracing::debug!(
                "Anthropic response: input_tokens={}, output_tokens={}, stop_reason={:?}",
                resp.usage.input_tokens,
                resp.usage.output_tokens,
                resp.stop_reason
            );
        }

        result
    }

    async fn stream(&self, request: LLMRequest) -> Result<ProviderStream> {
        let model = request.model.clone();
        tracing::info!(
            "Anthropic streaming request: model={}, messages={}",
            model,
            request.messages.len()
        );

        let wire_request = self.to_wire_request(request, true);
        let retry_config = RetryConfig::default();

        // Retry only the connection; once bytes flow, failures surface
        // in-stream so the caller can emit an error event.
        let response = retry_with_backoff(
            || async {
                let response = self
                    .client
                    .post(&self.base_url)
                    .headers(self.headers()?)
                    .json(&wire_request)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(self.handle_error(response).await);
                }

                Ok(response)
            },
            &retry_config,
        )
        .await?;

        // Parse the SSE byte stream. A chunk may contain several events or a
        // partial line, so buffer across chunks and emit per complete line.
        let byte_stream = response.bytes_stream();
        let buffer = std::sync::Arc::new(std::sync::Mutex::new(String::new()));

        let event_stream = byte_stream
            .map(move |chunk_result| -> Vec<Result<StreamEvent>> {
                match chunk_result {
                    Err(e) => vec![Err(ProviderError::StreamError(e.to_string()))],
                    Ok(chunk) => {
                        let mut buf = buffer.lock().expect("SSE buffer lock poisoned");
                        buf.push_str(&String::from_utf8_lossy(&chunk));

                        let mut events = Vec::new();
                        while let Some(newline_pos) = buf.find('\n') {
                            let line = buf[..newline_pos].trim().to_string();
                            buf.drain(..=newline_pos);

                            let Some(json_str) = line.strip_prefix("data: ") else {
                                // "event: ..." lines and blank separators
                                continue;
                            };

                            match serde_json::from_str::<WireStreamEvent>(json_str) {
                                Ok(event) => match event {
                                    WireStreamEvent::ContentBlockDelta { delta } => {
                                        if let WireDelta::TextDelta { text } = delta {
                                            events.push(Ok(StreamEvent::TextDelta { text }));
                                        }
                                    }
                                    WireStreamEvent::MessageStop => {
                                        events.push(Ok(StreamEvent::MessageStop));
                                    }
                                    WireStreamEvent::Error { error } => {
                                        events.push(Err(ProviderError::StreamError(format!(
                                            "{}: {}",
                                            error.error_type, error.message
                                        ))));
                                    }
                                    // message_start, content_block_start/stop,
                                    // message_delta, ping
                                    _ => {}
                                },
                                Err(e) => {
                                    let preview = json_str.chars().take(200).collect::<String>();
                                    tracing::warn!(
                                        "Failed to parse SSE chunk: {} | Raw: {}",
                                        e,
                                        preview
                                    );
                                }
                            }
                        }

                        if events.is_empty() {
                            vec![Ok(StreamEvent::Ping)]
                        } else {
                            events
                        }
                    }
                }
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: Vec<WireContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    id: String,
    model: String,
    content: Vec<WireContentBlock>,
    stop_reason: Option<String>,
    usage: WireUsage,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireStreamEvent {
    MessageStart {
        #[serde(default)]
        #[allow(dead_code)]
        message: serde_json::Value,
    },
    ContentBlockStart {
        #[serde(default)]
        #[allow(dead_code)]
        content_block: serde_json::Value,
    },
    ContentBlockDelta {
        delta: WireDelta,
    },
    ContentBlockStop {},
    MessageDelta {
        #[serde(default)]
        #[allow(dead_code)]
        delta: serde_json::Value,
    },
    MessageStop,
    Ping,
    Error {
        error: WireError,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        #[serde(default)]
        #[allow(dead_code)]
        partial_json: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Clone, Deserialize)]
struct WireError {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = AnthropicProvider::new("test-key".into(), "claude-sonnet-4-6".into());
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_ANTHROPIC_API_URL);
        assert_eq!(provider.default_model(), "claude-sonnet-4-6");
    }

    #[test]
    fn test_wire_request_forced_tool() {
        let provider = AnthropicProvider::new("test-key".into(), "claude-sonnet-4-6".into());
        let tool = Tool {
            name: "update_working_memory".into(),
            description: "d".into(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let request =
            LLMRequest::new("claude-haiku-4-5", vec![Message::user("x")]).with_forced_tool(tool);
        let wire = provider.to_wire_request(request, false);

        assert_eq!(
            wire.tool_choice,
            Some(serde_json::json!({"type": "tool", "name": "update_working_memory"}))
        );
        assert!(wire.stream.is_none());
    }

    #[test]
    fn test_stream_event_parsing() {
        let delta: WireStreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
        )
        .expect("parse delta");
        match delta {
            WireStreamEvent::ContentBlockDelta {
                delta: WireDelta::TextDelta { text },
            } => assert_eq!(text, "Hello"),
            other => panic!("unexpected event: {:?}", other),
        }

        let stop: WireStreamEvent =
            serde_json::from_str(r#"{"type":"message_stop"}"#).expect("parse stop");
        assert!(matches!(stop, WireStreamEvent::MessageStop));
    }

    #[test]
    fn test_wire_response_conversion() {
        let provider = AnthropicProvider::new("k".into(), "m".into());
        let wire: WireResponse = serde_json::from_str(
            r#"{"id":"msg_1","model":"claude-haiku-4-5","content":[{"type":"tool_use","id":"t1","name":"update_working_memory","input":{"emotionalState":"composed"}}],"stop_reason":"tool_use","usage":{"input_tokens":10,"output_tokens":5}}"#,
        )
        .expect("parse response");
        let resp = provider.from_wire_response(wire);

        assert_eq!(resp.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(
            resp.tool_input(),
            Some(&serde_json::json!({"emotionalState": "composed"}))
        );
    }
}
