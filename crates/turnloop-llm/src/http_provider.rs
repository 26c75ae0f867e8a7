//! A generic SSE-based chat provider.
//!
//! Several vendor chat APIs (and self-hosted gateways in front of them)
//! share the same shape: POST a JSON body with `messages`/`tools`/`system`,
//! get back either a single JSON response or a `text/event-stream` of
//! `content_block_start` / `content_block_delta` / `content_block_stop` /
//! `message_delta` / `message_stop` events. This provider speaks that
//! shape; point `base_url` at whatever gateway exposes it.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmProvider, ProviderConfig, StreamBox};
use crate::types::{
    ContentPart, LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StopReason,
    StreamEvent, SystemBlock, ToolCall, Usage,
};

const DEFAULT_URL: &str = "https://api.example.invalid/v1/messages";

/// A chat provider speaking the generic content-block SSE protocol.
pub struct HttpChatProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpChatProvider {
    /// Build a provider from a configuration.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
        stream: bool,
    ) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(Self::convert_message)
            .collect();

        let mut request = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": api_messages,
            "stream": stream,
        });

        if !system.is_empty() {
            let system_blocks: Vec<Value> = system
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "text": b.content,
                        "cache_layer": b.cache_layer,
                        "xml_tag": b.xml_tag,
                    })
                })
                .collect();
            request["system"] = Value::Array(system_blocks);
        }

        if !tools.is_empty() {
            let api_tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            request["tools"] = Value::Array(api_tools);
        }

        request
    }

    fn convert_message(message: &Message) -> Value {
        let role = |r: MessageRole| match r {
            MessageRole::Assistant => "assistant",
            MessageRole::User | MessageRole::Tool | MessageRole::System => "user",
        };
        match &message.content {
            MessageContent::Text(text) => serde_json::json!({
                "role": role(message.role),
                "content": text,
            }),
            MessageContent::ToolCalls(calls) => {
                let content: Vec<Value> = calls
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "type": "tool_use",
                            "id": c.id,
                            "name": c.name,
                            "input": c.arguments,
                        })
                    })
                    .collect();
                serde_json::json!({"role": "assistant", "content": content})
            }
            MessageContent::ToolResult(result) => serde_json::json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": result.call_id,
                    "content": result.content,
                    "is_error": result.is_error,
                }],
            }),
            MessageContent::MultiPart(parts) => {
                let content: Vec<Value> = parts
                    .iter()
                    .map(|p| match p {
                        ContentPart::Text { text } => serde_json::json!({"type": "text", "text": text}),
                        ContentPart::Image { data, media_type } => serde_json::json!({
                            "type": "image",
                            "source": {"type": "base64", "media_type": media_type, "data": data},
                        }),
                    })
                    .collect();
                serde_json::json!({"role": role(message.role), "content": content})
            }
        }
    }

    fn parse_response(response: &ApiResponse) -> LlmResponse {
        let mut text_content = String::new();
        let mut tool_calls = Vec::new();

        for block in &response.content {
            match block {
                ContentBlock::Text { text } => text_content.push_str(text),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
            }
        }

        let message = if tool_calls.is_empty() {
            Message::assistant(text_content)
        } else {
            Message::assistant_with_tools(tool_calls)
        };

        let stop_reason = match response.stop_reason.as_deref() {
            Some("max_tokens") => StopReason::MaxTokens,
            Some("tool_use") => StopReason::ToolUse,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        LlmResponse {
            has_tool_calls: matches!(stop_reason, StopReason::ToolUse),
            message,
            stop_reason,
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        }
    }

    fn auth_header(&self) -> LlmResult<reqwest::header::HeaderValue> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let mut header = reqwest::header::HeaderValue::try_from(&self.config.api_key)
            .map_err(|e| LlmError::ParseError(format!("invalid API key characters: {e}")))?;
        header.set_sensitive(true);
        Ok(header)
    }
}

#[async_trait]
impl LlmProvider for HttpChatProvider {
    fn name(&self) -> &str {
        "http-chat"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[allow(clippy::too_many_lines)]
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
    ) -> LlmResult<StreamBox> {
        let auth = self.auth_header()?;
        let request_body = self.build_request(messages, tools, system, true);
        let url = self.config.base_url.as_deref().unwrap_or(DEFAULT_URL).to_string();

        debug!(model = self.config.model, "starting chat stream");

        let response = self
            .client
            .post(&url)
            .header("authorization", auth)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after_seconds = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "provider returned an error");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
                retry_after_seconds,
            });
        }

        let stream = try_stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut current_tool_id = String::new();
            let mut current_index: u32 = 0;
            let mut last_stop_reason: Option<String> = None;

            while let Some(chunk) = bytes_stream.next().await {
                let chunk = chunk?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(event_end) = buffer.find("\n\n") {
                    let event_data = buffer[..event_end].to_string();
                    let rest_start = event_end + 2;
                    buffer = buffer[rest_start..].to_string();

                    for line in event_data.lines() {
                        let Some(data) = line.strip_prefix("data: ") else { continue };
                        if data == "[DONE]" {
                            continue;
                        }
                        let Ok(event) = serde_json::from_str::<WireEvent>(data) else { continue };
                        match event {
                            WireEvent::ContentBlockStart { index, content_block } => {
                                current_index = index;
                                match content_block {
                                    ContentBlock::Text { .. } => {
                                        yield StreamEvent::ContentStart { index, block_type: "text".to_string() };
                                    }
                                    ContentBlock::ToolUse { id, name, .. } => {
                                        current_tool_id = id.clone();
                                        yield StreamEvent::ToolCallStart { index, id, name };
                                    }
                                }
                            }
                            WireEvent::ContentBlockDelta { index, delta } => match delta {
                                Delta::TextDelta { text } => {
                                    yield StreamEvent::TextDelta { index, text };
                                }
                                Delta::InputJsonDelta { partial_json } => {
                                    yield StreamEvent::ToolCallDelta {
                                        index,
                                        id: current_tool_id.clone(),
                                        args_delta: partial_json,
                                    };
                                }
                            },
                            WireEvent::ContentBlockStop { index } => {
                                yield StreamEvent::ContentStop { index };
                                current_tool_id.clear();
                            }
                            WireEvent::MessageDelta { stop_reason, usage } => {
                                if stop_reason.is_some() {
                                    last_stop_reason = stop_reason;
                                }
                                if let Some(usage) = usage {
                                    yield StreamEvent::Usage {
                                        input_tokens: 0,
                                        output_tokens: usage.output_tokens,
                                    };
                                }
                            }
                            WireEvent::MessageStop => {
                                let stop_reason = match last_stop_reason.as_deref() {
                                    Some("max_tokens") => StopReason::MaxTokens,
                                    Some("tool_use") => StopReason::ToolUse,
                                    Some("stop_sequence") => StopReason::StopSequence,
                                    _ => StopReason::EndTurn,
                                };
                                yield StreamEvent::Done { stop_reason };
                            }
                            WireEvent::Other => {}
                        }
                    }
                }
            }
            let _ = current_index;
        };

        Ok(Box::pin(stream))
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
    ) -> LlmResult<LlmResponse> {
        let auth = self.auth_header()?;
        let request_body = self.build_request(messages, tools, system, false);
        let url = self.config.base_url.as_deref().unwrap_or(DEFAULT_URL).to_string();

        let response = self
            .client
            .post(&url)
            .header("authorization", auth)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after_seconds = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
                retry_after_seconds,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;
        Ok(Self::parse_response(&parsed))
    }

    fn max_context_length(&self) -> usize {
        self.config.context_window.unwrap_or(200_000)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: Delta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        stop_reason: Option<String>,
        usage: Option<ApiUsage>,
    },
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_detected_before_request() {
        let provider = HttpChatProvider::new(ProviderConfig::new("", "test-model"));
        let err = provider.auth_header().unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn max_context_length_falls_back_to_default() {
        let provider = HttpChatProvider::new(ProviderConfig::new("key", "model"));
        assert_eq!(provider.max_context_length(), 200_000);
    }
}
