//! Message, tool, and streaming types shared by every LLM provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in the conversation sent to or received from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who is speaking.
    pub role: MessageRole,
    /// What they said.
    pub content: MessageContent,
}

impl Message {
    /// Build a user message from plain text.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an assistant message from plain text.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build a system message from plain text. Used for the phase-2
    /// user-context block, which is carried as a flagged system-injection
    /// message per the message assembly rule.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an assistant message carrying completed tool calls.
    #[must_use]
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::ToolCalls(tool_calls),
        }
    }

    /// Build a message carrying a tool's result, to be fed back to the
    /// model on the next turn.
    #[must_use]
    pub fn tool_result(result: ToolCallResult) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::ToolResult(result),
        }
    }

    /// The message's plain text, if it is a `Text` message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The message's tool calls, if it carries any.
    #[must_use]
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        match &self.content {
            MessageContent::ToolCalls(calls) => Some(calls),
            _ => None,
        }
    }
}

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions to the model.
    System,
    /// The human (or upstream channel) speaking.
    User,
    /// The model speaking.
    Assistant,
    /// A tool result fed back to the model.
    Tool,
}

/// The payload carried by a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// One or more tool calls requested by the model.
    ToolCalls(Vec<ToolCall>),
    /// The result of executing a tool call.
    ToolResult(ToolCallResult),
    /// Mixed text and media.
    MultiPart(Vec<ContentPart>),
}

/// One part of a multi-part message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment.
    Text {
        /// The text.
        text: String,
    },
    /// An inline image.
    Image {
        /// Base64-encoded bytes.
        data: String,
        /// MIME type, e.g. `image/png`.
        media_type: String,
    },
}

/// A tool invocation the model is requesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique id for this call, used to correlate its eventual result.
    pub id: String,
    /// The capability name being invoked.
    pub name: String,
    /// Arguments, as parsed JSON.
    pub arguments: Value,
}

impl ToolCall {
    /// Build a tool call with no arguments yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach arguments, builder-style.
    #[must_use]
    pub fn with_arguments(mut self, args: Value) -> Self {
        self.arguments = args;
        self
    }
}

/// The result of executing a [`ToolCall`], fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Which call this responds to.
    pub call_id: String,
    /// Rendered content, already compacted if large.
    pub content: String,
    /// Whether this represents a failed call.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Build a successful result.
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Build an error result.
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

/// A tool definition advertised to the model, as produced by
/// `turnloop_capabilities::CapabilityRegistry::get_tool_schemas`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON schema for the tool's input.
    pub input_schema: Value,
}

impl LlmToolDefinition {
    /// Build a definition with an open object schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({"type": "object"}),
        }
    }

    /// Attach a description, builder-style.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Attach an input schema, builder-style.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A rendered system prompt fragment with its assigned cache layer, as
/// produced by the Injection Orchestrator's `build_system_blocks`.
///
/// `cache_layer` follows the layering rule: `stable` fragments consume a
/// monotonically increasing layer assigned in priority order, `session`
/// gets `stable + 1`, and `dynamic` gets layer `0` (meaning: never cached).
/// A provider that supports prompt caching maps equal layers to the same
/// cache breakpoint; a provider that does not may simply concatenate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    /// The rendered text.
    pub content: String,
    /// Cache layer; `0` means never cache this block.
    pub cache_layer: u32,
    /// Optional XML-style tag the block should be wrapped in.
    pub xml_tag: Option<String>,
}

/// One event in a streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A content block has begun at `index`.
    ContentStart {
        /// Position of the block within the message.
        index: u32,
        /// `text`, `thinking`, or `tool_use`.
        block_type: String,
    },
    /// Partial assistant text for the block at `index`.
    TextDelta {
        /// Position of the block this delta belongs to.
        index: u32,
        /// The incremental text.
        text: String,
    },
    /// Partial chain-of-thought/reasoning text for the block at `index`.
    ReasoningDelta {
        /// Position of the block this delta belongs to.
        index: u32,
        /// The incremental text.
        text: String,
    },
    /// A tool call has begun at `index`.
    ToolCallStart {
        /// Position of the block within the message.
        index: u32,
        /// Call id.
        id: String,
        /// Tool name.
        name: String,
    },
    /// Partial tool-call argument JSON for the call at `index`.
    ToolCallDelta {
        /// Position of the block this delta belongs to.
        index: u32,
        /// Call id.
        id: String,
        /// Incremental argument JSON fragment.
        args_delta: String,
    },
    /// The content block at `index` has finished.
    ContentStop {
        /// Position of the block that finished.
        index: u32,
    },
    /// Token usage for the completed response.
    Usage {
        /// Input tokens.
        input_tokens: usize,
        /// Output tokens.
        output_tokens: usize,
    },
    /// The stream finished normally.
    Done {
        /// Why generation stopped.
        stop_reason: StopReason,
    },
    /// The stream failed.
    Error(String),
}

/// A non-streamed response, used by [`crate::LlmProvider::complete`] and
/// internally to accumulate a streamed response for logging.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The accumulated message.
    pub message: Message,
    /// Whether the response requests any tool calls.
    pub has_tool_calls: bool,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// Token usage.
    pub usage: Usage,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model reached a natural end of turn.
    EndTurn,
    /// The model hit its output token limit.
    MaxTokens,
    /// The model is requesting tool use.
    ToolUse,
    /// A configured stop sequence was hit.
    StopSequence,
}

/// Token usage for one completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub input_tokens: usize,
    /// Tokens generated.
    pub output_tokens: usize,
}

impl Usage {
    /// Sum of input and output tokens.
    #[must_use]
    pub fn total(&self) -> usize {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_role_and_text() {
        let user = Message::user("hello");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.text(), Some("hello"));

        let assistant = Message::assistant("hi");
        assert_eq!(assistant.role, MessageRole::Assistant);
    }

    #[test]
    fn tool_result_error_flag() {
        let ok = ToolCallResult::success("1", "done");
        assert!(!ok.is_error);
        let err = ToolCallResult::error("1", "boom");
        assert!(err.is_error);
    }

    #[test]
    fn usage_total_sums_both_fields() {
        let usage = Usage {
            input_tokens: 10,
            output_tokens: 5,
        };
        assert_eq!(usage.total(), 15);
    }
}
