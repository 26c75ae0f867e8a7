//! The per-call execution context and the in-process tool trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use turnloop_core::{ConversationId, InstanceId, SessionId, UserId};
use turnloop_events::EventBroadcaster;

use crate::error::ToolError;
use crate::value::StructuredValue;

/// Everything a tool call carries into execution.
pub struct ToolContext {
    /// Owning session.
    pub session_id: SessionId,
    /// Owning conversation, if one is active.
    pub conversation_id: Option<ConversationId>,
    /// The user on whose behalf this call runs.
    pub user_id: Option<UserId>,
    /// The instance configuration this call runs under.
    pub instance_id: InstanceId,
    /// Event emission surface, used by HITL-backed tools to emit a
    /// "close prompt" delta on cancellation.
    pub event_broadcaster: Arc<EventBroadcaster>,
    /// Named external API credentials/config available to this call.
    pub apis_config: BTreeMap<String, String>,
    /// Free-form extension bag for fields not otherwise modeled.
    pub extra: BTreeMap<String, StructuredValue>,
}

impl ToolContext {
    /// Build a context with no APIs configured and an empty extension bag.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        instance_id: InstanceId,
        event_broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            session_id,
            conversation_id: None,
            user_id: None,
            instance_id,
            event_broadcaster,
            apis_config: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Attach a conversation id, builder-style.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Attach a user id, builder-style.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Whether a named API is configured for this call.
    #[must_use]
    pub fn has_api(&self, name: &str) -> bool {
        self.apis_config.contains_key(name)
    }
}

/// The result of running a tool, before compaction.
pub type ToolResult = Result<StructuredValue, ToolError>;

/// A tool implementation that executes directly in-process, the first
/// resolution step of the Tool Executor.
#[async_trait::async_trait]
pub trait BuiltinTool: Send + Sync {
    /// Tool name. No colons — that namespace is reserved for loaded tools.
    fn name(&self) -> &'static str;

    /// Human-readable description surfaced to the model.
    fn description(&self) -> &'static str;

    /// JSON schema for the tool's input.
    fn input_schema(&self) -> serde_json::Value;

    /// Declared timeout for this tool; `None` means use the executor
    /// default (60s).
    fn execution_timeout(&self) -> Option<std::time::Duration> {
        None
    }

    /// Whether this tool must never run concurrently with another
    /// serial-only tool in the same turn.
    fn serial_only(&self) -> bool {
        false
    }

    /// Execute the tool.
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult;
}
