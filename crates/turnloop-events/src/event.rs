//! The closed event taxonomy emitted during a turn.

use serde::{Deserialize, Serialize};
use turnloop_core::{ConversationId, MessageId, SessionId, Timestamp};
use uuid::Uuid;

/// The kind of a content block carried by `content_start` / `content_stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBlockType {
    /// Plain assistant text.
    Text,
    /// Extended-thinking content, not shown to the user by default.
    Thinking,
    /// A tool invocation requested by the model.
    ToolUse,
    /// The result of a tool invocation fed back to the model.
    ToolResult,
}

/// The closed set of event types this runtime ever emits.
///
/// This mirrors the taxonomy exactly: session level, conversation level,
/// message level, content level, and system level. No other event type may
/// be constructed; anything outside this set belongs in `data` as a
/// `System::Custom` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    // -- session level --
    /// A session has begun.
    SessionStart,
    /// A session was stopped by explicit user request.
    SessionStopped {
        /// Human-readable reason the session stopped.
        reason: String,
    },
    /// A session has ended, successfully or otherwise.
    SessionEnd {
        /// `completed`, `failed`, or `stopped`.
        status: String,
    },
    /// A liveness heartbeat.
    Ping,

    // -- conversation level --
    /// A conversation has begun within a session.
    ConversationStart,
    /// A partial update to conversation-level metadata.
    ConversationDelta {
        /// Which field changed: `title`, `metadata`, or `compressed`.
        field: String,
        /// The new value, as an opaque JSON value.
        value: serde_json::Value,
    },
    /// A conversation has stopped accepting further turns.
    ConversationStop,

    // -- message level --
    /// A new assistant message has begun streaming.
    MessageStart,
    /// A message-level side-channel delta (usage, progress, etc).
    MessageDelta {
        /// One of `usage`, `recommended`, `search`, `knowledge`, `intent`,
        /// `billing`, `cloud_progress`, `hitl`, `progress`.
        kind: String,
        /// The delta's payload.
        content: serde_json::Value,
    },
    /// A message has finished streaming.
    MessageStop,

    // -- content level --
    /// A content block has begun.
    ContentStart {
        /// Position of the block within the message.
        index: u32,
        /// The kind of block starting.
        block_type: ContentBlockType,
    },
    /// An incremental update to a content block.
    ContentDelta {
        /// Position of the block this delta belongs to.
        index: u32,
        /// The raw incremental text or JSON fragment.
        text: String,
    },
    /// A content block has finished.
    ContentStop {
        /// Position of the block that finished.
        index: u32,
    },

    // -- system level --
    /// A terminal failure.
    Error {
        /// Human-readable error message.
        message: String,
        /// Closed error classification, rendered as its `Display` string.
        error_type: String,
    },
    /// Marks the absolute end of turn processing; always the last event.
    Done,
    /// An escape hatch for adapter- or frontend-specific system events.
    Custom {
        /// Caller-chosen event name.
        name: String,
        /// Arbitrary payload.
        payload: serde_json::Value,
    },
}

impl EventType {
    /// A short, stable discriminant string, used for logging and filters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionStopped { .. } => "session_stopped",
            Self::SessionEnd { .. } => "session_end",
            Self::Ping => "ping",
            Self::ConversationStart => "conversation_start",
            Self::ConversationDelta { .. } => "conversation_delta",
            Self::ConversationStop => "conversation_stop",
            Self::MessageStart => "message_start",
            Self::MessageDelta { .. } => "message_delta",
            Self::MessageStop => "message_stop",
            Self::ContentStart { .. } => "content_start",
            Self::ContentDelta { .. } => "content_delta",
            Self::ContentStop { .. } => "content_stop",
            Self::Error { .. } => "error",
            Self::Done => "done",
            Self::Custom { .. } => "custom",
        }
    }
}

/// An immutable event record. `seq` is assigned only by
/// [`crate::EventStorage::buffer_event`]; every other field is set by the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique id for this event.
    pub event_uuid: Uuid,
    /// Session-scoped, strictly monotonic sequence number. `None` until
    /// the event has passed through storage.
    pub seq: Option<u64>,
    /// The event's payload and discriminant.
    #[serde(flatten)]
    pub event_type: EventType,
    /// Session this event belongs to.
    pub session_id: SessionId,
    /// Conversation this event belongs to, if any. Absent for
    /// pre-conversation session events such as `session_start`.
    pub conversation_id: Option<ConversationId>,
    /// Message this event belongs to, if applicable.
    pub message_id: Option<MessageId>,
    /// When the event was created (not when it was stamped with `seq`).
    pub timestamp: Timestamp,
}

impl Event {
    /// Construct an event with a fresh UUID and no `seq` assigned yet.
    #[must_use]
    pub fn new(session_id: SessionId, event_type: EventType) -> Self {
        Self {
            event_uuid: Uuid::new_v4(),
            seq: None,
            event_type,
            session_id,
            conversation_id: None,
            message_id: None,
            timestamp: Timestamp::now(),
        }
    }

    /// Attach a conversation id, builder-style.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Attach a message id, builder-style.
    #[must_use]
    pub fn with_message(mut self, message_id: MessageId) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// The event's discriminant string, e.g. `"content_delta"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.event_type.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_has_no_seq() {
        let e = Event::new(SessionId::new(), EventType::SessionStart);
        assert!(e.seq.is_none());
        assert_eq!(e.kind(), "session_start");
    }

    #[test]
    fn builder_methods_attach_ids() {
        let conv = ConversationId::new();
        let msg = MessageId::new();
        let e = Event::new(SessionId::new(), EventType::MessageStart)
            .with_conversation(conv.clone())
            .with_message(msg.clone());
        assert_eq!(e.conversation_id, Some(conv));
        assert_eq!(e.message_id, Some(msg));
    }

    #[test]
    fn roundtrips_through_json() {
        let e = Event::new(
            SessionId::new(),
            EventType::ContentDelta {
                index: 0,
                text: "hi".to_string(),
            },
        );
        let json = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type, e.event_type);
    }
}
