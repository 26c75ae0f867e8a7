//! The single API surface agent code uses to emit events (C2).

use tokio::sync::broadcast;
use turnloop_core::{ConversationId, MessageId, SessionId};

use crate::event::{ContentBlockType, Event, EventType};
use crate::storage::{EventAdapter, EventStorage};

/// Stamps events with a fresh UUID and session context, then hands them to
/// [`EventStorage::buffer_event`]. There is no `seq` logic here; every
/// sequencing decision lives in C1.
#[derive(Clone)]
pub struct EventBroadcaster {
    storage: std::sync::Arc<EventStorage>,
}

impl EventBroadcaster {
    /// Wrap a shared event storage.
    #[must_use]
    pub fn new(storage: std::sync::Arc<EventStorage>) -> Self {
        Self { storage }
    }

    /// The storage this broadcaster delegates to.
    #[must_use]
    pub fn storage(&self) -> &EventStorage {
        &self.storage
    }

    /// Emit an event, filling in `conversation_id` from the session context
    /// when the caller left it unset.
    pub async fn emit(&self, session_id: &SessionId, event_type: EventType) -> Option<Event> {
        self.emit_with(session_id, event_type, None).await
    }

    /// Emit an event through an adapter.
    pub async fn emit_with(
        &self,
        session_id: &SessionId,
        event_type: EventType,
        adapter: Option<&dyn EventAdapter>,
    ) -> Option<Event> {
        let mut event = Event::new(session_id.clone(), event_type);
        if event.conversation_id.is_none() {
            event.conversation_id = self.storage.get_session_context(session_id).conversation_id;
        }
        let emitted = self.storage.buffer_event(session_id, event, adapter).await;
        self.storage.update_heartbeat(session_id);
        emitted
    }

    /// A session-bound channel of emitted events. Closing the session via
    /// [`EventStorage::cleanup_session`] drains and closes it.
    #[must_use]
    pub fn subscribe(&self, session_id: &SessionId) -> broadcast::Receiver<Event> {
        self.storage.subscribe(session_id)
    }

    // -- session level --

    /// Emit `session_start`.
    pub async fn session_start(&self, session_id: &SessionId) -> Option<Event> {
        self.emit(session_id, EventType::SessionStart).await
    }

    /// Emit `session_stopped` with a reason.
    pub async fn session_stopped(
        &self,
        session_id: &SessionId,
        reason: impl Into<String>,
    ) -> Option<Event> {
        self.emit(
            session_id,
            EventType::SessionStopped {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Emit `session_end` with a terminal status (`completed`, `failed`,
    /// `stopped`).
    pub async fn session_end(
        &self,
        session_id: &SessionId,
        status: impl Into<String>,
    ) -> Option<Event> {
        self.emit(
            session_id,
            EventType::SessionEnd {
                status: status.into(),
            },
        )
        .await
    }

    // -- conversation level --

    /// Emit `conversation_start`, binding `conversation_id` on the session
    /// context so later events inherit it.
    pub async fn conversation_start(
        &self,
        session_id: &SessionId,
        conversation_id: ConversationId,
    ) -> Option<Event> {
        self.storage.set_session_context(
            session_id,
            crate::storage::SessionContextUpdate {
                conversation_id: Some(conversation_id.clone()),
                ..Default::default()
            },
        );
        let mut event = Event::new(session_id.clone(), EventType::ConversationStart)
            .with_conversation(conversation_id);
        event = match self.storage.buffer_event(session_id, event, None).await {
            Some(e) => e,
            None => return None,
        };
        self.storage.update_heartbeat(session_id);
        Some(event)
    }

    /// Emit a `conversation_delta` for `title`, `metadata`, or `compressed`.
    pub async fn conversation_delta(
        &self,
        session_id: &SessionId,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<Event> {
        self.emit(
            session_id,
            EventType::ConversationDelta {
                field: field.into(),
                value,
            },
        )
        .await
    }

    // -- message level --

    /// Emit `message_start`.
    pub async fn message_start(
        &self,
        session_id: &SessionId,
        message_id: MessageId,
    ) -> Option<Event> {
        let event = Event::new(session_id.clone(), EventType::MessageStart).with_message(message_id);
        let stamped = self.storage.buffer_event(session_id, event, None).await;
        self.storage.update_heartbeat(session_id);
        stamped
    }

    /// Emit a `message_delta` of the given side-channel kind.
    pub async fn message_delta(
        &self,
        session_id: &SessionId,
        kind: impl Into<String>,
        content: serde_json::Value,
    ) -> Option<Event> {
        self.emit(
            session_id,
            EventType::MessageDelta {
                kind: kind.into(),
                content,
            },
        )
        .await
    }

    /// Emit `message_stop`.
    pub async fn message_stop(&self, session_id: &SessionId) -> Option<Event> {
        self.emit(session_id, EventType::MessageStop).await
    }

    // -- content level --

    /// Emit `content_start` for a block at `index`.
    pub async fn content_start(
        &self,
        session_id: &SessionId,
        index: u32,
        block_type: ContentBlockType,
    ) -> Option<Event> {
        self.emit(session_id, EventType::ContentStart { index, block_type })
            .await
    }

    /// Emit `content_delta` carrying raw incremental text for `index`.
    pub async fn content_delta(
        &self,
        session_id: &SessionId,
        index: u32,
        text: impl Into<String>,
    ) -> Option<Event> {
        self.emit(
            session_id,
            EventType::ContentDelta {
                index,
                text: text.into(),
            },
        )
        .await
    }

    /// Emit `content_stop` for `index`.
    pub async fn content_stop(&self, session_id: &SessionId, index: u32) -> Option<Event> {
        self.emit(session_id, EventType::ContentStop { index }).await
    }

    // -- system level --

    /// Emit a terminal `error` event.
    pub async fn error(
        &self,
        session_id: &SessionId,
        message: impl Into<String>,
        error_type: turnloop_core::ErrorType,
    ) -> Option<Event> {
        self.emit(
            session_id,
            EventType::Error {
                message: message.into(),
                error_type: error_type.to_string(),
            },
        )
        .await
    }

    /// Emit the final `done` event. Always the last event of a turn.
    pub async fn done(&self, session_id: &SessionId) -> Option<Event> {
        self.emit(session_id, EventType::Done).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn conversation_id_propagates_to_later_events() {
        let storage = Arc::new(EventStorage::new());
        let broadcaster = EventBroadcaster::new(storage);
        let session_id = SessionId::new();
        let conversation_id = ConversationId::new();

        broadcaster
            .conversation_start(&session_id, conversation_id.clone())
            .await;
        let msg = broadcaster
            .message_start(&session_id, MessageId::new())
            .await
            .unwrap();

        assert_eq!(msg.conversation_id, Some(conversation_id));
    }

    #[tokio::test]
    async fn done_is_observable_via_subscription() {
        let storage = Arc::new(EventStorage::new());
        let broadcaster = EventBroadcaster::new(storage);
        let session_id = SessionId::new();
        let mut rx = broadcaster.subscribe(&session_id);

        broadcaster.session_start(&session_id).await;
        broadcaster.done(&session_id).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind(), "session_start");
        assert_eq!(second.kind(), "done");
    }

    #[tokio::test]
    async fn cleanup_drains_subscriber() {
        let storage = Arc::new(EventStorage::new());
        let broadcaster = EventBroadcaster::new(storage.clone());
        let session_id = SessionId::new();
        let mut rx = broadcaster.subscribe(&session_id);

        broadcaster.session_start(&session_id).await;
        storage.cleanup_session(&session_id);

        // The old channel still yields what was already sent, then closes.
        assert!(rx.recv().await.is_ok());
        assert!(rx.recv().await.is_err());
    }
}
