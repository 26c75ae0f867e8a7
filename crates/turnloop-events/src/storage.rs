//! Per-session append-only event log (C1).

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use turnloop_core::{ConversationId, InstanceId, SessionId, Timestamp, UserId};

use crate::event::Event;

/// Default cap on how many events a single session's log retains in memory;
/// the oldest are evicted once the cap is exceeded.
pub const DEFAULT_LOG_CAP: usize = 1000;

/// Default capacity of a session's broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Per-session context, created on the first event for a session and
/// updated by [`EventStorage::update_heartbeat`] on every emission.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// The user who owns this session, if known.
    pub user_id: Option<UserId>,
    /// The active conversation, if one has started.
    pub conversation_id: Option<ConversationId>,
    /// The instance this session is running against.
    pub instance_id: Option<InstanceId>,
    /// Last time any event was recorded for this session.
    pub heartbeat_timestamp: Option<Timestamp>,
}

/// A partial update applied to a [`SessionContext`]; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionContextUpdate {
    /// New user id, if changing.
    pub user_id: Option<UserId>,
    /// New conversation id, if changing.
    pub conversation_id: Option<ConversationId>,
    /// New instance id, if changing.
    pub instance_id: Option<InstanceId>,
}

/// An adapter that may rewrite or drop an event before it is assigned a
/// `seq` and appended to the log.
///
/// Returning `None` filters the event: no `seq` is burned, nothing is
/// appended, and no subscriber is notified. This makes
/// `buffer_event` with a filtering adapter observationally equivalent to
/// never having called it.
pub trait EventAdapter: Send + Sync {
    /// Transform or drop an event.
    fn transform(&self, event: Event) -> Option<Event>;
}

struct SessionLog {
    context: SessionContext,
    events: Vec<Event>,
    next_seq: AtomicU64,
    sender: broadcast::Sender<Event>,
}

impl SessionLog {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            context: SessionContext::default(),
            events: Vec::new(),
            next_seq: AtomicU64::new(1),
            sender,
        }
    }
}

/// The append-only, in-memory per-session event log.
///
/// Storage operations are in-memory and must not fail under normal
/// conditions. Any durable persistence is best-effort and must never block
/// emission; this type does not implement one itself, leaving it to an
/// external observer subscribed via [`EventStorage::subscribe`].
pub struct EventStorage {
    sessions: DashMap<SessionId, SessionLog>,
    /// Per-session lock serializing `buffer_event` so `seq` assignment and
    /// append stay atomic together, matching the "mutex per session for the
    /// seq counter" resource model.
    append_lock: DashMap<SessionId, Arc<Mutex<()>>>,
    log_cap: usize,
}

impl EventStorage {
    /// Create storage with the default log cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_log_cap(DEFAULT_LOG_CAP)
    }

    /// Create storage with an explicit per-session log cap.
    #[must_use]
    pub fn with_log_cap(log_cap: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            append_lock: DashMap::new(),
            log_cap,
        }
    }

    fn lock_for(&self, session_id: &SessionId) -> Arc<Mutex<()>> {
        self.append_lock
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetch the session context, creating a default one if this is the
    /// first time the session has been seen.
    #[must_use]
    pub fn get_session_context(&self, session_id: &SessionId) -> SessionContext {
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(SessionLog::new)
            .context
            .clone()
    }

    /// Apply a partial update to a session's context.
    pub fn set_session_context(&self, session_id: &SessionId, update: SessionContextUpdate) {
        let mut entry = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(SessionLog::new);
        if let Some(user_id) = update.user_id {
            entry.context.user_id = Some(user_id);
        }
        if let Some(conversation_id) = update.conversation_id {
            entry.context.conversation_id = Some(conversation_id);
        }
        if let Some(instance_id) = update.instance_id {
            entry.context.instance_id = Some(instance_id);
        }
    }

    /// Stamp `seq` onto `event` and append it, evicting the oldest entry if
    /// the log exceeds its cap, then notify subscribers.
    ///
    /// If `adapter` is given and returns `None` for this event, the call is
    /// a no-op: no `seq` is burned, nothing is appended, no notification
    /// fires, and `None` is returned.
    pub async fn buffer_event(
        &self,
        session_id: &SessionId,
        event: Event,
        adapter: Option<&dyn EventAdapter>,
    ) -> Option<Event> {
        let event = match adapter {
            Some(adapter) => adapter.transform(event)?,
            None => event,
        };

        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut entry = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(SessionLog::new);

        let seq = entry.next_seq.fetch_add(1, Ordering::SeqCst);
        let mut stamped = event;
        stamped.seq = Some(seq);
        entry.context.heartbeat_timestamp = Some(Timestamp::now());
        entry.events.push(stamped.clone());
        if entry.events.len() > self.log_cap {
            let overflow = entry.events.len() - self.log_cap;
            entry.events.drain(0..overflow);
        }
        // A send error just means there are no live subscribers right now.
        let _ = entry.sender.send(stamped.clone());

        Some(stamped)
    }

    /// Refresh the heartbeat timestamp without emitting an event.
    pub fn update_heartbeat(&self, session_id: &SessionId) {
        let mut entry = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(SessionLog::new);
        entry.context.heartbeat_timestamp = Some(Timestamp::now());
    }

    /// Every event with `seq > last_seq`, in order.
    #[must_use]
    pub fn get_events_since(&self, session_id: &SessionId, last_seq: u64) -> Vec<Event> {
        self.sessions
            .get(session_id)
            .map(|entry| {
                entry
                    .events
                    .iter()
                    .filter(|e| e.seq.is_some_and(|s| s > last_seq))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The most recent `n` events, oldest first.
    #[must_use]
    pub fn get_latest(&self, session_id: &SessionId, n: usize) -> Vec<Event> {
        self.sessions
            .get(session_id)
            .map(|entry| {
                let len = entry.events.len();
                let start = len.saturating_sub(n);
                entry.events[start..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Subscribe to live events for a session. A subscriber that misses
    /// events while disconnected should call [`Self::get_events_since`] to
    /// catch up (the `Event fan-out` design note: resume via replay, not
    /// buffered delivery).
    #[must_use]
    pub fn subscribe(&self, session_id: &SessionId) -> broadcast::Receiver<Event> {
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(SessionLog::new)
            .sender
            .subscribe()
    }

    /// Drop all state for a session, including its broadcast channel
    /// (closing it, which drains any pending receivers).
    pub fn cleanup_session(&self, session_id: &SessionId) {
        self.sessions.remove(session_id);
        self.append_lock.remove(session_id);
    }
}

impl Default for EventStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    fn mk_event(session_id: &SessionId, n: u32) -> Event {
        Event::new(
            session_id.clone(),
            EventType::ContentDelta {
                index: 0,
                text: n.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn seq_is_monotonic_and_gapless() {
        let storage = EventStorage::new();
        let session_id = SessionId::new();
        let mut last = 0;
        for i in 0..5 {
            let stamped = storage
                .buffer_event(&session_id, mk_event(&session_id, i), None)
                .await
                .unwrap();
            let seq = stamped.seq.unwrap();
            assert_eq!(seq, last + 1);
            last = seq;
        }
    }

    #[tokio::test]
    async fn adapter_returning_none_burns_no_seq() {
        struct DropAll;
        impl EventAdapter for DropAll {
            fn transform(&self, _event: Event) -> Option<Event> {
                None
            }
        }

        let storage = EventStorage::new();
        let session_id = SessionId::new();
        let result = storage
            .buffer_event(&session_id, mk_event(&session_id, 0), Some(&DropAll))
            .await;
        assert!(result.is_none());
        assert!(storage.get_events_since(&session_id, 0).is_empty());

        // The next real event still starts at seq 1, proving nothing was burned.
        let stamped = storage
            .buffer_event(&session_id, mk_event(&session_id, 1), None)
            .await
            .unwrap();
        assert_eq!(stamped.seq, Some(1));
    }

    #[tokio::test]
    async fn eviction_respects_log_cap() {
        let storage = EventStorage::with_log_cap(3);
        let session_id = SessionId::new();
        for i in 0..10 {
            storage
                .buffer_event(&session_id, mk_event(&session_id, i), None)
                .await;
        }
        let latest = storage.get_latest(&session_id, 100);
        assert_eq!(latest.len(), 3);
        assert_eq!(latest.last().unwrap().seq, Some(10));
    }

    #[tokio::test]
    async fn get_events_since_filters_correctly() {
        let storage = EventStorage::new();
        let session_id = SessionId::new();
        for i in 0..5 {
            storage
                .buffer_event(&session_id, mk_event(&session_id, i), None)
                .await;
        }
        let since = storage.get_events_since(&session_id, 3);
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].seq, Some(4));
    }

    #[tokio::test]
    async fn cleanup_removes_session_state() {
        let storage = EventStorage::new();
        let session_id = SessionId::new();
        storage
            .buffer_event(&session_id, mk_event(&session_id, 0), None)
            .await;
        storage.cleanup_session(&session_id);
        assert!(storage.get_latest(&session_id, 10).is_empty());
    }

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let storage = EventStorage::new();
        let session_id = SessionId::new();
        let mut rx = storage.subscribe(&session_id);
        storage
            .buffer_event(&session_id, mk_event(&session_id, 0), None)
            .await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.seq, Some(1));
    }
}
