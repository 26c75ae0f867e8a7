//! Per-conversation turn state: message history and identifiers.

use tokio_util::sync::CancellationToken;
use turnloop_core::{ConversationId, SessionId};
use turnloop_llm::{Message, MessageContent, MessageRole};

/// The durable part of one conversation's state across turns. Does not
/// carry the plan (owned by [`turnloop_plan::PlanStore`], keyed by
/// `session_id`) or the working-directory snapshots (owned by
/// [`turnloop_state::StateManager`]) — those are looked up fresh each turn
/// rather than duplicated here.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable identity for events, plan lookups, and state snapshots.
    pub id: SessionId,
    /// Identity for the current conversation within the session.
    pub conversation_id: ConversationId,
    /// Committed message history, oldest first. Only ever appended to at
    /// the end of a fully completed turn; the working list built for an
    /// in-progress turn is assembled separately and discarded if the turn
    /// fails before completing.
    pub messages: Vec<Message>,
    /// Turns completed so far, for the `max_turns` cap.
    pub turn_count: u32,
    /// Cancelled by the frontend (e.g. Ctrl+C) to request an early stop of
    /// whatever `run_turn` call is in flight for this session. The turn
    /// loop checks it cooperatively between turns and while awaiting the
    /// model stream; it is never forcibly aborted.
    pub cancel_token: CancellationToken,
}

impl Session {
    /// Start a fresh session with no history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            conversation_id: ConversationId::new(),
            messages: Vec::new(),
            turn_count: 0,
            cancel_token: CancellationToken::new(),
        }
    }

    /// A short rendering of the last assistant/user exchange, for the
    /// Intent Analyzer's `is_follow_up` judgment. `None` on the first turn.
    #[must_use]
    pub fn recent_context(&self) -> Option<String> {
        let last = self.messages.iter().rev().find_map(|m| match (&m.role, &m.content) {
            (MessageRole::User | MessageRole::Assistant, MessageContent::Text(text)) => {
                Some(format!("{:?}: {text}", m.role))
            }
            _ => None,
        });
        last
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_has_no_recent_context() {
        let session = Session::new();
        assert!(session.recent_context().is_none());
    }

    #[test]
    fn recent_context_picks_the_last_text_message() {
        let mut session = Session::new();
        session.messages.push(Message::user("first"));
        session.messages.push(Message::assistant("reply"));
        let context = session.recent_context().unwrap();
        assert!(context.contains("reply"));
    }

    #[test]
    fn fresh_session_is_not_cancelled_until_told_to_be() {
        let session = Session::new();
        assert!(!session.cancel_token.is_cancelled());
        session.cancel_token.cancel();
        assert!(session.cancel_token.is_cancelled());
    }
}
