//! Wraps [`PlanStore`] with progress-event emission and the failure
//! guidance payload.

use std::sync::Arc;

use serde::Serialize;
use turnloop_core::SessionId;
use turnloop_events::EventBroadcaster;

use crate::store::{PlanError, PlanStore};
use crate::types::{Plan, Todo, TodoStatus};

/// The three remediation options surfaced when a todo fails, carried
/// alongside the progress event and returned inline to the model from the
/// `plan` tool's own result.
#[derive(Debug, Clone, Serialize)]
pub struct FailureGuidance {
    /// The todo that failed.
    pub todo_id: String,
    /// Always exactly these three, in this order.
    pub options: [&'static str; 3],
}

impl FailureGuidance {
    fn for_todo(todo_id: impl Into<String>) -> Self {
        Self {
            todo_id: todo_id.into(),
            options: ["try_different_approach", "skip", "report_to_user"],
        }
    }
}

/// The plan state machine plus the event-emission side effects the
/// orchestrator expects whenever it changes.
pub struct PlanManager {
    store: PlanStore,
    broadcaster: Arc<EventBroadcaster>,
}

impl PlanManager {
    /// Wire a fresh store against a broadcaster.
    #[must_use]
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            store: PlanStore::new(),
            broadcaster,
        }
    }

    /// The session's current plan, if any.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<Plan> {
        self.store.get(session_id)
    }

    /// Create a fresh plan, emitting a `progress` message delta.
    pub async fn create(&self, session_id: &SessionId, todos: Vec<Todo>) -> Plan {
        let plan = self.store.create(session_id, todos);
        self.emit_progress(session_id, &plan).await;
        plan
    }

    /// Advance a single todo, emitting a `progress` delta and, on a
    /// transition into `failed`, a guidance payload in the same event.
    pub async fn update(
        &self,
        session_id: &SessionId,
        todo_id: &str,
        to: TodoStatus,
    ) -> Result<(Plan, Option<FailureGuidance>), PlanError> {
        let plan = self.store.update(session_id, todo_id, to)?;
        let guidance = (to == TodoStatus::Failed).then(|| FailureGuidance::for_todo(todo_id));
        self.emit_progress(session_id, &plan).await;
        Ok((plan, guidance))
    }

    /// Replace the plan wholesale, emitting a `progress` delta.
    pub async fn rewrite(&self, session_id: &SessionId, todos: Vec<Todo>) -> Plan {
        let plan = self.store.rewrite(session_id, todos);
        self.emit_progress(session_id, &plan).await;
        plan
    }

    async fn emit_progress(&self, session_id: &SessionId, plan: &Plan) {
        let payload = serde_json::json!({
            "todos": plan.todos,
            "has_failure": plan.has_failure(),
        });
        self.broadcaster.message_delta(session_id, "progress", payload).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnloop_events::EventStorage;

    fn broadcaster() -> Arc<EventBroadcaster> {
        Arc::new(EventBroadcaster::new(Arc::new(EventStorage::new())))
    }

    #[tokio::test]
    async fn create_emits_a_progress_event() {
        let manager = PlanManager::new(broadcaster());
        let session = SessionId::new();
        let mut rx = manager.broadcaster.subscribe(&session);

        manager.create(&session, vec![Todo::new("1", "step one")]).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "message_delta");
    }

    #[tokio::test]
    async fn failing_a_todo_returns_guidance() {
        let manager = PlanManager::new(broadcaster());
        let session = SessionId::new();
        manager.create(&session, vec![Todo::new("1", "step one")]).await;
        manager.update(&session, "1", TodoStatus::InProgress).await.unwrap();

        let (_, guidance) = manager.update(&session, "1", TodoStatus::Failed).await.unwrap();
        assert!(guidance.is_some());
        assert_eq!(guidance.unwrap().todo_id, "1");
    }
}
