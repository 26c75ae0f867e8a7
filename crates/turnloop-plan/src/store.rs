//! Per-session plan storage and the state-machine transition rules.

use dashmap::DashMap;
use turnloop_core::{SessionId, Timestamp};

use crate::types::{is_valid_transition, Plan, Todo, TodoStatus};

/// Errors raised by a plan mutation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlanError {
    /// No plan exists for this session yet.
    #[error("no plan exists for this session")]
    NoPlan,
    /// No todo with the given id exists in the session's plan.
    #[error("unknown todo id: {0}")]
    UnknownTodo(String),
    /// The requested status change is not a valid direct transition.
    /// `failed -> pending` is never valid here; use `rewrite` instead.
    #[error("invalid transition for todo {todo_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// The todo that was targeted.
        todo_id: String,
        /// Its status before the rejected change.
        from: TodoStatus,
        /// The status that was requested.
        to: TodoStatus,
    },
}

/// Holds at most one active [`Plan`] per session.
#[derive(Default)]
pub struct PlanStore {
    plans: DashMap<SessionId, Plan>,
}

impl PlanStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the session's plan, if one exists.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<Plan> {
        self.plans.get(session_id).map(|p| p.clone())
    }

    /// Replace the session's plan wholesale with a fresh, all-pending set
    /// of todos. This is the only way to create a plan for a session that
    /// doesn't have one yet.
    pub fn create(&self, session_id: &SessionId, todos: Vec<Todo>) -> Plan {
        let plan = Plan { todos };
        self.plans.insert(session_id.clone(), plan.clone());
        plan
    }

    /// Move a single todo through the state machine. Rejects any change
    /// that isn't a valid forward edge, including `failed -> pending`.
    pub fn update(
        &self,
        session_id: &SessionId,
        todo_id: &str,
        to: TodoStatus,
    ) -> Result<Plan, PlanError> {
        let mut plan_ref = self.plans.get_mut(session_id).ok_or(PlanError::NoPlan)?;
        let todo = plan_ref
            .todos
            .iter_mut()
            .find(|t| t.id == todo_id)
            .ok_or_else(|| PlanError::UnknownTodo(todo_id.to_string()))?;

        if !is_valid_transition(todo.status, to) {
            return Err(PlanError::InvalidTransition {
                todo_id: todo_id.to_string(),
                from: todo.status,
                to,
            });
        }

        todo.status = to;
        todo.completed_at = if to == TodoStatus::Completed {
            Some(Timestamp::now())
        } else {
            None
        };

        Ok(plan_ref.clone())
    }

    /// Replace the session's plan wholesale. This is the only operation
    /// that may move a todo backward (e.g. `failed -> pending`) or drop /
    /// reorder todos outright; it performs no transition validation of its
    /// own. A todo that remains `completed` across the rewrite keeps its
    /// original `completed_at`; one that becomes `completed` for the first
    /// time here is stamped now; any other status clears it.
    pub fn rewrite(&self, session_id: &SessionId, mut todos: Vec<Todo>) -> Plan {
        let previous = self.get(session_id);
        for todo in &mut todos {
            let was_completed = previous
                .as_ref()
                .and_then(|p| p.todos.iter().find(|t| t.id == todo.id))
                .is_some_and(|prev| prev.status == TodoStatus::Completed);

            todo.completed_at = match (todo.status, was_completed, &todo.completed_at) {
                (TodoStatus::Completed, true, Some(existing)) => Some(existing.clone()),
                (TodoStatus::Completed, _, _) => Some(Timestamp::now()),
                _ => None,
            };
        }
        let plan = Plan { todos };
        self.plans.insert(session_id.clone(), plan.clone());
        plan
    }

    /// Drop a session's plan entirely.
    pub fn clear(&self, session_id: &SessionId) {
        self.plans.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_advance_stamps_completed_at() {
        let store = PlanStore::new();
        let session = SessionId::new();
        store.create(&session, vec![Todo::new("1", "do a thing")]);

        store.update(&session, "1", TodoStatus::InProgress).unwrap();
        let plan = store.update(&session, "1", TodoStatus::Completed).unwrap();
        assert!(plan.todos[0].completed_at.is_some());
    }

    #[test]
    fn failed_to_pending_is_rejected_via_update() {
        let store = PlanStore::new();
        let session = SessionId::new();
        store.create(&session, vec![Todo::new("1", "x")]);
        store.update(&session, "1", TodoStatus::InProgress).unwrap();
        store.update(&session, "1", TodoStatus::Failed).unwrap();

        let err = store.update(&session, "1", TodoStatus::Pending).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition { .. }));
    }

    #[test]
    fn rewrite_can_reset_a_failed_todo_to_pending() {
        let store = PlanStore::new();
        let session = SessionId::new();
        store.create(&session, vec![Todo::new("1", "x")]);
        store.update(&session, "1", TodoStatus::InProgress).unwrap();
        store.update(&session, "1", TodoStatus::Failed).unwrap();

        let mut todo = Todo::new("1", "x");
        todo.status = TodoStatus::Pending;
        let plan = store.rewrite(&session, vec![todo]);
        assert_eq!(plan.todos[0].status, TodoStatus::Pending);
    }

    #[test]
    fn rewrite_preserves_original_completed_at() {
        let store = PlanStore::new();
        let session = SessionId::new();
        store.create(&session, vec![Todo::new("1", "x")]);
        store.update(&session, "1", TodoStatus::InProgress).unwrap();
        let first = store.update(&session, "1", TodoStatus::Completed).unwrap();
        let stamped = first.todos[0].completed_at.clone().unwrap();

        let mut todo = first.todos[0].clone();
        todo.content = "x renamed".to_string();
        let rewritten = store.rewrite(&session, vec![todo]);
        assert_eq!(rewritten.todos[0].completed_at, Some(stamped));
    }

    #[test]
    fn unknown_todo_id_is_rejected() {
        let store = PlanStore::new();
        let session = SessionId::new();
        store.create(&session, vec![Todo::new("1", "x")]);
        let err = store.update(&session, "nope", TodoStatus::InProgress).unwrap_err();
        assert_eq!(err, PlanError::UnknownTodo("nope".to_string()));
    }
}
