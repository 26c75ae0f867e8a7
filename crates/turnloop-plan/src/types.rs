//! Plan and todo data types.

use serde::{Deserialize, Serialize};
use turnloop_core::Timestamp;

/// A todo's place in the state machine: `pending -> in_progress ->
/// {completed, failed}`. The only way back from `failed` to `pending` is a
/// wholesale [`crate::store::PlanStore::rewrite`]; there is no direct
/// transition for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not yet started.
    Pending,
    /// Actively being worked.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Attempted and did not succeed.
    Failed,
}

/// Whether `from -> to` is a valid direct state-machine transition.
#[must_use]
pub fn is_valid_transition(from: TodoStatus, to: TodoStatus) -> bool {
    matches!(
        (from, to),
        (TodoStatus::Pending, TodoStatus::InProgress)
            | (TodoStatus::InProgress, TodoStatus::Completed)
            | (TodoStatus::InProgress, TodoStatus::Failed)
    )
}

/// A single step of a plan, model-supplied id and content with a
/// runtime-tracked status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    /// The model-supplied identifier, stable across updates to this todo.
    pub id: String,
    /// Human-readable description of the step.
    pub content: String,
    /// Current state-machine position.
    pub status: TodoStatus,
    /// When this todo most recently transitioned to `completed`. Always
    /// `None` for any other status; set exactly once per completion and
    /// cleared if a rewrite moves the todo off `completed`.
    pub completed_at: Option<Timestamp>,
    /// Skill names this step is expected to need, used by the skill-focus
    /// injector to widen its selection beyond the intent analyzer's guess.
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl Todo {
    /// A freshly created todo, always `pending` with no completion time.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status: TodoStatus::Pending,
            completed_at: None,
            required_skills: Vec::new(),
        }
    }
}

/// An ordered, session-scoped list of todos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Steps, in creation order.
    pub todos: Vec<Todo>,
}

impl Plan {
    /// Whether any todo is currently `failed`.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.todos.iter().any(|t| t.status == TodoStatus::Failed)
    }

    /// Skill names required by any todo, deduplicated in first-seen order.
    #[must_use]
    pub fn required_skills(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for todo in &self.todos {
            for skill in &todo.required_skills {
                if !seen.contains(skill) {
                    seen.push(skill.clone());
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions_are_exactly_the_forward_edges() {
        assert!(is_valid_transition(TodoStatus::Pending, TodoStatus::InProgress));
        assert!(is_valid_transition(TodoStatus::InProgress, TodoStatus::Completed));
        assert!(is_valid_transition(TodoStatus::InProgress, TodoStatus::Failed));
        assert!(!is_valid_transition(TodoStatus::Failed, TodoStatus::Pending));
        assert!(!is_valid_transition(TodoStatus::Completed, TodoStatus::InProgress));
        assert!(!is_valid_transition(TodoStatus::Pending, TodoStatus::Completed));
    }

    #[test]
    fn required_skills_are_deduplicated() {
        let plan = Plan {
            todos: vec![
                Todo {
                    required_skills: vec!["a".to_string(), "b".to_string()],
                    ..Todo::new("1", "first")
                },
                Todo {
                    required_skills: vec!["b".to_string(), "c".to_string()],
                    ..Todo::new("2", "second")
                },
            ],
        };
        assert_eq!(plan.required_skills(), vec!["a", "b", "c"]);
    }
}
