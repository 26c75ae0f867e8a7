//! Progressive-disclosure rendering of a plan into prompt markdown.

use crate::types::{Plan, TodoStatus};

const RECENT_COMPLETED: usize = 3;
const UPCOMING_VISIBLE: usize = 2;

const FILE_MODIFYING_KEYWORDS: &[&str] = &["delete", "remove", "overwrite", "rewrite", "drop ", "rm ", "truncate"];

/// Render a plan as markdown suitable for appending to the turn's final
/// user message: the most recent completed steps in full, older completed
/// steps collapsed to a count, all active steps in full, the next couple
/// of pending steps in full, and any further pending steps collapsed to a
/// count. Adds a reflection-guidance line when a step has failed, and a
/// safety notice when any step's description mentions file modification.
#[must_use]
pub fn render_markdown(plan: &Plan) -> String {
    let completed: Vec<_> = plan.todos.iter().filter(|t| t.status == TodoStatus::Completed).collect();
    let active: Vec<_> = plan
        .todos
        .iter()
        .filter(|t| matches!(t.status, TodoStatus::InProgress | TodoStatus::Failed))
        .collect();
    let pending: Vec<_> = plan.todos.iter().filter(|t| t.status == TodoStatus::Pending).collect();

    let mut lines = Vec::new();

    if completed.len() > RECENT_COMPLETED {
        lines.push(format!("- ({} earlier step(s) completed)", completed.len() - RECENT_COMPLETED));
    }
    let mut shown_completed: Vec<_> = completed.iter().rev().take(RECENT_COMPLETED).collect();
    shown_completed.reverse();
    for todo in shown_completed {
        lines.push(format!("- [x] {}", todo.content));
    }

    for todo in &active {
        match todo.status {
            TodoStatus::InProgress => lines.push(format!("- [ ] **{}** (in progress)", todo.content)),
            TodoStatus::Failed => lines.push(format!("- [ ] {} (FAILED)", todo.content)),
            TodoStatus::Completed | TodoStatus::Pending => unreachable!("filtered above"),
        }
    }

    for todo in pending.iter().take(UPCOMING_VISIBLE) {
        lines.push(format!("- [ ] {}", todo.content));
    }
    if pending.len() > UPCOMING_VISIBLE {
        lines.push(format!("- … {} more", pending.len() - UPCOMING_VISIBLE));
    }

    if plan.has_failure() {
        lines.push(String::new());
        lines.push(
            "A step failed. Choose a different approach, skip it, or report the blocker to the \
             user — don't repeat the same action."
                .to_string(),
        );
    }

    if plan
        .todos
        .iter()
        .any(|t| FILE_MODIFYING_KEYWORDS.iter().any(|kw| t.content.to_lowercase().contains(kw)))
    {
        lines.push(String::new());
        lines.push(
            "Note: this plan modifies or removes existing files. Confirm scope before executing \
             those steps."
                .to_string(),
        );
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Todo;

    fn todo(id: &str, content: &str, status: TodoStatus) -> Todo {
        let mut t = Todo::new(id, content);
        t.status = status;
        t
    }

    #[test]
    fn collapses_completed_beyond_recent_window() {
        let plan = Plan {
            todos: vec![
                todo("1", "a", TodoStatus::Completed),
                todo("2", "b", TodoStatus::Completed),
                todo("3", "c", TodoStatus::Completed),
                todo("4", "d", TodoStatus::Completed),
                todo("5", "e", TodoStatus::Pending),
            ],
        };
        let rendered = render_markdown(&plan);
        assert!(rendered.contains("(1 earlier step(s) completed)"));
        assert!(!rendered.contains("[x] a"));
        assert!(rendered.contains("[x] d"));
    }

    #[test]
    fn summarizes_pending_beyond_upcoming_window() {
        let plan = Plan {
            todos: vec![
                todo("1", "a", TodoStatus::Pending),
                todo("2", "b", TodoStatus::Pending),
                todo("3", "c", TodoStatus::Pending),
            ],
        };
        let rendered = render_markdown(&plan);
        assert!(rendered.contains("… 1 more"));
    }

    #[test]
    fn adds_reflection_guidance_on_failure() {
        let plan = Plan {
            todos: vec![todo("1", "a", TodoStatus::Failed)],
        };
        assert!(render_markdown(&plan).contains("Choose a different approach"));
    }

    #[test]
    fn adds_safety_notice_for_file_modifying_steps() {
        let plan = Plan {
            todos: vec![todo("1", "delete the old config file", TodoStatus::Pending)],
        };
        assert!(render_markdown(&plan).contains("modifies or removes existing files"));
    }

    #[test]
    fn no_notices_for_a_plain_plan() {
        let plan = Plan {
            todos: vec![todo("1", "write the report summary", TodoStatus::Pending)],
        };
        let rendered = render_markdown(&plan);
        assert!(!rendered.contains("Choose a different approach"));
        assert!(!rendered.contains("modifies or removes"));
    }
}
