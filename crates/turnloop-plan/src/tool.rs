//! The `plan` tool: the sole mutator of a session's plan state.

use serde::Deserialize;
use turnloop_core::ErrorType;
use turnloop_tools::{BuiltinTool, StructuredValue, ToolContext, ToolError, ToolResult};

use crate::manager::PlanManager;
use crate::types::{Todo, TodoStatus};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum PlanAction {
    Create { todos: Vec<TodoInput> },
    Update { todo_id: String, status: TodoStatus },
    Rewrite { todos: Vec<TodoInput> },
}

#[derive(Debug, Deserialize)]
struct TodoInput {
    id: String,
    content: String,
    #[serde(default)]
    status: Option<TodoStatus>,
    #[serde(default)]
    required_skills: Vec<String>,
}

impl From<TodoInput> for Todo {
    fn from(input: TodoInput) -> Self {
        let mut todo = Todo::new(input.id, input.content);
        if let Some(status) = input.status {
            todo.status = status;
        }
        todo.required_skills = input.required_skills;
        todo
    }
}

/// Exposes create/update/rewrite as the model's only way to mutate a
/// plan. There is no separate read path on this tool; the current plan is
/// always visible to the model through the injected todo markdown instead.
pub struct PlanTool {
    manager: std::sync::Arc<PlanManager>,
}

impl PlanTool {
    /// Wire the tool against a shared plan manager.
    #[must_use]
    pub fn new(manager: std::sync::Arc<PlanManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl BuiltinTool for PlanTool {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn description(&self) -> &'static str {
        "Create, update, or wholesale rewrite the current task's step-by-step plan."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["create", "update", "rewrite"]},
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string"},
                            "content": {"type": "string"},
                            "status": {"type": "string", "enum": ["pending", "in_progress", "completed", "failed"]},
                            "required_skills": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["id", "content"]
                    }
                },
                "todo_id": {"type": "string"},
                "status": {"type": "string", "enum": ["pending", "in_progress", "completed", "failed"]}
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let action: PlanAction = serde_json::from_value(args)
            .map_err(|e| ToolError::new(format!("invalid plan arguments: {e}"), ErrorType::InputInvalid))?;

        match action {
            PlanAction::Create { todos } => {
                let todos = todos.into_iter().map(Into::into).collect();
                let plan = self.manager.create(&ctx.session_id, todos).await;
                Ok(plan_to_value(&plan, None))
            }
            PlanAction::Update { todo_id, status } => {
                let (plan, guidance) = self
                    .manager
                    .update(&ctx.session_id, &todo_id, status)
                    .await
                    .map_err(|e| ToolError::new(e.to_string(), ErrorType::InputInvalid))?;
                Ok(plan_to_value(&plan, guidance))
            }
            PlanAction::Rewrite { todos } => {
                let todos = todos.into_iter().map(Into::into).collect();
                let plan = self.manager.rewrite(&ctx.session_id, todos).await;
                Ok(plan_to_value(&plan, None))
            }
        }
    }
}

fn plan_to_value(plan: &crate::types::Plan, guidance: Option<crate::manager::FailureGuidance>) -> StructuredValue {
    let mut value = serde_json::json!({ "todos": plan.todos });
    if let Some(guidance) = guidance {
        value["guidance"] = serde_json::json!(guidance);
    }
    serde_json::from_value(value).unwrap_or(StructuredValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use turnloop_core::{InstanceId, SessionId};
    use turnloop_events::{EventBroadcaster, EventStorage};

    fn ctx() -> ToolContext {
        let storage = Arc::new(EventStorage::new());
        let broadcaster = Arc::new(EventBroadcaster::new(storage));
        ToolContext::new(SessionId::new(), InstanceId::new(), broadcaster)
    }

    #[tokio::test]
    async fn create_then_update_round_trips_through_the_tool() {
        let manager = Arc::new(PlanManager::new(Arc::new(EventBroadcaster::new(Arc::new(
            EventStorage::new(),
        )))));
        let tool = PlanTool::new(manager);
        let ctx = ctx();

        let create_args = serde_json::json!({
            "action": "create",
            "todos": [{"id": "1", "content": "step one"}]
        });
        tool.execute(create_args, &ctx).await.unwrap();

        let update_args = serde_json::json!({
            "action": "update",
            "todo_id": "1",
            "status": "in_progress"
        });
        let result = tool.execute(update_args, &ctx).await.unwrap();
        assert!(result.render().contains("in_progress"));
    }

    #[tokio::test]
    async fn invalid_transition_surfaces_as_input_invalid() {
        let manager = Arc::new(PlanManager::new(Arc::new(EventBroadcaster::new(Arc::new(
            EventStorage::new(),
        )))));
        let tool = PlanTool::new(manager);
        let ctx = ctx();

        let create_args = serde_json::json!({
            "action": "create",
            "todos": [{"id": "1", "content": "step one"}]
        });
        tool.execute(create_args, &ctx).await.unwrap();

        let bad_update = serde_json::json!({
            "action": "update",
            "todo_id": "1",
            "status": "completed"
        });
        let err = tool.execute(bad_update, &ctx).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::InputInvalid);
    }
}
