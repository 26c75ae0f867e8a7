//! In-process handler registry, the first resolution step of C4.

use std::collections::HashMap;
use turnloop_llm::LlmToolDefinition;

use crate::context::BuiltinTool;

/// Registry of in-process tool handlers.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn BuiltinTool>>,
}

impl ToolRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, keyed by its name.
    pub fn register(&mut self, tool: Box<dyn BuiltinTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a handler by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BuiltinTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Whether `name` refers to a registered in-process handler.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Every registered tool's LLM-facing definition.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<LlmToolDefinition> {
        self.tools
            .values()
            .map(|t| {
                LlmToolDefinition::new(t.name())
                    .with_description(t.description())
                    .with_schema(t.input_schema())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ToolContext, ToolResult};
    use crate::value::StructuredValue;

    struct Echo;

    #[async_trait::async_trait]
    impl BuiltinTool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn description(&self) -> &'static str {
            "echoes input"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> ToolResult {
            Ok(StructuredValue::String("echo".to_string()))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Echo));
        assert!(registry.contains("echo"));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.all_definitions().len(), 1);
    }
}
