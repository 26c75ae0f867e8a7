//! Prompt Cache (C6): per-instance pre-rendered system prompts plus a
//! mutable runtime-context dictionary.

use std::sync::RwLock;

/// The three complexity tiers a pre-rendered system prompt exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptTier {
    /// Minimal system prompt for simple, single-step turns.
    Simple,
    /// Standard system prompt for ordinary turns.
    Medium,
    /// Full system prompt, used when a plan is needed or the task is
    /// complex.
    Complex,
}

/// A structured description of the instance: chosen model and the
/// plan/intent knobs that gate orchestrator behavior.
#[derive(Debug, Clone)]
pub struct AgentSchema {
    /// Model identifier this instance is configured to use.
    pub model: String,
    /// Hard cap on turns per session.
    pub max_turns: u32,
    /// Whether the intent analyzer runs at all for this instance.
    pub intent_enabled: bool,
    /// Whether the plan/todo tool is exposed to the model.
    pub plan_enabled: bool,
}

impl Default for AgentSchema {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_turns: 100,
            intent_enabled: true,
            plan_enabled: true,
        }
    }
}

/// Per-instance mutable dictionary carrying the four runtime-context
/// prompts. Modeled as a small typed struct, initialized once at load and
/// treated as read-only thereafter; Phase-1 injectors consume it by
/// reference.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    /// Listing of available external APIs, rendered for the model.
    pub apis_prompt: Option<String>,
    /// Framework rules/constraints prompt.
    pub framework_prompt: Option<String>,
    /// Detected environment (OS, shell, project type) prompt.
    pub environment_prompt: Option<String>,
    /// Rendered skills listing.
    pub skills_prompt: Option<String>,
}

struct Tiers {
    simple: String,
    medium: String,
    complex: String,
}

/// Three rendered system prompts, an agent schema, and a runtime-context
/// dictionary, loaded once at instance start and read-mostly thereafter.
///
/// Loading is guarded by a single-writer lock; readers never block each
/// other once loaded.
pub struct PromptCache {
    tiers: RwLock<Option<Tiers>>,
    schema: RwLock<Option<AgentSchema>>,
    runtime_context: RwLock<RuntimeContext>,
}

impl PromptCache {
    /// An empty, not-yet-loaded cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiers: RwLock::new(None),
            schema: RwLock::new(None),
            runtime_context: RwLock::new(RuntimeContext::default()),
        }
    }

    /// Render and install the three tiers, the schema, and the runtime
    /// context in one atomic step. Calling this a second time replaces the
    /// previous load; callers are expected to call it once at instance
    /// start.
    pub fn load(
        &self,
        simple: String,
        medium: String,
        complex: String,
        schema: AgentSchema,
        runtime_context: RuntimeContext,
    ) {
        *self.tiers.write().unwrap_or_else(|e| e.into_inner()) = Some(Tiers { simple, medium, complex });
        *self.schema.write().unwrap_or_else(|e| e.into_inner()) = Some(schema);
        *self.runtime_context.write().unwrap_or_else(|e| e.into_inner()) = runtime_context;
    }

    /// Whether [`Self::load`] has been called.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.tiers.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// The rendered system prompt for a tier, if loaded.
    #[must_use]
    pub fn system_prompt(&self, tier: PromptTier) -> Option<String> {
        self.tiers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|t| match tier {
                PromptTier::Simple => t.simple.clone(),
                PromptTier::Medium => t.medium.clone(),
                PromptTier::Complex => t.complex.clone(),
            })
    }

    /// The loaded agent schema, if any.
    #[must_use]
    pub fn agent_schema(&self) -> Option<AgentSchema> {
        self.schema.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// A snapshot of the runtime-context dictionary.
    #[must_use]
    pub fn runtime_context(&self) -> RuntimeContext {
        self.runtime_context.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for PromptCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_cache_has_no_prompts() {
        let cache = PromptCache::new();
        assert!(!cache.is_loaded());
        assert!(cache.system_prompt(PromptTier::Simple).is_none());
    }

    #[test]
    fn load_installs_all_tiers() {
        let cache = PromptCache::new();
        cache.load(
            "simple".to_string(),
            "medium".to_string(),
            "complex".to_string(),
            AgentSchema::default(),
            RuntimeContext::default(),
        );
        assert!(cache.is_loaded());
        assert_eq!(cache.system_prompt(PromptTier::Complex).as_deref(), Some("complex"));
    }
}
