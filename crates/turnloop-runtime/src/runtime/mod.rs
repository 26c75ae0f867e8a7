//! Agent Orchestrator (C11) — the main turn loop tying every other
//! component together.

use std::sync::Arc;

use turnloop_capabilities::CapabilityRegistry;
use turnloop_events::EventBroadcaster;
use turnloop_intent::IntentAnalyzer;
use turnloop_llm::LlmProvider;
use turnloop_plan::PlanManager;
use turnloop_prompt::InjectionOrchestrator;
use turnloop_state::StateManager;
use turnloop_tools::ToolExecutor;

use crate::config::RuntimeConfig;

mod execution;

/// Wires the Prompt Cache / Injection Orchestrator, the Intent Analyzer,
/// the Tool Executor, the Plan Manager, and (optionally) the State
/// Consistency Manager behind a single `run_turn` entry point.
///
/// `intent_analyzer` and `state_manager` are optional: an instance with
/// `intent_enabled: false` in its [`turnloop_prompt::AgentSchema`] runs
/// with classification replaced by [`turnloop_intent::IntentResult::safe_default`],
/// and an instance with no working directory to snapshot runs with no
/// consistency tracking at all.
pub struct AgentOrchestrator {
    pub(crate) llm: Arc<dyn LlmProvider>,
    pub(crate) injector: Arc<InjectionOrchestrator>,
    pub(crate) intent_analyzer: Option<Arc<IntentAnalyzer>>,
    pub(crate) tool_executor: Arc<ToolExecutor>,
    pub(crate) capabilities: Arc<CapabilityRegistry>,
    pub(crate) plan_manager: Arc<PlanManager>,
    pub(crate) state_manager: Option<Arc<StateManager>>,
    pub(crate) broadcaster: Arc<EventBroadcaster>,
    pub(crate) config: RuntimeConfig,
}

impl AgentOrchestrator {
    /// Wire every collaborator. Callers build each component independently
    /// (prompt cache already loaded, capability registry already loaded
    /// from config) and hand them here; this type owns none of their
    /// construction.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        injector: Arc<InjectionOrchestrator>,
        intent_analyzer: Option<Arc<IntentAnalyzer>>,
        tool_executor: Arc<ToolExecutor>,
        capabilities: Arc<CapabilityRegistry>,
        plan_manager: Arc<PlanManager>,
        state_manager: Option<Arc<StateManager>>,
        broadcaster: Arc<EventBroadcaster>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            llm,
            injector,
            intent_analyzer,
            tool_executor,
            capabilities,
            plan_manager,
            state_manager,
            broadcaster,
            config,
        }
    }

    /// Runtime configuration this orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
