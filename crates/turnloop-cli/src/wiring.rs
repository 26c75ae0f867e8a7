//! Builds one fully-wired [`AgentOrchestrator`] plus the [`ToolContext`]
//! it runs tool calls under, from a loaded [`CliConfig`].

use std::sync::Arc;

use turnloop_capabilities::CapabilityRegistry;
use turnloop_core::InstanceId;
use turnloop_events::{EventBroadcaster, EventStorage};
use turnloop_intent::IntentAnalyzer;
use turnloop_llm::{HttpChatProvider, LlmProvider, ProviderConfig};
use turnloop_plan::{PlanManager, PlanTool};
use turnloop_prompt::{AgentSchema, InjectionOrchestrator, PromptCache, RuntimeContext};
use turnloop_runtime::{AgentOrchestrator, RuntimeConfig, Session};
use turnloop_state::StateManager;
use turnloop_tools::{ResultCompactor, ToolContext, ToolExecutor, ToolRegistry, UsageTracker};

use crate::config::CliConfig;
use crate::dirs::TurnloopHome;

const SIMPLE_PROMPT: &str = "You are a helpful assistant. Answer directly and concisely.";
const MEDIUM_PROMPT: &str =
    "You are a helpful assistant with access to tools. Use them when they help answer the user's request, and explain what you're doing.";
const COMPLEX_PROMPT: &str =
    "You are a helpful assistant working on a multi-step task. Use the plan tool to track your steps, and update it as you make progress or hit failures.";

/// Everything the REPL needs: the orchestrator, the tool context it hands
/// to every call, and one in-memory session.
pub struct Runtime {
    /// The turn loop.
    pub orchestrator: AgentOrchestrator,
    /// Execution context shared across every tool call in this process.
    pub tool_ctx: ToolContext,
    /// Storage events are broadcast through, used by the REPL to subscribe.
    pub event_storage: Arc<EventStorage>,
    /// Shared with the orchestrator, kept here too so the REPL can emit
    /// `session_start`/`session_end` around the process's one session.
    pub broadcaster: Arc<EventBroadcaster>,
    /// The one session this process runs.
    pub session: Session,
    /// Shared with the orchestrator, kept here too for the REPL's `/plan`
    /// introspection command.
    pub plan_manager: Arc<PlanManager>,
    /// Shared with the orchestrator, kept here too for the REPL's
    /// `/skills` introspection command.
    pub capabilities: Arc<CapabilityRegistry>,
}

/// Wire every component from a loaded config and a freshly created home.
///
/// # Errors
///
/// Returns an error if the capability registry YAML fails to parse or the
/// API key is missing.
pub fn build(config: &CliConfig, home: &TurnloopHome, workspace_root: std::path::PathBuf) -> anyhow::Result<Runtime> {
    let api_key = CliConfig::api_key()?;

    let provider_config = ProviderConfig {
        api_key,
        model: config.model.model.clone(),
        max_tokens: config.model.max_tokens,
        temperature: config.model.temperature,
        base_url: config.model.base_url.clone(),
        context_window: None,
    };
    let llm: Arc<dyn LlmProvider> = Arc::new(HttpChatProvider::new(provider_config));

    let capabilities_yaml = std::fs::read_to_string(home.capabilities_path())?;
    let capabilities = Arc::new(CapabilityRegistry::from_yaml(&capabilities_yaml)?);

    let event_storage = Arc::new(EventStorage::new());
    let broadcaster = Arc::new(EventBroadcaster::new(event_storage.clone()));

    let agent_schema = AgentSchema {
        model: config.model.model.clone(),
        max_turns: config.max_turns,
        intent_enabled: config.intent_enabled,
        plan_enabled: config.plan_enabled,
    };

    let cache = Arc::new(PromptCache::new());
    cache.load(
        SIMPLE_PROMPT.to_string(),
        MEDIUM_PROMPT.to_string(),
        COMPLEX_PROMPT.to_string(),
        agent_schema.clone(),
        RuntimeContext::default(),
    );
    let injector = Arc::new(InjectionOrchestrator::standard(cache, capabilities.clone()));

    let intent_analyzer = config.intent_enabled.then(|| {
        let skill_names = capabilities
            .find_by_kind(turnloop_capabilities::CapabilityKind::Skill)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        Arc::new(IntentAnalyzer::new(llm.clone(), skill_names))
    });

    let plan_manager = Arc::new(PlanManager::new(broadcaster.clone()));

    let mut registry = ToolRegistry::new();
    if config.plan_enabled {
        registry.register(Box::new(PlanTool::new(plan_manager.clone())));
    }
    let compactor = ResultCompactor::new(home.root().join("compaction"));
    let usage = Arc::new(UsageTracker::new());
    let tool_executor = Arc::new(ToolExecutor::new(registry, capabilities.clone(), compactor, usage));

    let snapshot_root = home.root().join("snapshots");
    let state_manager = Some(Arc::new(StateManager::new(
        workspace_root,
        snapshot_root,
        broadcaster.clone(),
    )));

    let runtime_config = RuntimeConfig::from_agent_schema(&agent_schema);

    let orchestrator = AgentOrchestrator::new(
        llm,
        injector,
        intent_analyzer,
        tool_executor,
        capabilities.clone(),
        plan_manager.clone(),
        state_manager,
        broadcaster.clone(),
        runtime_config,
    );

    let session = Session::new();
    let tool_ctx = ToolContext::new(session.id.clone(), InstanceId::new(), broadcaster.clone())
        .with_conversation(session.conversation_id.clone());

    Ok(Runtime {
        orchestrator,
        tool_ctx,
        event_storage,
        broadcaster,
        session,
        plan_manager,
        capabilities,
    })
}
