//! Injection Orchestrator (C7): assembles the layered system prompt, the
//! phase-2 user-context message, and the phase-3 runtime content from a
//! registered set of [`Injector`]s.

use std::sync::Arc;

use dashmap::DashMap;
use turnloop_capabilities::CapabilityRegistry;
use turnloop_core::SessionId;
use turnloop_llm::{LlmToolDefinition, Message, SystemBlock};

use crate::cache::{PromptCache, PromptTier};
use crate::injector::{CacheStrategy, InjectionContext, Injector, Phase};

fn complexity_tier(complexity: &str) -> PromptTier {
    match complexity {
        "simple" => PromptTier::Simple,
        "complex" => PromptTier::Complex,
        _ => PromptTier::Medium,
    }
}

/// Renders the role/persona block from the loaded prompt cache, selecting
/// the tier that matches the turn's classified complexity.
struct RoleInjector {
    cache: Arc<PromptCache>,
}

#[async_trait::async_trait]
impl Injector for RoleInjector {
    fn name(&self) -> &str {
        "role"
    }
    fn phase(&self) -> Phase {
        Phase::System
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Stable
    }
    fn priority(&self) -> u8 {
        100
    }
    async fn inject(&self, ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        let tier = complexity_tier(&ctx.task_complexity);
        match self.cache.system_prompt(tier) {
            Some(content) => crate::injector::InjectorOutput::tagged(content, "role"),
            None => crate::injector::InjectorOutput::empty(),
        }
    }
}

/// Renders the registered tool catalog as a system block.
struct ToolProviderInjector {
    capabilities: Arc<CapabilityRegistry>,
}

#[async_trait::async_trait]
impl Injector for ToolProviderInjector {
    fn name(&self) -> &str {
        "tool-provider"
    }
    fn phase(&self) -> Phase {
        Phase::System
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Stable
    }
    fn priority(&self) -> u8 {
        80
    }
    async fn inject(&self, _ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        let schemas = self.capabilities.get_tool_schemas();
        if schemas.is_empty() {
            return crate::injector::InjectorOutput::empty();
        }
        let rendered = schemas
            .iter()
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        crate::injector::InjectorOutput::tagged(rendered, "available_tools")
    }
}

/// Renders the skills listing narrowed to the intent analyzer's selected
/// groups, unioned with whatever the active plan's todos require. `None`
/// from the intent analyzer means the full static skills prompt is used
/// unnarrowed. An empty union on a follow-up turn re-uses the last known
/// non-empty selection for that session, guarding against momentary drift
/// on "continue"-style utterances.
struct SkillFocusInjector {
    runtime_skills_prompt: Arc<PromptCache>,
    last_known_selection: DashMap<SessionId, Vec<String>>,
}

#[async_trait::async_trait]
impl Injector for SkillFocusInjector {
    fn name(&self) -> &str {
        "skill-focus"
    }
    fn phase(&self) -> Phase {
        Phase::System
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Dynamic
    }
    fn priority(&self) -> u8 {
        70
    }
    async fn inject(&self, ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        let Some(full) = self.runtime_skills_prompt.runtime_context().skills_prompt else {
            return crate::injector::InjectorOutput::empty();
        };
        let Some(selected) = &ctx.relevant_skill_groups else {
            return crate::injector::InjectorOutput::tagged(full, "skills");
        };
        let mut wanted: Vec<String> = selected.clone();
        for skill in &ctx.plan_required_skills {
            if !wanted.contains(skill) {
                wanted.push(skill.clone());
            }
        }

        if wanted.is_empty() {
            if ctx.is_follow_up {
                match self.last_known_selection.get(&ctx.session_id) {
                    Some(remembered) => wanted = remembered.clone(),
                    None => return crate::injector::InjectorOutput::empty(),
                }
            } else {
                return crate::injector::InjectorOutput::empty();
            }
        } else {
            self.last_known_selection.insert(ctx.session_id.clone(), wanted.clone());
        }

        let narrowed = full
            .lines()
            .filter(|line| wanted.iter().any(|w| line.contains(w.as_str())))
            .collect::<Vec<_>>()
            .join("\n");
        if narrowed.is_empty() {
            crate::injector::InjectorOutput::tagged(full, "skills")
        } else {
            crate::injector::InjectorOutput::tagged(narrowed, "skills")
        }
    }
}

/// Carries a caller-supplied conversation-history summary, when the caller
/// has one precomputed. Skipped on follow-up turns, where the preceding
/// assistant turn already carries sufficient context.
struct HistorySummaryInjector;

#[async_trait::async_trait]
impl Injector for HistorySummaryInjector {
    fn name(&self) -> &str {
        "history-summary"
    }
    fn phase(&self) -> Phase {
        Phase::System
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Dynamic
    }
    fn priority(&self) -> u8 {
        60
    }
    fn should_inject(&self, ctx: &InjectionContext) -> bool {
        !ctx.is_follow_up && ctx.precomputed_history_summary.is_some()
    }
    async fn inject(&self, ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        match &ctx.precomputed_history_summary {
            Some(summary) => crate::injector::InjectorOutput::tagged(summary.clone(), "history_summary"),
            None => crate::injector::InjectorOutput::empty(),
        }
    }
}

/// Carries an attached user profile into the phase-2 user-context message.
/// Suppressed when the intent analyzer marked this turn `skip_memory`.
struct UserMemoryInjector;

#[async_trait::async_trait]
impl Injector for UserMemoryInjector {
    fn name(&self) -> &str {
        "user-memory"
    }
    fn phase(&self) -> Phase {
        Phase::UserContext
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Session
    }
    fn priority(&self) -> u8 {
        90
    }
    fn should_inject(&self, ctx: &InjectionContext) -> bool {
        !ctx.skip_memory && ctx.attached_user_profile.is_some()
    }
    async fn inject(&self, ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        match &ctx.attached_user_profile {
            Some(profile) => crate::injector::InjectorOutput::text(format!("User profile:\n{profile}")),
            None => crate::injector::InjectorOutput::empty(),
        }
    }
}

/// Surfaces a reflection-guidance hint when the active plan has a failed
/// todo, steering the model toward the three remediation options instead
/// of silently retrying.
struct PlaybookHintInjector;

#[async_trait::async_trait]
impl Injector for PlaybookHintInjector {
    fn name(&self) -> &str {
        "playbook-hint"
    }
    fn phase(&self) -> Phase {
        Phase::UserContext
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Session
    }
    fn priority(&self) -> u8 {
        80
    }
    fn should_inject(&self, ctx: &InjectionContext) -> bool {
        ctx.plan_has_failure
    }
    async fn inject(&self, _ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        crate::injector::InjectorOutput::text(
            "A prior step failed. Choose one: try a different approach, skip the step, or report \
             the blocker to the user instead of repeating the same action.",
        )
    }
}

/// Placeholder for a retrieval-backed knowledge lookup keyed on the turn's
/// query text. No retrieval backend exists in this build; left in as the
/// named slot the spec calls for.
struct KnowledgeContextInjector;

#[async_trait::async_trait]
impl Injector for KnowledgeContextInjector {
    fn name(&self) -> &str {
        "knowledge-context"
    }
    fn phase(&self) -> Phase {
        Phase::UserContext
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Dynamic
    }
    fn priority(&self) -> u8 {
        70
    }
    fn should_inject(&self, _ctx: &InjectionContext) -> bool {
        false
    }
    async fn inject(&self, _ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        crate::injector::InjectorOutput::empty()
    }
}

/// Appends the current todo list, in markdown, to the final user message.
struct GtdTodoInjector;

#[async_trait::async_trait]
impl Injector for GtdTodoInjector {
    fn name(&self) -> &str {
        "gtd-todo"
    }
    fn phase(&self) -> Phase {
        Phase::Runtime
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Dynamic
    }
    fn priority(&self) -> u8 {
        80
    }
    fn should_inject(&self, ctx: &InjectionContext) -> bool {
        ctx.has_plan && ctx.todo_markdown.is_some()
    }
    async fn inject(&self, ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        match &ctx.todo_markdown {
            Some(markdown) => crate::injector::InjectorOutput::text(markdown.clone()),
            None => crate::injector::InjectorOutput::empty(),
        }
    }
}

/// Appends attached page/file editor context to the final user message.
struct PageEditorInjector;

#[async_trait::async_trait]
impl Injector for PageEditorInjector {
    fn name(&self) -> &str {
        "page-editor"
    }
    fn phase(&self) -> Phase {
        Phase::Runtime
    }
    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::Dynamic
    }
    fn priority(&self) -> u8 {
        70
    }
    fn should_inject(&self, ctx: &InjectionContext) -> bool {
        ctx.editor_context.is_some()
    }
    async fn inject(&self, ctx: &InjectionContext) -> crate::injector::InjectorOutput {
        match &ctx.editor_context {
            Some(editor) => crate::injector::InjectorOutput::text(editor.clone()),
            None => crate::injector::InjectorOutput::empty(),
        }
    }
}

/// Holds the registered injectors and assembles a turn's prompt material
/// from them.
///
/// Cache-layer assignment: within the system phase, stable injectors
/// consume a monotonic layer number in descending-priority order starting
/// at `1`; session-strategy injectors (found in the user-context phase)
/// would receive `stable_max + 1` if they ever needed a system-level
/// layer, and dynamic injectors are never cached (`layer 0`).
pub struct InjectionOrchestrator {
    injectors: Vec<Arc<dyn Injector>>,
}

impl InjectionOrchestrator {
    /// An orchestrator with no injectors registered.
    #[must_use]
    pub fn new() -> Self {
        Self { injectors: Vec::new() }
    }

    /// The standard injector set described for this runtime, wired against
    /// a loaded prompt cache and capability registry.
    #[must_use]
    pub fn standard(cache: Arc<PromptCache>, capabilities: Arc<CapabilityRegistry>) -> Self {
        let mut orchestrator = Self::new();
        orchestrator.register(Arc::new(RoleInjector { cache: cache.clone() }));
        orchestrator.register(Arc::new(ToolProviderInjector { capabilities }));
        orchestrator.register(Arc::new(SkillFocusInjector {
            runtime_skills_prompt: cache,
            last_known_selection: DashMap::new(),
        }));
        orchestrator.register(Arc::new(HistorySummaryInjector));
        orchestrator.register(Arc::new(UserMemoryInjector));
        orchestrator.register(Arc::new(PlaybookHintInjector));
        orchestrator.register(Arc::new(KnowledgeContextInjector));
        orchestrator.register(Arc::new(GtdTodoInjector));
        orchestrator.register(Arc::new(PageEditorInjector));
        orchestrator
    }

    /// Register an additional injector.
    pub fn register(&mut self, injector: Arc<dyn Injector>) {
        self.injectors.push(injector);
    }

    fn phase_injectors(&self, phase: Phase) -> Vec<&Arc<dyn Injector>> {
        let mut selected: Vec<&Arc<dyn Injector>> =
            self.injectors.iter().filter(|i| i.phase() == phase).collect();
        selected.sort_by(|a, b| b.priority().cmp(&a.priority()));
        selected
    }

    /// Build the layered system prompt as a list of cache-annotated blocks.
    pub async fn build_system_blocks(&self, ctx: &InjectionContext) -> Vec<SystemBlock> {
        let mut blocks = Vec::new();
        let mut next_stable_layer = 1u32;
        for injector in self.phase_injectors(Phase::System) {
            if !injector.should_inject(ctx) {
                continue;
            }
            let output = injector.inject(ctx).await;
            let Some(content) = output.content else { continue };
            let layer = match injector.cache_strategy() {
                CacheStrategy::Stable => {
                    let layer = next_stable_layer;
                    next_stable_layer += 1;
                    layer
                }
                CacheStrategy::Session => next_stable_layer,
                CacheStrategy::Dynamic => 0,
            };
            blocks.push(SystemBlock {
                content: match output.xml_tag {
                    Some(ref tag) => format!("<{tag}>\n{content}\n</{tag}>"),
                    None => content,
                },
                cache_layer: layer,
                xml_tag: output.xml_tag.clone(),
            });
        }
        blocks
    }

    /// Build the phase-2 user-context content, or `None` if no injector
    /// produced anything.
    pub async fn build_user_context_content(&self, ctx: &InjectionContext) -> Option<String> {
        let mut pieces = Vec::new();
        for injector in self.phase_injectors(Phase::UserContext) {
            if !injector.should_inject(ctx) {
                continue;
            }
            if let Some(content) = injector.inject(ctx).await.content {
                pieces.push(content);
            }
        }
        if pieces.is_empty() {
            None
        } else {
            Some(pieces.join("\n\n"))
        }
    }

    /// Build the phase-3 runtime content appended to the turn's final user
    /// message, or `None` if no injector produced anything.
    pub async fn build_runtime_content(&self, ctx: &InjectionContext) -> Option<String> {
        let mut pieces = Vec::new();
        for injector in self.phase_injectors(Phase::Runtime) {
            if !injector.should_inject(ctx) {
                continue;
            }
            if let Some(content) = injector.inject(ctx).await.content {
                pieces.push(content);
            }
        }
        if pieces.is_empty() {
            None
        } else {
            Some(pieces.join("\n\n"))
        }
    }

    /// Assemble the full message list for one turn: an optional
    /// user-context system message, the caller-supplied history, and the
    /// final user message with runtime content appended.
    pub async fn build_messages(
        &self,
        ctx: &InjectionContext,
        history: &[Message],
        user_message: &str,
    ) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(user_context) = self.build_user_context_content(ctx).await {
            messages.push(Message::system(user_context));
        }
        messages.extend_from_slice(history);
        let final_text = match self.build_runtime_content(ctx).await {
            Some(runtime) => format!("{user_message}\n\n---\n\n{runtime}"),
            None => user_message.to_string(),
        };
        messages.push(Message::user(final_text));
        messages
    }

    /// Tool definitions advertised to the model, sourced from the
    /// capability registry's filtered view.
    #[must_use]
    pub fn tool_definitions(schemas: &[turnloop_capabilities::ToolSchema]) -> Vec<LlmToolDefinition> {
        schemas
            .iter()
            .map(|s| {
                LlmToolDefinition::new(s.name.clone())
                    .with_description(s.description.clone())
                    .with_schema(s.input_schema.clone())
            })
            .collect()
    }
}

impl Default for InjectionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AgentSchema, RuntimeContext};
    use turnloop_capabilities::CapabilityRegistry;

    fn ctx() -> InjectionContext {
        InjectionContext {
            task_complexity: "medium".to_string(),
            query: "hello".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn role_and_tool_provider_get_distinct_stable_layers() {
        let cache = Arc::new(PromptCache::new());
        cache.load(
            "simple".into(),
            "medium".into(),
            "complex".into(),
            AgentSchema::default(),
            RuntimeContext::default(),
        );
        let capabilities = Arc::new(CapabilityRegistry::default());
        let orchestrator = InjectionOrchestrator::standard(cache, capabilities);
        let blocks = orchestrator.build_system_blocks(&ctx()).await;
        let role_block = blocks.iter().find(|b| b.xml_tag.as_deref() == Some("role")).unwrap();
        assert_eq!(role_block.cache_layer, 1);
    }

    #[tokio::test]
    async fn skill_focus_falls_back_to_full_prompt_when_selection_is_none() {
        let cache = Arc::new(PromptCache::new());
        cache.load(
            "s".into(),
            "m".into(),
            "c".into(),
            AgentSchema::default(),
            RuntimeContext {
                skills_prompt: Some("full skills listing".to_string()),
                ..Default::default()
            },
        );
        let capabilities = Arc::new(CapabilityRegistry::default());
        let orchestrator = InjectionOrchestrator::standard(cache, capabilities);
        let mut context = ctx();
        context.relevant_skill_groups = None;
        let blocks = orchestrator.build_system_blocks(&context).await;
        let skills_block = blocks.iter().find(|b| b.xml_tag.as_deref() == Some("skills")).unwrap();
        assert!(skills_block.content.contains("full skills listing"));
    }

    #[tokio::test]
    async fn skill_focus_reuses_last_known_selection_on_empty_follow_up() {
        let injector = SkillFocusInjector {
            runtime_skills_prompt: Arc::new(PromptCache::new()),
            last_known_selection: DashMap::new(),
        };
        injector.runtime_skills_prompt.load(
            "s".into(),
            "m".into(),
            "c".into(),
            AgentSchema::default(),
            RuntimeContext {
                skills_prompt: Some("alpha skill line\nbeta skill line\n".to_string()),
                ..Default::default()
            },
        );
        let session_id = SessionId::new();

        let mut first_turn = ctx();
        first_turn.session_id = session_id.clone();
        first_turn.relevant_skill_groups = Some(vec!["alpha".to_string()]);
        let first = injector.inject(&first_turn).await;
        assert!(first.content.unwrap().contains("alpha skill line"));

        let mut follow_up = ctx();
        follow_up.session_id = session_id;
        follow_up.relevant_skill_groups = Some(vec![]);
        follow_up.is_follow_up = true;
        let second = injector.inject(&follow_up).await;
        assert!(second.content.unwrap().contains("alpha skill line"));
    }

    #[tokio::test]
    async fn skill_focus_drops_block_on_empty_selection_when_not_a_follow_up() {
        let injector = SkillFocusInjector {
            runtime_skills_prompt: Arc::new(PromptCache::new()),
            last_known_selection: DashMap::new(),
        };
        injector.runtime_skills_prompt.load(
            "s".into(),
            "m".into(),
            "c".into(),
            AgentSchema::default(),
            RuntimeContext {
                skills_prompt: Some("alpha skill line\n".to_string()),
                ..Default::default()
            },
        );
        let mut turn = ctx();
        turn.relevant_skill_groups = Some(vec![]);
        let out = injector.inject(&turn).await;
        assert!(out.content.is_none());
    }

    #[tokio::test]
    async fn playbook_hint_only_fires_on_plan_failure() {
        let cache = Arc::new(PromptCache::new());
        let capabilities = Arc::new(CapabilityRegistry::default());
        let orchestrator = InjectionOrchestrator::standard(cache, capabilities);
        let quiet = orchestrator.build_user_context_content(&ctx()).await;
        assert!(quiet.is_none());

        let mut failing = ctx();
        failing.plan_has_failure = true;
        let loud = orchestrator.build_user_context_content(&failing).await.unwrap();
        assert!(loud.contains("different approach"));
    }
}
