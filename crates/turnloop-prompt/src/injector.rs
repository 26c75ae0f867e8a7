//! The Injector contract (C7): a named, phased, prioritized producer of a
//! prompt fragment.

use std::collections::BTreeMap;

use turnloop_core::SessionId;

/// Which of the three phases an injector contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Contributes to the layered system prompt.
    System,
    /// Contributes to the phase-2 user-context message.
    UserContext,
    /// Contributes to the phase-3 runtime content appended to the final
    /// user message.
    Runtime,
}

/// How cache-stable an injector's output is, determining its
/// `_cache_layer` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Output rarely changes turn-to-turn; consumes a monotonic stable
    /// layer assigned in priority order.
    Stable,
    /// Output is stable for the lifetime of a session; gets `stable + 1`.
    Session,
    /// Output changes every turn; gets layer `0` (never cached).
    Dynamic,
}

/// A plain data record produced once per turn by the orchestrator.
/// Injectors read it but never call back into the orchestrator — this
/// breaks the cyclic reference an in-process port would otherwise create.
#[derive(Debug, Clone, Default)]
pub struct InjectionContext {
    /// The session this turn belongs to, used to key any injector state
    /// that must persist across turns (e.g. skill-focus follow-up
    /// continuity).
    pub session_id: SessionId,
    /// `simple`, `medium`, or `complex`, as classified by the Intent
    /// Analyzer.
    pub task_complexity: String,
    /// The Intent Analyzer's skill-group selection for this turn, `None`
    /// meaning "fall back to the full static skills prompt".
    pub relevant_skill_groups: Option<Vec<String>>,
    /// Whether the Intent Analyzer judged this turn a follow-up.
    pub is_follow_up: bool,
    /// Whether the current conversation has a plan.
    pub has_plan: bool,
    /// Skill names required by the active plan's todos, reverse-mapped via
    /// the group registry.
    pub plan_required_skills: Vec<String>,
    /// Whether any todo in the active plan is `failed`.
    pub plan_has_failure: bool,
    /// Number of prior messages in the conversation.
    pub prior_message_count: usize,
    /// A pre-computed history summary, if the caller already has one.
    pub precomputed_history_summary: Option<String>,
    /// Whether memory lookups should be skipped for this turn.
    pub skip_memory: bool,
    /// A pre-attached user profile, bypassing the memory fetch.
    pub attached_user_profile: Option<String>,
    /// The current turn's query text, used for playbook/knowledge lookups.
    pub query: String,
    /// Markdown-rendered current todo list, if a plan exists.
    pub todo_markdown: Option<String>,
    /// Attached page/file editor context, if any.
    pub editor_context: Option<String>,
    /// Whether the current task involves UI automation (desktop
    /// operation), gating the desktop-operation protocol addendum.
    pub involves_ui_automation: bool,
    /// Free-form extension bag for injector-specific inputs.
    pub extra: BTreeMap<String, String>,
}

/// What an injector contributes for one phase-1 slot: either structured
/// content with an XML tag (system phase) or plain content (other phases).
/// Returning `content: None` means "drop this injector with no side
/// effect" — the orchestrator never emits an empty block.
#[derive(Debug, Clone, Default)]
pub struct InjectorOutput {
    /// The rendered text, or `None` to be dropped.
    pub content: Option<String>,
    /// An XML tag to wrap the content in, for system-phase blocks.
    pub xml_tag: Option<String>,
    /// Arbitrary bookkeeping the orchestrator may log.
    pub metadata: serde_json::Value,
}

impl InjectorOutput {
    /// A dropped output.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plain content with no XML tag.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            xml_tag: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Content wrapped in an XML tag, for system-phase blocks.
    #[must_use]
    pub fn tagged(content: impl Into<String>, xml_tag: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            xml_tag: Some(xml_tag.into()),
            metadata: serde_json::Value::Null,
        }
    }
}

/// A named producer of a prompt fragment with a phase, priority, and cache
/// strategy. Within a phase, injectors run in descending priority order.
#[async_trait::async_trait]
pub trait Injector: Send + Sync {
    /// Unique name, used for logging and follow-up-continuity lookups.
    fn name(&self) -> &str;

    /// Which phase this injector contributes to.
    fn phase(&self) -> Phase;

    /// This injector's cache strategy.
    fn cache_strategy(&self) -> CacheStrategy;

    /// Ordering within a phase; higher runs first.
    fn priority(&self) -> u8;

    /// Whether this injector should run at all for `ctx`. Injectors that
    /// always run can leave this at the default.
    fn should_inject(&self, _ctx: &InjectionContext) -> bool {
        true
    }

    /// Produce this injector's contribution.
    async fn inject(&self, ctx: &InjectionContext) -> InjectorOutput;
}
