//! The classification result produced by the Intent Analyzer (C8).

use serde::{Deserialize, Serialize};

/// Coarse task complexity, driving which prompt tier and terminator policy
/// a turn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// A single direct action with no planning needed.
    Simple,
    /// The common case: a few steps, no explicit plan required.
    Medium,
    /// Multi-step work that benefits from an explicit, trackable plan.
    Complex,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Medium
    }
}

/// The Intent Analyzer's classification of one turn.
///
/// `needs_plan` carries two meanings at once: it both gates whether the
/// orchestrator calls the plan tool proactively on the model's behalf, and
/// is surfaced to the model itself as a hint. Both readings are intentional
/// and neither is a redundant duplicate of `complexity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Classified complexity.
    pub complexity: Complexity,
    /// Whether this turn should get an explicit plan.
    pub needs_plan: bool,
    /// Skill groups relevant to this turn, or `None` meaning "use the full
    /// unnarrowed skills listing".
    pub relevant_skill_groups: Option<Vec<String>>,
    /// Whether this turn continues the immediately preceding one rather
    /// than starting a new line of work.
    pub is_follow_up: bool,
    /// Whether memory lookups should be skipped for this turn.
    pub skip_memory: bool,
    /// A short free-text label for the kind of task, for logging/metrics.
    #[serde(default)]
    pub task_type: String,
}

impl IntentResult {
    /// The fallback used whenever classification fails or returns
    /// malformed output: conservative enough that downstream components
    /// behave reasonably without ever crashing on a bad classification.
    #[must_use]
    pub fn safe_default() -> Self {
        Self {
            complexity: Complexity::Medium,
            needs_plan: true,
            relevant_skill_groups: None,
            is_follow_up: false,
            skip_memory: false,
            task_type: "general".to_string(),
        }
    }
}

impl Default for IntentResult {
    fn default() -> Self {
        Self::safe_default()
    }
}
