//! Runtime configuration and defaults.

use std::time::Duration;

/// Default hard cap on turns per session, mirrored from
/// [`turnloop_prompt::AgentSchema::max_turns`] when no override is given.
pub const DEFAULT_MAX_TURNS: u32 = 100;
/// Default number of times a transient (non-rate-limit) stream failure is
/// retried before the turn gives up.
pub const DEFAULT_MAX_TRANSIENT_RETRIES: u32 = 1;
/// Default delay used for a rate-limited retry when the provider sent no
/// `Retry-After` header.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);
/// Default wall-clock budget for a single `run_turn` call, regardless of
/// how many turns it took to get there.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(1800);
/// Default ceiling on how long the loop may wait for the model or a tool
/// between turns before the terminator treats the session as stalled.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
/// Default orchestrator-level streak of failed tool calls within one
/// `run_turn` call before the terminator gives up, independent of
/// [`turnloop_state::manager::DEFAULT_FAILURE_THRESHOLD`], which tracks
/// consistency across a whole session rather than one turn's loop.
pub const DEFAULT_CONSECUTIVE_FAILURE_LIMIT: u32 = 5;
/// Default turn count after which the terminator raises a "long-running"
/// confirmation signal rather than stopping outright.
pub const DEFAULT_LONG_RUNNING_CONFIRM_AFTER_TURNS: u32 = 20;

/// What the terminator does when a HITL-backed tool reports the user
/// rejected a proposed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionPolicy {
    /// Propose a rollback to the last snapshot via the State Manager.
    #[default]
    AskRollback,
}

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Hard cap on turns within a single `run_turn` call; the Plan/Todo
    /// state machine and the model itself are expected to converge well
    /// before this, but a buggy or adversarial tool loop must not run
    /// forever.
    pub max_turns: u32,
    /// How many times a `transient`-classified stream failure is retried.
    pub max_transient_retries: u32,
    /// Backoff used for a `rate_limited` failure when the provider gave no
    /// `Retry-After` delay.
    pub default_rate_limit_backoff: Duration,
    /// Wall-clock budget for one `run_turn` call.
    pub max_duration: Duration,
    /// Ceiling on how long the loop may go without forward progress
    /// (a completed model turn or tool result) before stopping.
    pub idle_timeout: Duration,
    /// Orchestrator-level streak of failed tool calls within one turn
    /// loop before the terminator stops it.
    pub consecutive_failure_limit: u32,
    /// Turn count after which the terminator raises a long-running
    /// confirmation signal instead of stopping.
    pub long_running_confirm_after_turns: u32,
    /// What to do when a HITL-backed tool reports a user rejection.
    pub on_rejection: RejectionPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
            default_rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            max_duration: DEFAULT_MAX_DURATION,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            consecutive_failure_limit: DEFAULT_CONSECUTIVE_FAILURE_LIMIT,
            long_running_confirm_after_turns: DEFAULT_LONG_RUNNING_CONFIRM_AFTER_TURNS,
            on_rejection: RejectionPolicy::AskRollback,
        }
    }
}

impl RuntimeConfig {
    /// Build a config carrying `max_turns` from a loaded
    /// [`turnloop_prompt::AgentSchema`], leaving retry tunables at their
    /// defaults.
    #[must_use]
    pub fn from_agent_schema(schema: &turnloop_prompt::AgentSchema) -> Self {
        Self {
            max_turns: schema.max_turns,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_adaptive_terminator() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_turns, 100);
        assert_eq!(config.max_duration, Duration::from_secs(1800));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.consecutive_failure_limit, 5);
        assert_eq!(config.long_running_confirm_after_turns, 20);
        assert_eq!(config.on_rejection, RejectionPolicy::AskRollback);
    }

    #[test]
    fn from_agent_schema_overrides_only_max_turns() {
        let schema = turnloop_prompt::AgentSchema {
            max_turns: 7,
            ..turnloop_prompt::AgentSchema::default()
        };
        let config = RuntimeConfig::from_agent_schema(&schema);
        assert_eq!(config.max_turns, 7);
        assert_eq!(config.idle_timeout, RuntimeConfig::default().idle_timeout);
    }
}
