//! Errors the turn loop itself can raise. Tool failures never reach here —
//! they come back from the executor as structured results and get fed to
//! the model; this type covers failures the loop cannot recover from at
//! all.

/// Result alias used throughout this crate.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A failure that ends the turn outright.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The model stream failed in a way the retry policy gave up on.
    #[error("llm stream failed: {0}")]
    Llm(#[from] turnloop_llm::LlmError),
    /// The configured maximum turn count was reached without the model
    /// producing a final answer.
    #[error("turn limit of {0} reached without a final response")]
    TurnLimitReached(u32),
    /// The model stream produced no event for longer than
    /// `idle_timeout_seconds`.
    #[error("idle timeout of {0}s waiting on the model stream")]
    IdleTimeout(u64),
    /// The orchestrator-level streak of failed tool calls reached
    /// `consecutive_failure_limit` within a single turn loop.
    #[error("{0} consecutive tool failures, terminator stopped the turn")]
    ConsecutiveToolFailures(u32),
}
