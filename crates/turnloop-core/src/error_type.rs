//! The closed error taxonomy shared by tool execution, compaction, and the
//! turn loop's retry policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification attached to a failed tool call or turn.
///
/// The first eight variants are surfaced on the wire in a [`crate::ToolOutcome`]
/// error envelope. The final three are orchestrator-internal and never appear
/// in a tool result, only in runtime-level audit/log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Caller lacks permission to perform the action.
    PermissionDenied,
    /// A required dependency (binary, file, service) was not found.
    DependencyMissing,
    /// The operation exceeded its deadline.
    Timeout,
    /// The caller-supplied input failed validation.
    InputInvalid,
    /// The provider is rate-limiting the caller.
    RateLimited,
    /// Credentials have expired and re-authentication is required.
    AuthExpired,
    /// A retryable, likely transient failure.
    Transient,
    /// A non-retryable failure.
    Permanent,
    /// The LLM stream ended abnormally.
    LlmStreamError,
    /// The turn terminator decided to stop the loop.
    TerminatorStop,
    /// The turn was cancelled by an explicit stop request.
    Cancelled,
}

impl ErrorType {
    /// Whether the orchestrator may retry an action classified with this error.
    ///
    /// `RateLimited` retries after `retry_after`; `Transient` retries once;
    /// every other classification is terminal for the current attempt.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PermissionDenied => "permission_denied",
            Self::DependencyMissing => "dependency_missing",
            Self::Timeout => "timeout",
            Self::InputInvalid => "input_invalid",
            Self::RateLimited => "rate_limited",
            Self::AuthExpired => "auth_expired",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::LlmStreamError => "llm_stream_error",
            Self::TerminatorStop => "terminator_stop",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ErrorType::RateLimited.is_retryable());
        assert!(ErrorType::Transient.is_retryable());
        assert!(!ErrorType::Permanent.is_retryable());
        assert!(!ErrorType::PermissionDenied.is_retryable());
    }

    #[test]
    fn serializes_snake_case() {
        let v = serde_json::to_value(ErrorType::AuthExpired).unwrap();
        assert_eq!(v, serde_json::json!("auth_expired"));
    }
}
