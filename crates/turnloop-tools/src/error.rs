//! Tool error classification and the compaction hint contract.

use turnloop_core::ErrorType;

/// A classified tool failure. Every raw exception a tool implementation
/// raises is wrapped into one of these before it ever reaches the
/// orchestrator; tool errors never raise past the Tool Executor.
#[derive(Debug, Clone)]
pub struct ToolError {
    /// Human-readable message.
    pub message: String,
    /// Closed classification.
    pub error_type: ErrorType,
    /// Optional guidance surfaced to the model on how to recover.
    pub recovery_hint: Option<String>,
    /// For `rate_limited`, how many seconds to wait before retrying.
    pub retry_after_seconds: Option<u64>,
}

impl ToolError {
    /// Build an error with no recovery hint or retry delay.
    #[must_use]
    pub fn new(message: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            message: message.into(),
            error_type,
            recovery_hint: None,
            retry_after_seconds: None,
        }
    }

    /// Attach a recovery hint, builder-style.
    #[must_use]
    pub fn with_recovery_hint(mut self, hint: impl Into<String>) -> Self {
        self.recovery_hint = Some(hint.into());
        self
    }

    /// Attach a retry delay, builder-style.
    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    /// Classify a raw HTTP status code into a [`ToolError`], per the
    /// 429/401/403 mapping rule. `retry_after` is the `Retry-After` header
    /// value, if the upstream provided one.
    #[must_use]
    pub fn from_http_status(status: u16, message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let message = message.into();
        match status {
            429 => Self::new(message, ErrorType::RateLimited)
                .with_recovery_hint(format!("retry_after:{}", retry_after.unwrap_or(60)))
                .with_retry_after(retry_after.unwrap_or(60)),
            401 => Self::new(message, ErrorType::AuthExpired),
            403 => Self::new(message, ErrorType::PermissionDenied),
            _ if (500..600).contains(&status) => Self::new(message, ErrorType::Transient),
            _ => Self::new(message, ErrorType::Permanent),
        }
    }

    /// Whether the orchestrator may retry the call that produced this
    /// error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.error_type.is_retryable()
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)
    }
}

impl std::error::Error for ToolError {}

/// Out-of-band annotation a tool's raw output may carry as a `"_compression_hint"`
/// string entry on its `StructuredValue::Map` payload. The Tool Executor
/// removes that entry and parses it into this type before anything else
/// touches the payload, so the key itself never reaches the compactor or
/// the LLM context — only this typed value does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionHint {
    /// Return the result verbatim and mark it so later stages skip further
    /// compression.
    Skip,
    /// Compress using a lower character threshold than the default.
    Force,
    /// Compress via the search-shaped top-N summary path.
    Search,
    /// Compress via the default head/tail path (the absence of a hint
    /// means the same thing).
    #[default]
    Normal,
}

impl CompressionHint {
    /// Parse the four legal values of the `_compression_hint` field.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "skip" => Self::Skip,
            "force" => Self::Force,
            "search" => Self::Search,
            _ => Self::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(
            ToolError::from_http_status(429, "limited", Some(2)).error_type,
            ErrorType::RateLimited
        );
        assert_eq!(
            ToolError::from_http_status(401, "bad creds", None).error_type,
            ErrorType::AuthExpired
        );
        assert_eq!(
            ToolError::from_http_status(403, "forbidden", None).error_type,
            ErrorType::PermissionDenied
        );
        assert_eq!(
            ToolError::from_http_status(418, "teapot", None).error_type,
            ErrorType::Permanent
        );
    }

    #[test]
    fn rate_limited_carries_recovery_hint() {
        let err = ToolError::from_http_status(429, "limited", Some(2));
        assert_eq!(err.recovery_hint.as_deref(), Some("retry_after:2"));
        assert_eq!(err.retry_after_seconds, Some(2));
    }

    #[test]
    fn compression_hint_parsing_defaults_to_normal() {
        assert_eq!(CompressionHint::parse("skip"), CompressionHint::Skip);
        assert_eq!(CompressionHint::parse("bogus"), CompressionHint::Normal);
    }
}
