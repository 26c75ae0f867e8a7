//! Errors raised by [`crate::LlmProvider`] implementations.

use turnloop_core::ErrorType;

/// Result alias used throughout this crate.
pub type LlmResult<T> = Result<T, LlmError>;

/// Failure modes a provider can surface. These are distinct from
/// `turnloop_core::ErrorType`, which classifies *tool* failures; an
/// `LlmError` is mapped to `ErrorType::LlmStreamError` by the orchestrator
/// when it terminates a turn.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The underlying HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The provider returned a non-success status code.
    #[error("provider returned status {status}: {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated if large.
        body: String,
        /// Seconds to wait before retrying, from a `Retry-After` header.
        retry_after_seconds: Option<u64>,
    },
    /// The response or stream chunk could not be parsed.
    #[error("failed to parse response: {0}")]
    ParseError(String),
    /// The stream ended without a terminal event.
    #[error("stream ended unexpectedly")]
    StreamEndedUnexpectedly,
    /// The provider has no credentials configured.
    #[error("missing API key")]
    MissingApiKey,
}

impl LlmError {
    /// Classify this error against the shared error taxonomy, for the
    /// orchestrator's retry policy: `rate_limited` retries after the given
    /// delay, `transient` retries once, everything else is permanent.
    #[must_use]
    pub fn classify(&self) -> ErrorType {
        match self {
            Self::ApiError { status: 429, .. } => ErrorType::RateLimited,
            Self::ApiError { status: 401, .. } | Self::ApiError { status: 403, .. } => {
                ErrorType::AuthExpired
            }
            Self::ApiError { status, .. } if *status >= 500 => ErrorType::Transient,
            Self::Request(_) | Self::StreamEndedUnexpectedly => ErrorType::Transient,
            Self::ParseError(_) | Self::ApiError { .. } | Self::MissingApiKey => ErrorType::Permanent,
        }
    }

    /// The `Retry-After` delay carried by a `rate_limited` classification,
    /// if any.
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::ApiError { retry_after_seconds, .. } => *retry_after_seconds,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_429_as_rate_limited_with_its_retry_delay() {
        let err = LlmError::ApiError {
            status: 429,
            body: "slow down".to_string(),
            retry_after_seconds: Some(20),
        };
        assert_eq!(err.classify(), ErrorType::RateLimited);
        assert_eq!(err.retry_after_seconds(), Some(20));
    }

    #[test]
    fn classifies_401_as_auth_expired() {
        let err = LlmError::ApiError {
            status: 401,
            body: String::new(),
            retry_after_seconds: None,
        };
        assert_eq!(err.classify(), ErrorType::AuthExpired);
    }

    #[test]
    fn classifies_5xx_as_transient_and_4xx_as_permanent() {
        let server_err = LlmError::ApiError {
            status: 503,
            body: String::new(),
            retry_after_seconds: None,
        };
        assert_eq!(server_err.classify(), ErrorType::Transient);

        let client_err = LlmError::ApiError {
            status: 400,
            body: String::new(),
            retry_after_seconds: None,
        };
        assert_eq!(client_err.classify(), ErrorType::Permanent);
    }
}
