//! Retry policy for the LLM stream call, classified via
//! [`turnloop_llm::LlmError::classify`].
//!
//! `rate_limited` retries after the provider's declared delay (or a
//! default backoff); `transient` retries a bounded number of times with no
//! delay of its own; every other classification — `auth_expired`,
//! `permanent` — is not retried and propagates straight back to the
//! caller, which ends the turn.

use turnloop_llm::{LlmProvider, LlmResult, LlmToolDefinition, Message, StreamBox, SystemBlock};

use crate::config::RuntimeConfig;

/// Attempt to open a stream, retrying rate-limited and transient failures
/// per `config`. Returns the first success, or the last error once the
/// retry budget is exhausted.
pub async fn stream_with_retry(
    provider: &dyn LlmProvider,
    messages: &[Message],
    tools: &[LlmToolDefinition],
    system: &[SystemBlock],
    config: &RuntimeConfig,
) -> LlmResult<StreamBox> {
    let mut transient_attempts_left = config.max_transient_retries;
    loop {
        match provider.stream(messages, tools, system).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                let classification = err.classify();
                if !classification.is_retryable() {
                    return Err(err);
                }
                if classification == turnloop_core::ErrorType::RateLimited {
                    let delay = err
                        .retry_after_seconds()
                        .map(std::time::Duration::from_secs)
                        .unwrap_or(config.default_rate_limit_backoff);
                    tracing::warn!(?delay, "rate limited, retrying after backoff");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                // Transient: retry a bounded number of times with no delay.
                if transient_attempts_left == 0 {
                    return Err(err);
                }
                transient_attempts_left -= 1;
                tracing::warn!(remaining = transient_attempts_left, "transient stream failure, retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use turnloop_llm::{LlmError, LlmResponse};

    struct FlakyProvider {
        failures_before_success: u32,
        calls: AtomicU32,
        status: u16,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }
        fn model(&self) -> &str {
            "test-model"
        }
        async fn stream(&self, _messages: &[Message], _tools: &[LlmToolDefinition], _system: &[SystemBlock]) -> LlmResult<StreamBox> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(LlmError::ApiError {
                    status: self.status,
                    body: String::new(),
                    retry_after_seconds: Some(0),
                })
            } else {
                Ok(Box::pin(futures::stream::empty()))
            }
        }
        async fn complete(&self, _messages: &[Message], _tools: &[LlmToolDefinition], _system: &[SystemBlock]) -> LlmResult<LlmResponse> {
            unimplemented!()
        }
        fn max_context_length(&self) -> usize {
            100_000
        }
    }

    #[tokio::test]
    async fn rate_limited_failures_retry_until_success() {
        let provider = FlakyProvider {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
            status: 429,
        };
        let config = RuntimeConfig::default();
        let result = stream_with_retry(&provider, &[], &[], &[], &config).await;
        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let provider = FlakyProvider {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
            status: 400,
        };
        let config = RuntimeConfig::default();
        let result = stream_with_retry(&provider, &[], &[], &[], &config).await;
        assert!(result.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_retry_only_up_to_the_configured_budget() {
        let provider = FlakyProvider {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
            status: 503,
        };
        let config = RuntimeConfig {
            max_transient_retries: 2,
            ..RuntimeConfig::default()
        };
        let result = stream_with_retry(&provider, &[], &[], &[], &config).await;
        assert!(result.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }
}
