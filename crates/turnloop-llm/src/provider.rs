//! The [`LlmProvider`] trait every model backend implements.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::LlmResult;
use crate::types::{LlmResponse, LlmToolDefinition, Message, StreamEvent, SystemBlock};

/// A boxed, pinned stream of provider events.
pub type StreamBox = Pin<Box<dyn Stream<Item = LlmResult<StreamEvent>> + Send>>;

/// The only interface the core consumes from a model backend: something
/// that yields a stream of content / tool-use / stop events. The specific
/// wire format of any one vendor is a collaborator detail outside this
/// crate's concern; implementors own their own request/response shapes.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logging.
    fn name(&self) -> &str;

    /// Model identifier currently in use.
    fn model(&self) -> &str;

    /// Stream a completion. `system` carries the layered system blocks
    /// produced by the Injection Orchestrator; a provider that supports
    /// prompt caching should map equal `cache_layer` values to the same
    /// cache breakpoint.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
    ) -> LlmResult<StreamBox>;

    /// Complete without streaming, returning the full response at once.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
    ) -> LlmResult<LlmResponse>;

    /// A simple text-only completion with no tools or system prompt.
    async fn complete_simple(&self, prompt: &str) -> LlmResult<String> {
        let messages = vec![Message::user(prompt)];
        let response = self.complete(&messages, &[], &[]).await?;
        Ok(response.message.text().unwrap_or("").to_string())
    }

    /// Rough token estimate for text, used for context-budget decisions.
    fn count_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }

    /// Maximum context length this provider's model supports.
    fn max_context_length(&self) -> usize;
}

#[async_trait]
impl LlmProvider for Box<dyn LlmProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
    ) -> LlmResult<StreamBox> {
        (**self).stream(messages, tools, system).await
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &[SystemBlock],
    ) -> LlmResult<LlmResponse> {
        (**self).complete(messages, tools, system).await
    }

    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }

    fn max_context_length(&self) -> usize {
        (**self).max_context_length()
    }
}

/// Common provider configuration.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key or token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Sampling temperature, clamped to `[0.0, 1.0]`.
    pub temperature: f64,
    /// Override base URL, for self-hosted or proxy deployments.
    pub base_url: Option<String>,
    /// Context window override, if the model default is wrong for this
    /// deployment.
    pub context_window: Option<usize>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("has_base_url", &self.base_url.is_some())
            .field("context_window", &self.context_window)
            .finish()
    }
}

impl ProviderConfig {
    /// Build a config with an API key and model name.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.7,
            base_url: None,
            context_window: None,
        }
    }

    /// Set max tokens, builder-style.
    #[must_use]
    pub fn max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set temperature, builder-style. Clamped to `[0.0, 1.0]`.
    #[must_use]
    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = temp.clamp(0.0, 1.0);
        self
    }

    /// Set a custom base URL, builder-style.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the context window, builder-style.
    #[must_use]
    pub fn context_window(mut self, size: usize) -> Self {
        self.context_window = Some(size);
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
            base_url: None,
            context_window: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_is_clamped() {
        let config = ProviderConfig::new("key", "model").temperature(3.0);
        assert_eq!(config.temperature, 1.0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ProviderConfig::new("super-secret", "model");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
