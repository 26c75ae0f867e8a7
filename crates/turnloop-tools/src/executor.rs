//! Tool Executor (C4): resolves, invokes, times out, classifies, and
//! compacts tool calls.

use std::sync::Arc;
use std::time::Duration;

use turnloop_capabilities::{CapabilityKind, CapabilityRegistry};
use turnloop_core::ErrorType;

use crate::compactor::ResultCompactor;
use crate::context::{BuiltinTool, ToolContext};
use crate::error::{CompressionHint, ToolError};
use crate::registry::ToolRegistry;
use crate::usage::UsageTracker;
use crate::value::StructuredValue;

/// Default per-tool deadline when neither the tool nor the capability
/// declares one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A request to invoke one named tool.
pub struct ToolCall {
    /// Name to resolve.
    pub tool_name: String,
    /// Raw input, not yet validated against a schema.
    pub tool_input: serde_json::Value,
    /// A correlation id for this call, used by compaction and streaming.
    pub tool_id: String,
    /// Bypass compaction entirely regardless of size or hint.
    pub skip_compaction: bool,
}

/// The wire-shaped outcome of a tool call: a bare success/error envelope,
/// matching the on-disk and on-wire shapes in the external interfaces.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// A successful call.
    Success {
        /// The result, compacted if it crossed a threshold.
        content: StructuredValue,
        /// Whether `content` is itself a compacted envelope string.
        compressed: bool,
        /// Compaction bookkeeping, present iff `compressed`.
        metadata: Option<crate::compactor::CompactionMetadata>,
    },
    /// A failed call.
    Error {
        /// Human-readable message.
        error: String,
        /// Closed classification.
        error_type: ErrorType,
        /// Optional guidance for recovery.
        recovery_hint: Option<String>,
        /// Seconds to wait before retrying, for `rate_limited`.
        retry_after_seconds: Option<u64>,
    },
}

impl ToolOutcome {
    fn from_tool_error(err: ToolError) -> Self {
        Self::Error {
            error: err.message,
            error_type: err.error_type,
            recovery_hint: err.recovery_hint,
            retry_after_seconds: err.retry_after_seconds,
        }
    }

    /// Whether this outcome represents success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Resolves and runs tool calls per the three-step resolution order:
/// an in-process handler, then a `system`-provider capability (returned
/// verbatim), then a loaded tool implementation.
pub struct ToolExecutor {
    registry: ToolRegistry,
    capabilities: Arc<CapabilityRegistry>,
    compactor: ResultCompactor,
    usage: Arc<UsageTracker>,
    force_threshold: usize,
    normal_threshold: usize,
}

impl ToolExecutor {
    /// Build an executor over a handler registry and capability catalog.
    #[must_use]
    pub fn new(
        registry: ToolRegistry,
        capabilities: Arc<CapabilityRegistry>,
        compactor: ResultCompactor,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            registry,
            capabilities,
            compactor,
            usage,
            force_threshold: crate::compactor::DEFAULT_FORCE_THRESHOLD,
            normal_threshold: crate::compactor::DEFAULT_NORMAL_THRESHOLD,
        }
    }

    /// Override the `force` compaction threshold, builder-style.
    #[must_use]
    pub fn with_force_threshold(mut self, chars: usize) -> Self {
        self.force_threshold = chars;
        self
    }

    /// Override the default compaction threshold, builder-style.
    #[must_use]
    pub fn with_normal_threshold(mut self, chars: usize) -> Self {
        self.normal_threshold = chars;
        self
    }

    /// Run one tool call to completion.
    pub async fn execute(&self, call: ToolCall, ctx: &ToolContext) -> ToolOutcome {
        let outcome = self.dispatch(&call, ctx).await;
        self.usage.record(&call.tool_name, outcome.is_success());
        outcome
    }

    async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolOutcome {
        if let Some(tool) = self.registry.get(&call.tool_name) {
            return self.run_builtin(tool, call, ctx).await;
        }

        if let Some(capability) = self.capabilities.get(&call.tool_name) {
            if capability.kind == CapabilityKind::Tool && capability.provider == "system" {
                // A system-provider capability returns its input verbatim,
                // wrapped in success, with no further execution.
                return ToolOutcome::Success {
                    content: StructuredValue::String(call.tool_input.to_string()),
                    compressed: false,
                    metadata: None,
                };
            }
        }

        ToolOutcome::from_tool_error(ToolError::new(
            format!("no tool named '{}' is registered or loaded", call.tool_name),
            ErrorType::DependencyMissing,
        ))
    }

    async fn run_builtin(
        &self,
        tool: &dyn BuiltinTool,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let timeout = tool.execution_timeout().unwrap_or(DEFAULT_TIMEOUT);

        let result = tokio::time::timeout(timeout, tool.execute(call.tool_input.clone(), ctx)).await;

        let result = match result {
            Ok(result) => result,
            Err(_elapsed) => {
                return ToolOutcome::Error {
                    error: format!("tool '{}' timed out after {:?}", call.tool_name, timeout),
                    error_type: ErrorType::Timeout,
                    recovery_hint: None,
                    retry_after_seconds: None,
                };
            }
        };

        let value = match result {
            Ok(value) => value,
            Err(err) => return ToolOutcome::from_tool_error(err),
        };

        if call.skip_compaction || value.is_list() {
            return ToolOutcome::Success {
                content: value,
                compressed: false,
                metadata: None,
            };
        }

        self.maybe_compact(value, &call.tool_name, &call.tool_id).await
    }

    async fn maybe_compact(
        &self,
        mut value: StructuredValue,
        tool_name: &str,
        tool_id: &str,
    ) -> ToolOutcome {
        if Self::is_error_envelope(&value) {
            return ToolOutcome::Success {
                content: value,
                compressed: false,
                metadata: None,
            };
        }

        let hint = Self::take_compression_hint(&mut value);

        if hint == CompressionHint::Skip {
            return ToolOutcome::Success {
                content: value,
                compressed: false,
                metadata: None,
            };
        }

        let rendered_len = value.render().len();
        let threshold = match hint {
            CompressionHint::Force => self.force_threshold,
            _ => self.normal_threshold,
        };

        if rendered_len <= threshold && hint != CompressionHint::Force {
            return ToolOutcome::Success {
                content: value,
                compressed: false,
                metadata: None,
            };
        }

        let compacted_result = if hint == CompressionHint::Search {
            self.compactor.compact_search(&value, tool_name, tool_id).await
        } else {
            self.compactor.compact_default(&value, tool_name, tool_id).await
        };

        match compacted_result {
            Ok(compacted) => ToolOutcome::Success {
                content: StructuredValue::String(compacted.content),
                compressed: true,
                metadata: Some(compacted.metadata),
            },
            Err(err) => ToolOutcome::Error {
                error: format!("failed to write compaction file: {err}"),
                error_type: ErrorType::Transient,
                recovery_hint: None,
                retry_after_seconds: None,
            },
        }
    }

    /// Strip and return the `_compression_hint` out-of-band field, if the
    /// result carries one as a map key.
    /// A success-shaped map result that itself carries `success: false` and
    /// an `error` key is an error envelope a tool built by hand, not a
    /// compactable payload — compacting it would rewrite its `error` field
    /// into `[COMPRESSED:...]` text. Matches
    /// `original_source/core/tool/executor.py`'s `_maybe_compact` bypass.
    fn is_error_envelope(value: &StructuredValue) -> bool {
        let StructuredValue::Map(map) = value else {
            return false;
        };
        let success_is_false = match map.get("success") {
            Some(StructuredValue::Bool(b)) => !b,
            Some(StructuredValue::String(s)) => s == "false",
            _ => false,
        };
        success_is_false && map.contains_key("error")
    }

    fn take_compression_hint(value: &mut StructuredValue) -> CompressionHint {
        if let StructuredValue::Map(map) = value {
            if let Some(StructuredValue::String(hint)) = map.remove("_compression_hint") {
                return CompressionHint::parse(&hint);
            }
        }
        CompressionHint::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolResult;
    use std::collections::BTreeMap;
    use std::sync::Arc as StdArc;
    use turnloop_core::{InstanceId, SessionId};
    use turnloop_events::{EventBroadcaster, EventStorage};

    struct SleepyTool;

    #[async_trait::async_trait]
    impl BuiltinTool for SleepyTool {
        fn name(&self) -> &'static str {
            "sleepy"
        }
        fn description(&self) -> &'static str {
            "sleeps"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        fn execution_timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(50))
        }
        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> ToolResult {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(StructuredValue::String("too slow".to_string()))
        }
    }

    struct BigTextTool;

    #[async_trait::async_trait]
    impl BuiltinTool for BigTextTool {
        fn name(&self) -> &'static str {
            "big_text"
        }
        fn description(&self) -> &'static str {
            "returns a lot of text"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> ToolResult {
            Ok(StructuredValue::String("x".repeat(10_000)))
        }
    }

    struct SkipHintTool;

    #[async_trait::async_trait]
    impl BuiltinTool for SkipHintTool {
        fn name(&self) -> &'static str {
            "skip_hint"
        }
        fn description(&self) -> &'static str {
            "declares skip"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> ToolResult {
            let mut map = BTreeMap::new();
            map.insert(
                "_compression_hint".to_string(),
                StructuredValue::String("skip".to_string()),
            );
            map.insert("body".to_string(), StructuredValue::String("x".repeat(10_000)));
            Ok(StructuredValue::Map(map))
        }
    }

    struct ErrorEnvelopeTool;

    #[async_trait::async_trait]
    impl BuiltinTool for ErrorEnvelopeTool {
        fn name(&self) -> &'static str {
            "error_envelope"
        }
        fn description(&self) -> &'static str {
            "returns a hand-built error envelope with a large error message"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> ToolResult {
            let mut map = BTreeMap::new();
            map.insert("success".to_string(), StructuredValue::Bool(false));
            map.insert(
                "error".to_string(),
                StructuredValue::String("x".repeat(10_000)),
            );
            Ok(StructuredValue::Map(map))
        }
    }

    fn test_ctx() -> ToolContext {
        let storage = StdArc::new(EventStorage::new());
        let broadcaster = StdArc::new(EventBroadcaster::new(storage));
        ToolContext::new(SessionId::new(), InstanceId::new(), broadcaster)
    }

    fn test_executor(dir: &std::path::Path) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SleepyTool));
        registry.register(Box::new(BigTextTool));
        registry.register(Box::new(SkipHintTool));
        registry.register(Box::new(ErrorEnvelopeTool));
        let capabilities = StdArc::new(CapabilityRegistry::default());
        let compactor = ResultCompactor::new(dir.to_path_buf());
        let usage = StdArc::new(UsageTracker::new());
        ToolExecutor::new(registry, capabilities, compactor, usage)
    }

    #[tokio::test]
    async fn timeout_returns_timeout_error_within_bound() {
        let dir = tempfile::tempdir().unwrap();
        let executor = test_executor(dir.path());
        let ctx = test_ctx();
        let call = ToolCall {
            tool_name: "sleepy".to_string(),
            tool_input: serde_json::json!({}),
            tool_id: "call-1".to_string(),
            skip_compaction: false,
        };

        let started = std::time::Instant::now();
        let outcome = executor.execute(call, &ctx).await;
        assert!(started.elapsed() < Duration::from_millis(500));
        match outcome {
            ToolOutcome::Error { error_type, .. } => assert_eq!(error_type, ErrorType::Timeout),
            ToolOutcome::Success { .. } => panic!("expected timeout error"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_dependency_missing() {
        let dir = tempfile::tempdir().unwrap();
        let executor = test_executor(dir.path());
        let ctx = test_ctx();
        let call = ToolCall {
            tool_name: "nonexistent".to_string(),
            tool_input: serde_json::json!({}),
            tool_id: "call-2".to_string(),
            skip_compaction: false,
        };
        match executor.execute(call, &ctx).await {
            ToolOutcome::Error { error_type, .. } => assert_eq!(error_type, ErrorType::DependencyMissing),
            ToolOutcome::Success { .. } => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn large_results_are_compacted() {
        let dir = tempfile::tempdir().unwrap();
        let executor = test_executor(dir.path());
        let ctx = test_ctx();
        let call = ToolCall {
            tool_name: "big_text".to_string(),
            tool_input: serde_json::json!({}),
            tool_id: "call-3".to_string(),
            skip_compaction: false,
        };
        match executor.execute(call, &ctx).await {
            ToolOutcome::Success { compressed, metadata, .. } => {
                assert!(compressed);
                assert!(metadata.is_some());
            }
            ToolOutcome::Error { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn skip_hint_bypasses_compaction_regardless_of_size() {
        let dir = tempfile::tempdir().unwrap();
        let executor = test_executor(dir.path());
        let ctx = test_ctx();
        let call = ToolCall {
            tool_name: "skip_hint".to_string(),
            tool_input: serde_json::json!({}),
            tool_id: "call-4".to_string(),
            skip_compaction: false,
        };
        match executor.execute(call, &ctx).await {
            ToolOutcome::Success { compressed, .. } => assert!(!compressed),
            ToolOutcome::Error { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn error_envelopes_are_never_compacted() {
        let dir = tempfile::tempdir().unwrap();
        let executor = test_executor(dir.path());
        let ctx = test_ctx();
        let call = ToolCall {
            tool_name: "error_envelope".to_string(),
            tool_input: serde_json::json!({}),
            tool_id: "call-5".to_string(),
            skip_compaction: false,
        };
        match executor.execute(call, &ctx).await {
            ToolOutcome::Success { compressed, content, .. } => {
                assert!(!compressed);
                let StructuredValue::Map(map) = content else {
                    panic!("expected the map to pass through unchanged");
                };
                assert_eq!(map.get("error"), Some(&StructuredValue::String("x".repeat(10_000))));
            }
            ToolOutcome::Error { .. } => panic!("expected success"),
        }
    }
}
