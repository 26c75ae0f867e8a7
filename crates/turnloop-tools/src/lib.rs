//! Tool execution and result compaction: the Tool Executor (C4) and Result
//! Compactor (C5).
//!
//! Tool errors never raise past [`ToolExecutor::execute`]; every failure
//! comes back as a structured [`ToolOutcome::Error`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod compactor;
mod context;
mod error;
mod executor;
mod registry;
mod usage;
mod value;

pub use compactor::{
    CompactedResult, CompactionMetadata, ResultCompactor, DEFAULT_FORCE_THRESHOLD,
    DEFAULT_HEAD_LINES, DEFAULT_NORMAL_THRESHOLD, DEFAULT_TAIL_LINES, SEARCH_TOP_N, SNIPPET_CHARS,
};
pub use context::{BuiltinTool, ToolContext, ToolResult};
pub use error::{CompressionHint, ToolError};
pub use executor::{ToolCall, ToolExecutor, ToolOutcome, DEFAULT_TIMEOUT};
pub use registry::ToolRegistry;
pub use usage::{ToolUsage, UsageTracker};
pub use value::StructuredValue;
