//! LLM message types, the [`LlmProvider`] trait, and a generic SSE-based
//! chat provider implementation.
//!
//! The core only ever consumes the trait: something that yields a stream of
//! content/tool-use/stop events. [`HttpChatProvider`] is one concrete
//! backend speaking a generic content-block SSE protocol; swapping in a
//! vendor-specific client means implementing [`LlmProvider`] again, not
//! changing anything upstream.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod http_provider;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use http_provider::HttpChatProvider;
pub use provider::{LlmProvider, ProviderConfig, StreamBox};
pub use types::{
    ContentPart, LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole, StopReason,
    StreamEvent, SystemBlock, ToolCall, ToolCallResult, Usage,
};
