//! Agent Orchestrator (C11): the main turn loop tying together the Prompt
//! Cache, Injection Orchestrator, Intent Analyzer, Tool Executor, Plan
//! Manager, and State Consistency Manager behind a single `run_turn` call.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod error;
mod retry;
mod runtime;
mod session;

pub use config::{
    RejectionPolicy, RuntimeConfig, DEFAULT_CONSECUTIVE_FAILURE_LIMIT, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_LONG_RUNNING_CONFIRM_AFTER_TURNS, DEFAULT_MAX_DURATION, DEFAULT_MAX_TRANSIENT_RETRIES, DEFAULT_MAX_TURNS,
    DEFAULT_RATE_LIMIT_BACKOFF,
};
pub use error::{RuntimeError, RuntimeResult};
pub use retry::stream_with_retry;
pub use runtime::AgentOrchestrator;
pub use session::Session;
