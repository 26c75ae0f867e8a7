//! Prompt Cache (C6) and Injection Orchestrator (C7): pre-rendered system
//! prompts plus the layered assembly of a turn's system blocks and
//! user-context content from a registered set of injectors.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cache;
mod injector;
mod orchestrator;

pub use cache::{AgentSchema, PromptCache, PromptTier, RuntimeContext};
pub use injector::{CacheStrategy, InjectionContext, Injector, InjectorOutput, Phase};
pub use orchestrator::InjectionOrchestrator;
