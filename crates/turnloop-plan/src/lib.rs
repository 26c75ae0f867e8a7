//! Plan/Todo state machine (C9): the `plan` tool, its per-session store,
//! and progressive-disclosure rendering of the active plan into prompt
//! markdown.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod format;
mod manager;
mod store;
mod tool;
mod types;

pub use format::render_markdown;
pub use manager::{FailureGuidance, PlanManager};
pub use store::{PlanError, PlanStore};
pub use tool::PlanTool;
pub use types::{is_valid_transition, Plan, Todo, TodoStatus};
