//! Intent Analyzer (C8): a cheap pre-turn classification pass that decides
//! task complexity, plan need, skill focus, follow-up status, and memory
//! skip, with a deterministic token-match supplement over the model's own
//! skill-group guess.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod analyzer;
mod skills;
mod types;

pub use analyzer::IntentAnalyzer;
pub use skills::{token_match_skills, union_skill_groups};
pub use types::{Complexity, IntentResult};
