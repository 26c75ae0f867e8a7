//! Shared identifiers, timestamps, and the error taxonomy used across every
//! `turnloop-*` crate.
//!
//! This crate has no async runtime and no I/O dependency of its own; it
//! exists so the rest of the workspace can agree on what a session id, a
//! timestamp, and a tool error classification look like without every
//! crate depending directly on every other one.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error_type;
mod ids;
mod timestamp;

pub use error_type::ErrorType;
pub use ids::{ConversationId, InstanceId, MessageId, SessionId, SnapshotId, UserId};
pub use timestamp::Timestamp;
