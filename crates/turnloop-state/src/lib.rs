//! State Consistency Manager (C10): directory snapshots, rollback, and
//! consecutive-failure tracking that surfaces a choice instead of acting
//! unilaterally.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod fs_copy;
mod manager;
mod types;

pub use error::StateError;
pub use fs_copy::{copy_dir, dir_size};
pub use manager::{StateManager, DEFAULT_FAILURE_THRESHOLD, DEFAULT_SIZE_CAP_BYTES};
pub use types::{ConsistencyAlert, OperationOutcome, Severity, SnapshotMeta};
