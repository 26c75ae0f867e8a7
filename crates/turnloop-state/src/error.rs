//! Errors raised while snapshotting, rolling back, or evicting state.

use turnloop_core::SnapshotId;

/// Failures from the state consistency manager.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A filesystem operation failed while copying a snapshot.
    #[error("state filesystem error: {0}")]
    Io(#[from] std::io::Error),
    /// No snapshot exists with this id.
    #[error("no such snapshot: {0}")]
    SnapshotNotFound(SnapshotId),
    /// Taking this snapshot would exceed the size cap even after evicting
    /// every other snapshot.
    #[error("snapshot of {needed} bytes exceeds the {cap} byte cap on its own")]
    CapacityExceeded {
        /// Bytes the new snapshot would occupy.
        needed: u64,
        /// The configured cap.
        cap: u64,
    },
}
