//! Snapshot metadata and operation-outcome records.

use serde::Serialize;
use turnloop_core::{SnapshotId, Timestamp};

/// How serious an operation's failure would be, gating whether a single
/// failure is enough to trigger a consistency alert regardless of streak
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An ordinary, recoverable failure.
    Normal,
    /// Severe enough to surface a choice immediately, bypassing the
    /// consecutive-failure threshold.
    Critical,
}

/// One recorded operation outcome, fed into the consecutive-failure
/// tracker.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    /// Human-readable description of what was attempted.
    pub description: String,
    /// Whether it succeeded.
    pub succeeded: bool,
    /// Its severity classification.
    pub severity: Severity,
}

impl OperationOutcome {
    /// A successful, normal-severity operation.
    #[must_use]
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            succeeded: true,
            severity: Severity::Normal,
        }
    }

    /// A failed, normal-severity operation.
    #[must_use]
    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            succeeded: false,
            severity: Severity::Normal,
        }
    }

    /// A failed, critical-severity operation, builder-style.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.severity = Severity::Critical;
        self
    }
}

/// Metadata about one captured snapshot; the snapshot's file contents live
/// under the manager's snapshot directory, keyed by `id`.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMeta {
    /// Unique id, also the snapshot directory's name.
    pub id: SnapshotId,
    /// Caller-supplied label, for display.
    pub label: String,
    /// When it was captured.
    pub created_at: Timestamp,
    /// Total bytes copied.
    pub size_bytes: u64,
}

/// Surfaced when the manager judges the session's state inconsistent. The
/// manager never acts on this itself; it only emits the choice as an
/// event and returns it here for the caller to act on.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyAlert {
    /// Why the alert fired.
    pub reason: String,
    /// Consecutive failures observed at the time of the alert.
    pub consecutive_failures: u32,
    /// The most recent snapshot available to roll back to, if any.
    pub suggested_snapshot: Option<SnapshotId>,
}
