//! State Consistency Manager (C10): filesystem snapshots, consecutive
//! failure tracking, and consistency alerts.
//!
//! The manager only ever *surfaces* a choice through an event; it never
//! rolls back on its own initiative. [`StateManager::rollback`] only runs
//! when a caller explicitly invokes it, typically after a user or the
//! orchestrator has acted on a [`ConsistencyAlert`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use turnloop_core::SessionId;
use turnloop_events::{EventBroadcaster, EventType};

use crate::error::StateError;
use crate::fs_copy::copy_dir;
use crate::types::{ConsistencyAlert, OperationOutcome, Severity, SnapshotMeta};
use turnloop_core::SnapshotId;

/// Default size cap on the whole snapshot store: 500MB.
pub const DEFAULT_SIZE_CAP_BYTES: u64 = 500 * 1024 * 1024;
/// Default number of consecutive failures before an alert fires.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Snapshots and monitors one session's working directory.
pub struct StateManager {
    root: PathBuf,
    snapshot_root: PathBuf,
    size_cap_bytes: u64,
    failure_threshold: u32,
    broadcaster: Arc<EventBroadcaster>,
    metas: Mutex<Vec<SnapshotMeta>>,
    failure_streak: AtomicU32,
}

impl StateManager {
    /// Build a manager tracking `root`, storing snapshots under
    /// `snapshot_root`, with the default size cap and failure threshold.
    #[must_use]
    pub fn new(root: PathBuf, snapshot_root: PathBuf, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            root,
            snapshot_root,
            size_cap_bytes: DEFAULT_SIZE_CAP_BYTES,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            broadcaster,
            metas: Mutex::new(Vec::new()),
            failure_streak: AtomicU32::new(0),
        }
    }

    /// Override the snapshot store's size cap, builder-style.
    #[must_use]
    pub fn with_size_cap_bytes(mut self, cap: u64) -> Self {
        self.size_cap_bytes = cap;
        self
    }

    /// Override the consecutive-failure threshold, builder-style.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Capture the working directory's current state as a labeled
    /// snapshot, evicting the oldest snapshots first if the store would
    /// exceed its size cap.
    pub async fn snapshot(&self, label: impl Into<String>) -> Result<SnapshotId, StateError> {
        let id = SnapshotId::new();
        let dst = self.snapshot_root.join(id.0.to_string());
        let size_bytes = copy_dir(self.root.clone(), dst.clone()).await?;

        if size_bytes > self.size_cap_bytes {
            let _ = tokio::fs::remove_dir_all(&dst).await;
            return Err(StateError::CapacityExceeded {
                needed: size_bytes,
                cap: self.size_cap_bytes,
            });
        }

        let mut metas = self.metas.lock().await;
        let mut total: u64 = metas.iter().map(|m| m.size_bytes).sum::<u64>() + size_bytes;
        while total > self.size_cap_bytes {
            let Some(oldest) = metas.first().cloned() else { break };
            let oldest_path = self.snapshot_root.join(oldest.id.0.to_string());
            let _ = tokio::fs::remove_dir_all(&oldest_path).await;
            total -= oldest.size_bytes;
            metas.remove(0);
        }

        metas.push(SnapshotMeta {
            id: id.clone(),
            label: label.into(),
            created_at: turnloop_core::Timestamp::now(),
            size_bytes,
        });
        Ok(id)
    }

    /// Restore the working directory from a previously captured snapshot.
    /// Resets the consecutive-failure streak, since a rollback is the
    /// caller's explicit remediation for whatever the streak was tracking.
    pub async fn rollback(&self, session_id: &SessionId, id: &SnapshotId) -> Result<(), StateError> {
        {
            let metas = self.metas.lock().await;
            if !metas.iter().any(|m| &m.id == id) {
                return Err(StateError::SnapshotNotFound(id.clone()));
            }
        }
        let src = self.snapshot_root.join(id.0.to_string());
        if self.root.exists() {
            tokio::fs::remove_dir_all(&self.root).await?;
        }
        copy_dir(src, self.root.clone()).await?;
        self.failure_streak.store(0, Ordering::SeqCst);
        self.broadcaster
            .emit(
                session_id,
                EventType::Custom {
                    name: "state_rolled_back".to_string(),
                    payload: serde_json::json!({ "snapshot_id": id.to_string() }),
                },
            )
            .await;
        Ok(())
    }

    /// Whether a snapshot is recommended before starting the next task:
    /// true when there is an active failure streak, or no snapshot has
    /// ever been taken.
    pub async fn check_pre_task(&self) -> bool {
        let streak = self.failure_streak.load(Ordering::SeqCst);
        let metas = self.metas.lock().await;
        streak > 0 || metas.is_empty()
    }

    /// Record a task's outcome. Resets the streak on success; on failure,
    /// increments it and, once the streak reaches the threshold (or the
    /// failure is critical), emits a `consistency_alert` event and
    /// returns it. The manager never rolls back here — only the caller,
    /// via [`Self::rollback`], acting on this alert.
    pub async fn check_post_task(
        &self,
        session_id: &SessionId,
        outcome: OperationOutcome,
    ) -> Option<ConsistencyAlert> {
        if outcome.succeeded {
            self.failure_streak.store(0, Ordering::SeqCst);
            return None;
        }

        let streak = self.failure_streak.fetch_add(1, Ordering::SeqCst) + 1;
        let triggers = outcome.severity == Severity::Critical || streak >= self.failure_threshold;
        if !triggers {
            return None;
        }

        let suggested_snapshot = self.metas.lock().await.last().map(|m| m.id.clone());
        let alert = ConsistencyAlert {
            reason: outcome.description,
            consecutive_failures: streak,
            suggested_snapshot,
        };
        self.broadcaster
            .emit(
                session_id,
                EventType::Custom {
                    name: "consistency_alert".to_string(),
                    payload: serde_json::json!(alert),
                },
            )
            .await;
        Some(alert)
    }

    /// Record an operation's outcome without the pre/post-task framing;
    /// equivalent to [`Self::check_post_task`].
    pub async fn record_operation(
        &self,
        session_id: &SessionId,
        outcome: OperationOutcome,
    ) -> Option<ConsistencyAlert> {
        self.check_post_task(session_id, outcome).await
    }

    /// All captured snapshot metadata, oldest first.
    pub async fn list_snapshots(&self) -> Vec<SnapshotMeta> {
        self.metas.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnloop_events::EventStorage;

    fn broadcaster() -> Arc<EventBroadcaster> {
        Arc::new(EventBroadcaster::new(Arc::new(EventStorage::new())))
    }

    #[tokio::test]
    async fn snapshot_then_rollback_restores_contents() {
        let root = tempfile::tempdir().unwrap();
        let snapshots = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("a.txt"), b"v1").unwrap();

        let manager = StateManager::new(root.path().to_path_buf(), snapshots.path().to_path_buf(), broadcaster());
        let id = manager.snapshot("before change").await.unwrap();

        std::fs::write(root.path().join("a.txt"), b"v2-broken").unwrap();
        let session = SessionId::new();
        manager.rollback(&session, &id).await.unwrap();

        let restored = std::fs::read_to_string(root.path().join("a.txt")).unwrap();
        assert_eq!(restored, "v1");
    }

    #[tokio::test]
    async fn three_consecutive_failures_trigger_an_alert() {
        let root = tempfile::tempdir().unwrap();
        let snapshots = tempfile::tempdir().unwrap();
        let manager = StateManager::new(root.path().to_path_buf(), snapshots.path().to_path_buf(), broadcaster());
        let session = SessionId::new();

        assert!(manager.record_operation(&session, OperationOutcome::failure("a")).await.is_none());
        assert!(manager.record_operation(&session, OperationOutcome::failure("b")).await.is_none());
        let alert = manager.record_operation(&session, OperationOutcome::failure("c")).await;
        assert!(alert.is_some());
        assert_eq!(alert.unwrap().consecutive_failures, 3);
    }

    #[tokio::test]
    async fn a_success_resets_the_streak() {
        let root = tempfile::tempdir().unwrap();
        let snapshots = tempfile::tempdir().unwrap();
        let manager = StateManager::new(root.path().to_path_buf(), snapshots.path().to_path_buf(), broadcaster());
        let session = SessionId::new();

        manager.record_operation(&session, OperationOutcome::failure("a")).await;
        manager.record_operation(&session, OperationOutcome::success("b")).await;
        let alert = manager.record_operation(&session, OperationOutcome::failure("c")).await;
        assert!(alert.is_none());
    }

    #[tokio::test]
    async fn a_critical_failure_alerts_immediately() {
        let root = tempfile::tempdir().unwrap();
        let snapshots = tempfile::tempdir().unwrap();
        let manager = StateManager::new(root.path().to_path_buf(), snapshots.path().to_path_buf(), broadcaster());
        let session = SessionId::new();

        let alert = manager
            .record_operation(&session, OperationOutcome::failure("boom").critical())
            .await;
        assert!(alert.is_some());
    }

    #[tokio::test]
    async fn eviction_keeps_the_store_under_its_cap() {
        let root = tempfile::tempdir().unwrap();
        let snapshots = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("payload.bin"), vec![0u8; 1024]).unwrap();

        let manager = StateManager::new(root.path().to_path_buf(), snapshots.path().to_path_buf(), broadcaster())
            .with_size_cap_bytes(1500);

        manager.snapshot("first").await.unwrap();
        manager.snapshot("second").await.unwrap();
        manager.snapshot("third").await.unwrap();

        let remaining = manager.list_snapshots().await;
        assert!(remaining.len() <= 1);
    }
}
