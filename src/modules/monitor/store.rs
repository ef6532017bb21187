/// Single source of truth for jobs, notifications and monitor settings
///
/// Everything else in the crate reads snapshots of this store; the poller
/// and explicit UI actions are its only writers. Both run on the same
/// runtime, so the `RwLock` serializes mutation without any further
/// coordination.
use crate::modules::monitor::domain::{
    ConnectionStatus, Job, JobPatch, MonitorConfig, MonitorConfigPatch, Notification,
};
use crate::modules::monitor::persistence::{NullSnapshotStore, SnapshotStore, StoreSnapshot};
use crate::{log_debug, log_warn};
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoreInner {
    active: HashMap<String, Job>,
    completed: HashMap<String, Job>,
    notifications: Vec<Notification>,
    config: MonitorConfig,
    connection: ConnectionStatus,
}

impl StoreInner {
    fn empty(config: MonitorConfig) -> Self {
        Self {
            active: HashMap::new(),
            completed: HashMap::new(),
            notifications: Vec::new(),
            config,
            connection: ConnectionStatus::Connected,
        }
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            active: self.active.values().cloned().collect(),
            completed: self.completed.values().cloned().collect(),
            notifications: self.notifications.clone(),
            config: Some(self.config.clone()),
        }
    }
}

pub struct JobStateStore {
    inner: RwLock<StoreInner>,
    snapshot_store: Arc<dyn SnapshotStore>,
}

impl JobStateStore {
    /// In-memory store, no persistence. The usual choice for tests.
    pub fn in_memory(config: MonitorConfig) -> Self {
        Self {
            inner: RwLock::new(StoreInner::empty(config)),
            snapshot_store: Arc::new(NullSnapshotStore),
        }
    }

    /// Restore a prior session through the injected snapshot store.
    /// A persisted config overrides `default_config`; absence or corruption
    /// of the snapshot falls back to an empty store.
    pub async fn restore(
        default_config: MonitorConfig,
        snapshot_store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let inner = match snapshot_store.load().await {
            Ok(Some(snapshot)) => {
                let config = snapshot.config.unwrap_or_else(|| default_config.clone());
                let mut inner = StoreInner::empty(config);
                for job in snapshot.active {
                    // A job that was terminal at save time belongs in the
                    // completed set regardless of where it was stored.
                    if job.is_terminal() {
                        inner.completed.insert(job.id.clone(), job);
                    } else {
                        inner.active.insert(job.id.clone(), job);
                    }
                }
                for job in snapshot.completed {
                    inner.completed.insert(job.id.clone(), job);
                }
                inner.notifications = snapshot.notifications;
                log_debug!(
                    "Restored session: {} active, {} completed jobs",
                    inner.active.len(),
                    inner.completed.len()
                );
                inner
            }
            Ok(None) => StoreInner::empty(default_config),
            Err(err) => {
                log_warn!("Ignoring unreadable session snapshot: {}", err);
                StoreInner::empty(default_config)
            }
        };

        Self {
            inner: RwLock::new(inner),
            snapshot_store,
        }
    }

    // ---- jobs ----

    /// Insert a job into the active set. Duplicate ids are ignored (the
    /// first insert wins), so a double-submitted form never creates two
    /// logical entries.
    pub async fn add_job(&self, job: Job) {
        {
            let mut inner = self.inner.write().await;
            if inner.active.contains_key(&job.id) || inner.completed.contains_key(&job.id) {
                log_warn!("Ignoring duplicate job id {}", job.id);
                return;
            }
            if inner.active.len() >= inner.config.max_tracked_jobs {
                log_warn!(
                    "Refusing job {}: already tracking {} active jobs",
                    job.id,
                    inner.active.len()
                );
                return;
            }
            inner.active.insert(job.id.clone(), job);
        }
        self.persist().await;
    }

    /// Merge a partial update into an existing job (active or completed).
    /// An unknown id is a warning-level no-op, never an error.
    pub async fn update_job(&self, id: &str, patch: JobPatch) {
        {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;
            let job = if let Some(job) = inner.active.get_mut(id) {
                job
            } else if let Some(job) = inner.completed.get_mut(id) {
                job
            } else {
                log_warn!("Ignoring update for unknown job {}", id);
                return;
            };

            if let Some(progress) = patch.progress {
                if progress < job.progress && !job.is_terminal() {
                    log_warn!(
                        "Job {} progress regressed from {} to {}",
                        id,
                        job.progress,
                        progress
                    );
                }
                job.progress = progress.min(100);
            }
            if let Some(state) = patch.state {
                job.state = state;
            }
            if let Some(outputs) = patch.outputs {
                job.outputs = outputs;
            }
            if let Some(metadata) = patch.metadata {
                job.metadata.extend(metadata);
            }
            job.updated_at = Utc::now();
        }
        self.persist().await;
    }

    /// Relocate a job from the active to the completed set. Idempotent:
    /// calling it for an already-completed or unknown id does nothing.
    pub async fn move_to_completed(&self, id: &str) {
        {
            let mut inner = self.inner.write().await;
            match inner.active.remove(id) {
                Some(job) => {
                    inner.completed.insert(id.to_string(), job);
                }
                None => {
                    if !inner.completed.contains_key(id) {
                        log_warn!("Cannot complete unknown job {}", id);
                    }
                    return;
                }
            }
        }
        self.persist().await;
    }

    pub async fn remove_job(&self, id: &str) {
        {
            let mut inner = self.inner.write().await;
            if inner.active.remove(id).is_none() && inner.completed.remove(id).is_none() {
                return;
            }
        }
        self.persist().await;
    }

    pub async fn get_job(&self, id: &str) -> Option<Job> {
        let inner = self.inner.read().await;
        inner
            .active
            .get(id)
            .or_else(|| inner.completed.get(id))
            .cloned()
    }

    /// Active jobs ordered by creation time (ties broken by id) so list
    /// views and the poller see a stable order.
    pub async fn active_jobs(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner.active.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub async fn completed_jobs(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner.completed.values().cloned().collect();
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// The id set one polling tick covers: explicitly requested ids first,
    /// in the order supplied, then the remaining active ids by creation
    /// time. Deterministic so per-tick processing order is stable.
    pub async fn poll_ids(&self, explicit: &[String]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in explicit {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        for job in self.active_jobs().await {
            if !ids.contains(&job.id) {
                ids.push(job.id);
            }
        }
        ids
    }

    /// Drop completed jobs whose last update is older than the retention
    /// window. Iterates a snapshot of ids, so hooks that mutate the store
    /// mid-sweep cannot corrupt iteration. Returns the number removed.
    pub async fn sweep_completed(&self) -> usize {
        let removed = {
            let mut inner = self.inner.write().await;
            let cutoff = Utc::now() - ChronoDuration::hours(inner.config.cleanup_after_hours as i64);
            let expired: Vec<String> = inner
                .completed
                .values()
                .filter(|job| job.updated_at < cutoff)
                .map(|job| job.id.clone())
                .collect();
            for id in &expired {
                inner.completed.remove(id);
            }
            expired.len()
        };

        if removed > 0 {
            log_debug!("Retention sweep removed {} completed jobs", removed);
            self.persist().await;
        }
        removed
    }

    // ---- notifications ----

    pub async fn add_notification(&self, notification: Notification) {
        {
            let mut inner = self.inner.write().await;
            inner.notifications.push(notification);
        }
        self.persist().await;
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.read().await.notifications.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.inner
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn mark_notification_read(&self, id: Uuid) {
        {
            let mut inner = self.inner.write().await;
            match inner.notifications.iter_mut().find(|n| n.id == id) {
                Some(notification) => notification.read = true,
                None => return,
            }
        }
        self.persist().await;
    }

    pub async fn clear_notifications(&self) {
        {
            let mut inner = self.inner.write().await;
            inner.notifications.clear();
        }
        self.persist().await;
    }

    // ---- config & connection ----

    pub async fn config(&self) -> MonitorConfig {
        self.inner.read().await.config.clone()
    }

    pub async fn update_config(&self, patch: MonitorConfigPatch) {
        {
            let mut inner = self.inner.write().await;
            inner.config.apply(patch);
        }
        self.persist().await;
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        self.inner.read().await.connection.clone()
    }

    /// Transient reachability flag; not persisted.
    pub async fn set_connection_status(&self, status: ConnectionStatus) {
        let mut inner = self.inner.write().await;
        if inner.connection != status {
            log_debug!("Connection status changed: {:?}", status);
        }
        inner.connection = status;
    }

    // ---- persistence ----

    /// Best-effort save of the full store through the snapshot capability.
    /// Never blocks or fails the logical operation that triggered it.
    async fn persist(&self) {
        let snapshot = {
            let inner = self.inner.read().await;
            if !inner.config.persistence_enabled {
                return;
            }
            inner.to_snapshot()
        };

        if let Err(err) = self.snapshot_store.save(&snapshot).await {
            log_warn!("Failed to persist store snapshot: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::monitor::domain::{JobKind, JobState};

    fn store() -> JobStateStore {
        JobStateStore::in_memory(MonitorConfig::default())
    }

    #[tokio::test]
    async fn test_add_job_is_idempotent_first_wins() {
        let store = store();
        store.add_job(Job::new("job_1", JobKind::BatchRender)).await;

        let mut duplicate = Job::new("job_1", JobKind::Compose);
        duplicate.progress = 60;
        store.add_job(duplicate).await;

        let jobs = store.active_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].kind, JobKind::BatchRender);
        assert_eq!(jobs[0].progress, 0);
    }

    #[tokio::test]
    async fn test_duplicate_of_completed_job_is_ignored() {
        let store = store();
        store.add_job(Job::new("job_1", JobKind::Compose)).await;
        store.move_to_completed("job_1").await;

        store.add_job(Job::new("job_1", JobKind::Compose)).await;
        assert!(store.active_jobs().await.is_empty());
        assert_eq!(store.completed_jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_job_is_a_no_op() {
        let store = store();
        store
            .update_job(
                "ghost",
                JobPatch {
                    progress: Some(50),
                    ..Default::default()
                },
            )
            .await;
        assert!(store.get_job("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_clamps_progress() {
        let store = store();
        store.add_job(Job::new("job_1", JobKind::TextToSpeech)).await;

        store
            .update_job(
                "job_1",
                JobPatch {
                    state: Some(JobState::Running),
                    progress: Some(45),
                    ..Default::default()
                },
            )
            .await;

        let job = store.get_job("job_1").await.unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.progress, 45);
        // Untouched fields survive the merge
        assert_eq!(job.kind, JobKind::TextToSpeech);
    }

    #[tokio::test]
    async fn test_move_to_completed_is_idempotent() {
        let store = store();
        store.add_job(Job::new("job_1", JobKind::BatchRender)).await;

        store.move_to_completed("job_1").await;
        store.move_to_completed("job_1").await;

        assert!(store.active_jobs().await.is_empty());
        assert_eq!(store.completed_jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_job_lives_in_exactly_one_set() {
        let store = store();
        store.add_job(Job::new("job_1", JobKind::Compose)).await;
        store.move_to_completed("job_1").await;

        assert!(store.active_jobs().await.is_empty());
        assert_eq!(store.completed_jobs().await.len(), 1);

        store.remove_job("job_1").await;
        assert!(store.completed_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_limit_refuses_new_jobs() {
        let store = JobStateStore::in_memory(MonitorConfig {
            max_tracked_jobs: 2,
            ..Default::default()
        });

        store.add_job(Job::new("a", JobKind::Compose)).await;
        store.add_job(Job::new("b", JobKind::Compose)).await;
        store.add_job(Job::new("c", JobKind::Compose)).await;

        assert_eq!(store.active_jobs().await.len(), 2);
        assert!(store.get_job("c").await.is_none());
    }

    #[tokio::test]
    async fn test_retention_sweep_respects_window() {
        let store = JobStateStore::in_memory(MonitorConfig {
            cleanup_after_hours: 24,
            ..Default::default()
        });

        let mut stale = Job::new("stale", JobKind::BatchRender);
        stale.state = JobState::Done;
        let mut fresh = Job::new("fresh", JobKind::BatchRender);
        fresh.state = JobState::Done;
        store.add_job(stale).await;
        store.add_job(fresh).await;
        store.move_to_completed("stale").await;
        store.move_to_completed("fresh").await;

        // Backdate: one outside the window, one 1h inside it
        {
            let mut inner = store.inner.write().await;
            inner.completed.get_mut("stale").unwrap().updated_at =
                Utc::now() - ChronoDuration::hours(30);
            inner.completed.get_mut("fresh").unwrap().updated_at =
                Utc::now() - ChronoDuration::hours(23);
        }

        let removed = store.sweep_completed().await;
        assert_eq!(removed, 1);
        assert!(store.get_job("stale").await.is_none());
        assert!(store.get_job("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_leaves_active_jobs_alone() {
        let store = store();
        store.add_job(Job::new("job_1", JobKind::Compose)).await;
        {
            let mut inner = store.inner.write().await;
            inner.active.get_mut("job_1").unwrap().updated_at =
                Utc::now() - ChronoDuration::hours(100);
        }

        assert_eq!(store.sweep_completed().await, 0);
        assert!(store.get_job("job_1").await.is_some());
    }

    #[tokio::test]
    async fn test_notification_lifecycle() {
        let store = store();
        let n = Notification::success("Job completed", "job_1 finished", Some("job_1".into()));
        let id = n.id;
        store.add_notification(n).await;
        store.add_notification(Notification::info("hello", "world")).await;

        assert_eq!(store.unread_count().await, 2);
        store.mark_notification_read(id).await;
        assert_eq!(store.unread_count().await, 1);

        store.clear_notifications().await;
        assert!(store.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_poll_ids_orders_explicit_before_active() {
        let store = store();
        store.add_job(Job::new("a", JobKind::Compose)).await;
        store.add_job(Job::new("b", JobKind::Compose)).await;

        let ids = store.poll_ids(&["b".to_string(), "x".to_string()]).await;
        // Explicit order first, then remaining active ids, no duplicates
        assert_eq!(ids, vec!["b", "x", "a"]);
    }

    #[tokio::test]
    async fn test_restore_falls_back_to_empty_on_corruption() {
        struct BrokenStore;
        #[async_trait::async_trait]
        impl SnapshotStore for BrokenStore {
            async fn load(&self) -> crate::shared::AppResult<Option<StoreSnapshot>> {
                Err(crate::shared::AppError::PersistenceError("corrupt".into()))
            }
            async fn save(&self, _: &StoreSnapshot) -> crate::shared::AppResult<()> {
                Ok(())
            }
        }

        let store = JobStateStore::restore(MonitorConfig::default(), Arc::new(BrokenStore)).await;
        assert!(store.active_jobs().await.is_empty());
        assert!(store.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_prefers_persisted_config() {
        struct Seeded;
        #[async_trait::async_trait]
        impl SnapshotStore for Seeded {
            async fn load(&self) -> crate::shared::AppResult<Option<StoreSnapshot>> {
                Ok(Some(StoreSnapshot {
                    active: vec![Job::new("job_1", JobKind::Compose)],
                    completed: vec![],
                    notifications: vec![],
                    config: Some(MonitorConfig {
                        poll_interval_ms: 9_000,
                        ..Default::default()
                    }),
                }))
            }
            async fn save(&self, _: &StoreSnapshot) -> crate::shared::AppResult<()> {
                Ok(())
            }
        }

        let store = JobStateStore::restore(MonitorConfig::default(), Arc::new(Seeded)).await;
        assert_eq!(store.config().await.poll_interval_ms, 9_000);
        assert_eq!(store.active_jobs().await.len(), 1);
    }
}
