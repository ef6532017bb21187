/// Polling controller: the fetch-and-reconcile loop
///
/// Repeatedly asks the status fetcher about every monitored job, diffs each
/// snapshot against the previously observed phase, pushes updates into the
/// store and fires completion/error side effects exactly once per
/// transition. Runs as a single tokio task; a new tick is scheduled only
/// after the previous tick's fetch has settled, so ticks never overlap.
use crate::modules::monitor::domain::{
    ConnectionStatus, JobPatch, JobState, Notification, StatusSnapshot,
};
use crate::modules::monitor::store::JobStateStore;
use crate::modules::status::fetcher::StatusFetcher;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_debug, log_error, log_info, log_warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Fires on every observed phase change, before the terminal-specific hooks.
/// Arguments: job id, previous state, new state.
pub type StatusChangeHook = Arc<dyn Fn(&str, &JobState, &JobState) -> AppResult<()> + Send + Sync>;
/// Fires exactly once when a job first reaches `Done`.
pub type JobCompleteHook = Arc<dyn Fn(&StatusSnapshot) -> AppResult<()> + Send + Sync>;
/// Fires exactly once when a job first reaches `Error`, with the reported reason.
pub type JobErrorHook = Arc<dyn Fn(&StatusSnapshot, &str) -> AppResult<()> + Send + Sync>;

/// Consumer-supplied side effects. Hook failures are logged and swallowed;
/// they never abort the tick or stop the timer.
#[derive(Clone, Default)]
pub struct PollerHooks {
    pub on_status_change: Option<StatusChangeHook>,
    pub on_job_complete: Option<JobCompleteHook>,
    pub on_job_error: Option<JobErrorHook>,
}

struct ActivePoll {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct JobPoller {
    store: Arc<JobStateStore>,
    fetcher: Arc<dyn StatusFetcher>,
    hooks: PollerHooks,
    explicit_ids: Arc<RwLock<Vec<String>>>,
    active: Mutex<Option<ActivePoll>>,
}

impl JobPoller {
    pub fn new(store: Arc<JobStateStore>, fetcher: Arc<dyn StatusFetcher>) -> Self {
        Self {
            store,
            fetcher,
            hooks: PollerHooks::default(),
            explicit_ids: Arc::new(RwLock::new(Vec::new())),
            active: Mutex::new(None),
        }
    }

    pub fn with_hooks(mut self, hooks: PollerHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Add an explicitly monitored id (polled even when the store does not
    /// hold the job). Duplicates are ignored.
    pub async fn add_job_id(&self, id: impl Into<String>) {
        let id = id.into();
        let mut ids = self.explicit_ids.write().await;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    pub async fn remove_job_id(&self, id: &str) {
        self.explicit_ids.write().await.retain(|known| known != id);
    }

    /// Start the polling loop. Interval and disconnect threshold are read
    /// from the store's config at start time; restart the poller to apply
    /// config changes. Starting while already active is a warn-level no-op.
    pub async fn start(&self) {
        let mut active = self.active.lock().await;
        if let Some(poll) = active.as_ref() {
            if !poll.token.is_cancelled() && !poll.handle.is_finished() {
                log_warn!("Poller already active, ignoring start request");
                return;
            }
        }

        let config = self.store.config().await;
        let token = CancellationToken::new();
        let task = PollTask {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            hooks: self.hooks.clone(),
            explicit_ids: Arc::clone(&self.explicit_ids),
            token: token.clone(),
            interval: Duration::from_millis(config.poll_interval_ms),
            max_retries: config.max_retries,
        };
        let handle = tokio::spawn(task.run());

        *active = Some(ActivePoll { token, handle });
    }

    /// Stop the polling loop. Safe to call at any point, including
    /// mid-tick: the cancel handle wins the race against an in-flight
    /// fetch, whose late result is then discarded.
    pub async fn stop(&self) {
        let poll = self.active.lock().await.take();
        if let Some(poll) = poll {
            poll.token.cancel();
            let _ = poll.handle.await;
        }
    }

    pub async fn is_active(&self) -> bool {
        match self.active.lock().await.as_ref() {
            Some(poll) => !poll.token.is_cancelled() && !poll.handle.is_finished(),
            None => false,
        }
    }
}

struct PollTask {
    store: Arc<JobStateStore>,
    fetcher: Arc<dyn StatusFetcher>,
    hooks: PollerHooks,
    explicit_ids: Arc<RwLock<Vec<String>>>,
    token: CancellationToken,
    interval: Duration,
    max_retries: u32,
}

impl PollTask {
    async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Previous observed state per job id, used solely for transition
        // detection. Not authoritative: rebuilt from the store whenever an
        // entry is missing.
        let mut previous: HashMap<String, JobState> = HashMap::new();
        let mut consecutive_failures: u32 = 0;

        log_info!("Job poller started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let ids = {
                let explicit = self.explicit_ids.read().await;
                self.store.poll_ids(&explicit).await
            };
            if ids.is_empty() {
                continue; // nothing monitored, skip the network round trip
            }

            let outcome = tokio::select! {
                _ = self.token.cancelled() => break,
                outcome = self.fetcher.fetch_many(&ids) => outcome,
            };
            // A stop that raced the fetch completion still wins: the
            // settled result must not resurrect store updates.
            if self.token.is_cancelled() {
                break;
            }

            match outcome {
                Err(err) => {
                    consecutive_failures += 1;
                    self.store
                        .set_connection_status(ConnectionStatus::Disconnected(err.to_string()))
                        .await;

                    let auth_rejected = matches!(err, AppError::Unauthorized(_));
                    if auth_rejected || consecutive_failures >= self.max_retries {
                        log_error!(
                            "Stopping poller after {} consecutive connectivity failures: {}",
                            consecutive_failures,
                            err
                        );
                        self.token.cancel();
                        break;
                    }
                    log_warn!(
                        "Connectivity failure {}/{}: {}",
                        consecutive_failures,
                        self.max_retries,
                        err
                    );
                }
                Ok(results) => {
                    consecutive_failures = 0;
                    self.store.set_connection_status(ConnectionStatus::Connected).await;

                    let notifications_enabled = self.store.config().await.notifications_enabled;
                    for id in &ids {
                        match results.get(id) {
                            Some(Ok(snapshot)) => {
                                self.apply_snapshot(&mut previous, snapshot, notifications_enabled)
                                    .await;
                            }
                            Some(Err(err)) => {
                                // Per-id application failure: prior state
                                // stays untouched, retried next tick.
                                log_debug!("Job {} status unavailable this tick: {}", id, err);
                            }
                            None => {}
                        }
                    }

                    previous.retain(|id, _| ids.contains(id));
                    self.store.sweep_completed().await;
                }
            }
        }

        log_info!("Job poller stopped");
    }

    async fn apply_snapshot(
        &self,
        previous: &mut HashMap<String, JobState>,
        snapshot: &StatusSnapshot,
        notifications_enabled: bool,
    ) {
        let id = snapshot.job_id.as_str();
        let new_state = snapshot.state.clone();

        // The transient map is seeded from the store, so a job the UI
        // submitted as `queued` transitions properly on its first fetched
        // snapshot. An id known to neither is a true first observation
        // and fires nothing.
        let stored = self.store.get_job(id).await;
        let prev_state = previous
            .get(id)
            .cloned()
            .or_else(|| stored.as_ref().map(|job| job.state.clone()));

        if let Some(prev_state) = prev_state {
            if !prev_state.same_phase(&new_state) {
                self.fire_transition_hooks(id, &prev_state, snapshot, notifications_enabled)
                    .await;
            }
        }

        previous.insert(id.to_string(), new_state.clone());
        self.store.update_job(id, JobPatch::from_snapshot(snapshot)).await;
        if new_state.is_terminal() {
            self.store.move_to_completed(id).await;
        }
    }

    async fn fire_transition_hooks(
        &self,
        id: &str,
        prev_state: &JobState,
        snapshot: &StatusSnapshot,
        notifications_enabled: bool,
    ) {
        // Generic hook first, then the terminal-specific one.
        if let Some(hook) = &self.hooks.on_status_change {
            if let Err(err) = hook(id, prev_state, &snapshot.state) {
                log_error!("on_status_change hook failed for job {}: {}", id, err);
            }
        }

        match &snapshot.state {
            JobState::Done => {
                if let Some(hook) = &self.hooks.on_job_complete {
                    if let Err(err) = hook(snapshot) {
                        log_error!("on_job_complete hook failed for job {}: {}", id, err);
                    }
                }
                if notifications_enabled {
                    self.store
                        .add_notification(Notification::success(
                            "Job completed",
                            format!("Job {} finished successfully", id),
                            Some(id.to_string()),
                        ))
                        .await;
                }
            }
            JobState::Error(message) => {
                if let Some(hook) = &self.hooks.on_job_error {
                    if let Err(err) = hook(snapshot, message) {
                        log_error!("on_job_error hook failed for job {}: {}", id, err);
                    }
                }
                if notifications_enabled {
                    self.store
                        .add_notification(Notification::error(
                            "Job failed",
                            format!("Job {}: {}", id, message),
                            Some(id.to_string()),
                        ))
                        .await;
                }
            }
            JobState::Queued | JobState::Running => {}
        }
    }
}
