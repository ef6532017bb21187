pub mod modules;
pub mod shared;

pub use modules::monitor::{
    ConnectionStatus, FileSnapshotStore, Job, JobKind, JobPoller, JobState, JobStateStore,
    MonitorConfig, MonitorConfigPatch, Notification, NotificationSeverity, PollerHooks,
    SnapshotStore, StatusSnapshot,
};
pub use modules::status::{poll_until_terminal, GenSceneClient, StatusFetcher};
pub use shared::{AppError, AppResult};
