/// Job monitoring module
///
/// The reconciliation core behind the dashboard's job views:
/// - Domain: job/notification entities, monitor settings
/// - Store: single source of truth for all monitor state
/// - Poller: the fetch-and-reconcile loop with transition side effects
/// - Persistence: best-effort session snapshots
pub mod domain;
pub mod persistence;
pub mod poller;
pub mod store;

// Re-exports for easy access
pub use domain::{
    ConnectionStatus, Job, JobKind, JobPatch, JobState, MonitorConfig, MonitorConfigPatch,
    Notification, NotificationSeverity, OutputItem, StatusSnapshot,
};
pub use persistence::{FileSnapshotStore, NullSnapshotStore, SnapshotStore, StoreSnapshot};
pub use poller::{JobPoller, PollerHooks};
pub use store::JobStateStore;
