pub mod entities;
pub mod value_objects;

pub use entities::{
    Job, JobKind, JobPatch, JobState, Notification, NotificationSeverity, OutputItem,
    StatusSnapshot,
};
pub use value_objects::{ConnectionStatus, MonitorConfig, MonitorConfigPatch};
