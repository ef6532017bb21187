/// Domain entities for the job monitoring core
///
/// Jobs represent remote async work (renders, compositions, speech synthesis)
/// tracked by the dashboard; notifications are the user-facing record of
/// detected transitions.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a remote job. Tagged variant rather than a free-form
/// string so transition handling stays exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "message", rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Error(String),
}

impl JobState {
    /// Terminal states get no further progress; the poller moves the job
    /// to the completed set the first time it observes one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Error(_))
    }

    /// Phase comparison for transition detection: two `Error` states with
    /// different messages are the same phase.
    pub fn same_phase(&self, other: &JobState) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Parse the wire `state` field, attaching the error description for
    /// the `error` state. Unknown states are a data-quality problem the
    /// caller must handle; they never panic.
    pub fn from_wire(state: &str, error: Option<&str>) -> Option<JobState> {
        match state.to_lowercase().as_str() {
            "queued" => Some(JobState::Queued),
            "running" => Some(JobState::Running),
            "done" => Some(JobState::Done),
            "error" => Some(JobState::Error(
                error.unwrap_or("Job failed without a reported reason").to_string(),
            )),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Running => write!(f, "running"),
            JobState::Done => write!(f, "done"),
            JobState::Error(_) => write!(f, "error"),
        }
    }
}

/// Kind of remote work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    BatchRender,
    Compose,
    TextToSpeech,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::BatchRender => write!(f, "batch_render"),
            JobKind::Compose => write!(f, "compose"),
            JobKind::TextToSpeech => write!(f, "text_to_speech"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch_render" => Ok(JobKind::BatchRender),
            "compose" => Ok(JobKind::Compose),
            "text_to_speech" => Ok(JobKind::TextToSpeech),
            _ => Err(format!("Invalid job kind: {}", s)),
        }
    }
}

/// One sub-item produced by a job (a rendered clip, a voice line, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputItem {
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

/// One unit of remote asynchronous work tracked by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub state: JobState,
    /// Percent complete, 0-100
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub outputs: Vec<OutputItem>,
    /// Open-ended bag the core never interprets (scene names, episode ids, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Job {
    /// Create a freshly submitted job in the `queued` state
    pub fn new(id: impl Into<String>, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            state: JobState::Queued,
            progress: 0,
            created_at: now,
            updated_at: now,
            outputs: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.state.error_message()
    }
}

/// Partial update merged into an existing job by the store
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub state: Option<JobState>,
    pub progress: Option<u8>,
    pub outputs: Option<Vec<OutputItem>>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl JobPatch {
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        Self {
            state: Some(snapshot.state.clone()),
            progress: Some(snapshot.progress),
            outputs: Some(snapshot.outputs.clone()),
            metadata: None,
        }
    }
}

/// What one status fetch observed for a single job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub job_id: String,
    pub state: JobState,
    pub progress: u8,
    #[serde(default)]
    pub outputs: Vec<OutputItem>,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Success,
    Error,
    Warning,
    Info,
}

/// Immutable record of one detected event; only the read flag ever changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub severity: NotificationSeverity,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        severity: NotificationSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
        job_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            title: title.into(),
            message: message.into(),
            job_id,
            created_at: Utc::now(),
            read: false,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>, job_id: Option<String>) -> Self {
        Self::new(NotificationSeverity::Success, title, message, job_id)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>, job_id: Option<String>) -> Self {
        Self::new(NotificationSeverity::Error, title, message, job_id)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationSeverity::Info, title, message, None)
    }
}
