/// Wire types for the Gen Scene Studio status API
use crate::modules::monitor::domain::{JobState, OutputItem, StatusSnapshot};
use crate::shared::errors::{AppError, AppResult};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub state: String,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub outputs: Option<Vec<OutputItemDto>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItemDto {
    pub id: String,
    pub status: String,
    #[serde(default, alias = "result_locator")]
    pub result_url: Option<String>,
}

impl JobStatusResponse {
    /// Map the wire shape into a domain snapshot, normalizing defensively:
    /// progress is clamped into [0, 100] and an unknown state is a per-id
    /// validation failure rather than a crash.
    pub fn into_snapshot(self) -> AppResult<StatusSnapshot> {
        let state = JobState::from_wire(&self.state, self.error.as_deref()).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Unknown job state '{}' for job {}",
                self.state, self.job_id
            ))
        })?;

        let progress = self.progress.unwrap_or(0).clamp(0, 100) as u8;

        let outputs = self
            .outputs
            .unwrap_or_default()
            .into_iter()
            .map(|item| OutputItem {
                id: item.id,
                status: item.status,
                result_url: item.result_url,
            })
            .collect();

        Ok(StatusSnapshot {
            job_id: self.job_id,
            state,
            progress,
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_response_maps_to_snapshot() {
        let raw = serde_json::json!({
            "job_id": "job_1",
            "state": "done",
            "progress": 100,
            "outputs": [{"id": "1", "status": "done", "result_url": "https://cdn/clip1.mp4"}]
        });

        let response: JobStatusResponse = serde_json::from_value(raw).unwrap();
        let snapshot = response.into_snapshot().unwrap();

        assert_eq!(snapshot.job_id, "job_1");
        assert_eq!(snapshot.state, JobState::Done);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.outputs.len(), 1);
        assert_eq!(
            snapshot.outputs[0].result_url.as_deref(),
            Some("https://cdn/clip1.mp4")
        );
    }

    #[test]
    fn test_progress_is_clamped_into_range() {
        let over: JobStatusResponse = serde_json::from_value(serde_json::json!({
            "job_id": "a", "state": "running", "progress": 250
        }))
        .unwrap();
        assert_eq!(over.into_snapshot().unwrap().progress, 100);

        let negative: JobStatusResponse = serde_json::from_value(serde_json::json!({
            "job_id": "b", "state": "running", "progress": -5
        }))
        .unwrap();
        assert_eq!(negative.into_snapshot().unwrap().progress, 0);
    }

    #[test]
    fn test_missing_progress_defaults_to_zero() {
        let response: JobStatusResponse = serde_json::from_value(serde_json::json!({
            "job_id": "a", "state": "queued"
        }))
        .unwrap();
        assert_eq!(response.into_snapshot().unwrap().progress, 0);
    }

    #[test]
    fn test_error_state_carries_description() {
        let response: JobStatusResponse = serde_json::from_value(serde_json::json!({
            "job_id": "a", "state": "error", "error": "GPU worker crashed"
        }))
        .unwrap();
        let snapshot = response.into_snapshot().unwrap();
        assert_eq!(snapshot.state, JobState::Error("GPU worker crashed".into()));
    }

    #[test]
    fn test_unknown_state_is_a_validation_error() {
        let response: JobStatusResponse = serde_json::from_value(serde_json::json!({
            "job_id": "a", "state": "transcoding"
        }))
        .unwrap();
        assert!(matches!(
            response.into_snapshot(),
            Err(AppError::ValidationError(_))
        ));
    }
}
