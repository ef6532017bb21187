use crate::modules::monitor::domain::StatusSnapshot;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Capability that turns a set of job ids into status snapshots.
///
/// The outer `Err` means the remote endpoint itself was unreachable
/// (network down, auth rejected) and no snapshot in the batch is usable.
/// Per-id application failures ("job not found") are inner `Err`s: one
/// broken id never prevents snapshots for the others.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_many(
        &self,
        ids: &[String],
    ) -> AppResult<HashMap<String, AppResult<StatusSnapshot>>>;
}

/// Manual helper: poll one job until it reaches a terminal state or the
/// wall-clock deadline passes. Transient failures keep polling; only a
/// rejected credential bails out early. The in-flight fetch is not
/// forcibly aborted on timeout, its eventual result is simply dropped.
pub async fn poll_until_terminal(
    fetcher: &dyn StatusFetcher,
    id: &str,
    every: Duration,
    deadline: Duration,
) -> AppResult<StatusSnapshot> {
    let ids = vec![id.to_string()];

    let wait = async {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match fetcher.fetch_many(&ids).await {
                Ok(mut results) => match results.remove(id) {
                    Some(Ok(snapshot)) if snapshot.state.is_terminal() => return Ok(snapshot),
                    Some(Ok(_)) | None => continue,
                    Some(Err(err)) => {
                        tracing::debug!("status poll for {} failed: {}, retrying", id, err);
                        continue;
                    }
                },
                Err(err @ AppError::Unauthorized(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!("status poll connectivity failure: {}, retrying", err);
                    continue;
                }
            }
        }
    };

    match tokio::time::timeout(deadline, wait).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "Job {} did not reach a terminal state within {:?}",
            id, deadline
        ))),
    }
}
