use crate::modules::monitor::domain::StatusSnapshot;
use crate::modules::status::dto::JobStatusResponse;
use crate::modules::status::fetcher::StatusFetcher;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::retry::status_to_app_error;
use crate::shared::utils::{retry_http_request, RateLimiter, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "GenScene-Monitor/0.1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the Gen Scene Studio status API.
///
/// Batch status is one GET per id; each call retries transient failures
/// internally, and the per-id outcomes are aggregated so one failing job
/// never hides the others.
pub struct GenSceneClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: RateLimiter,
    retry: RetryConfig,
}

impl GenSceneClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            rate_limiter: RateLimiter::new(10.0),
            retry: RetryConfig::conservative(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn status_url(&self, id: &str) -> String {
        format!("{}/jobs/{}/status", self.base_url, id)
    }

    async fn fetch_one(&self, id: &str) -> AppResult<StatusSnapshot> {
        self.rate_limiter.wait().await;

        let url = self.status_url(id);
        let response = retry_http_request(
            || {
                let mut request = self.client.get(&url);
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key);
                }
                request.send()
            },
            &self.retry,
            "job status",
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_to_app_error(status));
        }

        let dto = response.json::<JobStatusResponse>().await.map_err(|e| {
            AppError::SerializationError(format!("Failed to parse status response: {}", e))
        })?;

        dto.into_snapshot()
    }
}

#[async_trait]
impl StatusFetcher for GenSceneClient {
    async fn fetch_many(
        &self,
        ids: &[String],
    ) -> AppResult<HashMap<String, AppResult<StatusSnapshot>>> {
        let mut results = HashMap::with_capacity(ids.len());

        for id in ids {
            match self.fetch_one(id).await {
                Ok(snapshot) => {
                    results.insert(id.clone(), Ok(snapshot));
                }
                Err(err) if err.is_connectivity() => {
                    // Endpoint-level problem: no point hammering the
                    // remaining ids this tick.
                    warn!("status fetch aborted at job {}: {}", id, err);
                    return Err(err);
                }
                Err(err) => {
                    debug!("status fetch for job {} failed: {}", id, err);
                    results.insert(id.clone(), Err(err));
                }
            }
        }

        Ok(results)
    }
}
