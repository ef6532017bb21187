use crate::shared::errors::{AppError, AppResult};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration for remote API calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Conservative config used by the polling fetcher: the poller itself
    /// already retries every tick, so in-call retries stay short.
    pub fn conservative() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Derive a config from the user-facing monitor settings.
    pub fn from_monitor(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            ..Self::default()
        }
    }
}

/// Execute an async operation with retry and exponential backoff
/// (base delay × multiplier^attempt, capped at `max_delay`).
///
/// Non-retryable errors short-circuit; after exhausting retries the last
/// error is returned.
pub async fn with_retry<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = AppResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{} succeeded on attempt {} after {} retries",
                        operation_name,
                        attempt + 1,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_retryable() {
                    debug!(
                        "{} failed with non-retryable error: {}",
                        operation_name, error
                    );
                    return Err(error);
                }

                last_error = Some(error.clone());

                // Don't wait after the last attempt
                if attempt < config.max_retries {
                    let delay = calculate_delay(attempt, config);
                    warn!(
                        "{} failed on attempt {} ({}), retrying in {:?}",
                        operation_name,
                        attempt + 1,
                        error,
                        delay
                    );
                    sleep(delay).await;
                } else {
                    warn!(
                        "{} failed on final attempt {} ({}), giving up",
                        operation_name,
                        attempt + 1,
                        error
                    );
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| AppError::ExternalServiceError("All retries exhausted".to_string())))
}

/// Calculate delay for the given attempt with exponential backoff and jitter
fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponential_delay =
        config.base_delay.as_millis() as f64 * config.backoff_multiplier.powi(attempt as i32);

    let mut delay = Duration::from_millis(exponential_delay as u64);

    if delay > config.max_delay {
        delay = config.max_delay;
    }

    // Jitter to avoid every dashboard tab retrying in lockstep
    if config.jitter {
        let jitter_factor = 0.1; // 10% jitter
        let jitter_ms = (delay.as_millis() as f64 * jitter_factor * rand::random::<f64>()) as u64;
        delay = Duration::from_millis(delay.as_millis() as u64 + jitter_ms);
    }

    delay
}

/// Retry specifically for HTTP requests with status code analysis
pub async fn retry_http_request<F, Fut>(
    request_fn: F,
    config: &RetryConfig,
    operation_name: &str,
) -> AppResult<reqwest::Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    with_retry(
        || async {
            match request_fn().await {
                Ok(response) => {
                    let status = response.status();
                    if is_retryable_status(status) {
                        Err(status_to_app_error(status))
                    } else {
                        Ok(response)
                    }
                }
                Err(e) => Err(AppError::ExternalServiceError(format!(
                    "HTTP request failed: {}",
                    e
                ))),
            }
        },
        config,
        operation_name,
    )
    .await
}

/// Check if HTTP status code indicates a retryable error
fn is_retryable_status(status: StatusCode) -> bool {
    match status {
        // Server errors - often temporary
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => true,

        // Rate limiting - should retry with backoff
        StatusCode::TOO_MANY_REQUESTS => true,

        // Request timeout - might succeed on retry
        StatusCode::REQUEST_TIMEOUT => true,

        // Client errors and success codes - don't retry
        _ => false,
    }
}

/// Convert HTTP status to appropriate AppError
pub fn status_to_app_error(status: StatusCode) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimitError("Rate limit exceeded".to_string()),
        StatusCode::NOT_FOUND => AppError::NotFound("Resource not found".to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Unauthorized("Access to status API denied".to_string())
        }
        StatusCode::BAD_REQUEST => AppError::ApiError("Bad request".to_string()),
        _ if status.is_server_error() => {
            AppError::ExternalServiceError(format!("Server error: {}", status))
        }
        _ => AppError::ApiError(format!("HTTP error: {}", status)),
    }
}

/// One-shot retry wrapper for manual actions outside the polling loop
/// (e.g. a "retry job" button). Tracks the last result, last error and an
/// in-flight flag, and supports an overall wall-clock timeout after which
/// the call rejects; the in-flight future is dropped, not aborted remotely.
pub struct RetryCall<T> {
    config: RetryConfig,
    timeout: Option<Duration>,
    state: RwLock<CallState<T>>,
}

struct CallState<T> {
    result: Option<T>,
    error: Option<AppError>,
    loading: bool,
}

impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self {
            result: None,
            error: None,
            loading: false,
        }
    }
}

impl<T: Clone + Send + Sync> RetryCall<T> {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            timeout: None,
            state: RwLock::new(CallState::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn execute<F, Fut>(&self, operation: F, operation_name: &str) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AppResult<T>>,
    {
        {
            let mut state = self.state.write().await;
            state.loading = true;
        }

        let attempt = with_retry(operation, &self.config, operation_name);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "{} exceeded {:?}",
                    operation_name, limit
                ))),
            },
            None => attempt.await,
        };

        let mut state = self.state.write().await;
        state.loading = false;
        match &outcome {
            Ok(value) => {
                state.result = Some(value.clone());
                state.error = None;
            }
            Err(error) => {
                state.error = Some(error.clone());
            }
        }

        outcome
    }

    pub async fn result(&self) -> Option<T> {
        self.state.read().await.result.clone()
    }

    pub async fn error(&self) -> Option<AppError> {
        self.state.read().await.error.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Clear result, error and loading flag.
    pub async fn reset(&self) {
        *self.state.write().await = CallState::default();
    }
}
