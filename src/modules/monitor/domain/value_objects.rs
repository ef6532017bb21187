/// Value objects for the monitoring domain
use serde::{Deserialize, Serialize};

/// Bounds the store clamps config updates to. Out-of-range values are
/// clamped, never rejected, so a half-broken persisted preference still
/// yields a working monitor.
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;
pub const MAX_POLL_INTERVAL_MS: u64 = 300_000;
pub const MIN_MAX_RETRIES: u32 = 1;
pub const MAX_MAX_RETRIES: u32 = 10;
pub const MIN_RETRY_BASE_DELAY_MS: u64 = 100;
pub const MAX_RETRY_BASE_DELAY_MS: u64 = 60_000;
pub const MIN_TRACKED_JOBS: usize = 1;
pub const MAX_TRACKED_JOBS: usize = 500;
pub const MIN_CLEANUP_AFTER_HOURS: u32 = 1;
pub const MAX_CLEANUP_AFTER_HOURS: u32 = 720;

/// Process-wide settings controlling the polling loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub notifications_enabled: bool,
    pub persistence_enabled: bool,
    pub max_tracked_jobs: usize,
    pub cleanup_after_hours: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            notifications_enabled: true,
            persistence_enabled: true,
            max_tracked_jobs: 50,
            cleanup_after_hours: 24,
        }
    }
}

/// Partial config update; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfigPatch {
    pub poll_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub notifications_enabled: Option<bool>,
    pub persistence_enabled: Option<bool>,
    pub max_tracked_jobs: Option<usize>,
    pub cleanup_after_hours: Option<u32>,
}

impl MonitorConfig {
    /// Merge a partial update, clamping every value to its documented bounds
    pub fn apply(&mut self, patch: MonitorConfigPatch) {
        if let Some(interval) = patch.poll_interval_ms {
            self.poll_interval_ms = interval.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
        }
        if let Some(retries) = patch.max_retries {
            self.max_retries = retries.clamp(MIN_MAX_RETRIES, MAX_MAX_RETRIES);
        }
        if let Some(delay) = patch.retry_base_delay_ms {
            self.retry_base_delay_ms =
                delay.clamp(MIN_RETRY_BASE_DELAY_MS, MAX_RETRY_BASE_DELAY_MS);
        }
        if let Some(enabled) = patch.notifications_enabled {
            self.notifications_enabled = enabled;
        }
        if let Some(enabled) = patch.persistence_enabled {
            self.persistence_enabled = enabled;
        }
        if let Some(max_jobs) = patch.max_tracked_jobs {
            self.max_tracked_jobs = max_jobs.clamp(MIN_TRACKED_JOBS, MAX_TRACKED_JOBS);
        }
        if let Some(hours) = patch.cleanup_after_hours {
            self.cleanup_after_hours =
                hours.clamp(MIN_CLEANUP_AFTER_HOURS, MAX_CLEANUP_AFTER_HOURS);
        }
    }

    /// Read settings from environment variables (GENSCENE_POLL_INTERVAL_MS,
    /// GENSCENE_MAX_RETRIES, ...), falling back to defaults and the same
    /// clamping as explicit updates.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let patch = MonitorConfigPatch {
            poll_interval_ms: env_parse("GENSCENE_POLL_INTERVAL_MS"),
            max_retries: env_parse("GENSCENE_MAX_RETRIES"),
            retry_base_delay_ms: env_parse("GENSCENE_RETRY_BASE_DELAY_MS"),
            notifications_enabled: env_parse("GENSCENE_NOTIFICATIONS_ENABLED"),
            persistence_enabled: env_parse("GENSCENE_PERSISTENCE_ENABLED"),
            max_tracked_jobs: env_parse("GENSCENE_MAX_TRACKED_JOBS"),
            cleanup_after_hours: env_parse("GENSCENE_CLEANUP_AFTER_HOURS"),
        };
        config.apply(patch);
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}

/// Remote reachability as last observed by the poller; the UI renders the
/// persistent "Disconnected" indicator from this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_clamped_to_floor() {
        let mut config = MonitorConfig::default();
        config.apply(MonitorConfigPatch {
            poll_interval_ms: Some(50),
            ..Default::default()
        });
        assert_eq!(config.poll_interval_ms, MIN_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_out_of_range_values_clamped_not_rejected() {
        let mut config = MonitorConfig::default();
        config.apply(MonitorConfigPatch {
            poll_interval_ms: Some(u64::MAX),
            max_retries: Some(99),
            retry_base_delay_ms: Some(0),
            max_tracked_jobs: Some(0),
            cleanup_after_hours: Some(10_000),
            ..Default::default()
        });
        assert_eq!(config.poll_interval_ms, MAX_POLL_INTERVAL_MS);
        assert_eq!(config.max_retries, MAX_MAX_RETRIES);
        assert_eq!(config.retry_base_delay_ms, MIN_RETRY_BASE_DELAY_MS);
        assert_eq!(config.max_tracked_jobs, MIN_TRACKED_JOBS);
        assert_eq!(config.cleanup_after_hours, MAX_CLEANUP_AFTER_HOURS);
    }

    #[test]
    fn test_absent_fields_keep_current_values() {
        let mut config = MonitorConfig::default();
        config.apply(MonitorConfigPatch {
            notifications_enabled: Some(false),
            ..Default::default()
        });
        assert!(!config.notifications_enabled);
        assert_eq!(config.poll_interval_ms, MonitorConfig::default().poll_interval_ms);
        assert_eq!(config.max_retries, MonitorConfig::default().max_retries);
    }
}
