use super::report::{CycleReport, SyncError};
use crate::core::config::SyncSettings;
use std::time::Duration;

/// Timing and tolerance knobs for the scheduler, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Sleep after a cycle that completed.
    pub steady_interval: Duration,
    /// Sleep after a cycle that failed as a whole.
    pub error_interval: Duration,
    /// Pause between two provider lookups within a cycle.
    pub request_pause: Duration,
    /// Consecutive write failures tolerated before the cycle is abandoned.
    /// Zero disables the limit.
    pub max_write_failures: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig::from(&SyncSettings::default())
    }
}

impl From<&SyncSettings> for SyncConfig {
    fn from(settings: &SyncSettings) -> Self {
        SyncConfig {
            steady_interval: Duration::from_secs(settings.steady_interval_secs),
            error_interval: Duration::from_secs(settings.error_interval_secs),
            request_pause: Duration::from_millis(settings.request_pause_ms),
            max_write_failures: settings.max_write_failures,
        }
    }
}

impl SyncConfig {
    /// How long to sleep after a cycle, or `None` if the loop should stop.
    pub fn delay_after(&self, outcome: &Result<CycleReport, SyncError>) -> Option<Duration> {
        match outcome {
            Ok(_) => Some(self.steady_interval),
            Err(SyncError::Cancelled) => None,
            Err(_) => Some(self.error_interval),
        }
    }

    pub(crate) fn write_failures_exhausted(&self, consecutive: usize) -> bool {
        self.max_write_failures > 0 && consecutive >= self.max_write_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::StorageError;

    #[test]
    fn test_defaults_match_settings() {
        let config = SyncConfig::default();
        assert_eq!(config.steady_interval, Duration::from_secs(300));
        assert_eq!(config.error_interval, Duration::from_secs(60));
        assert_eq!(config.request_pause, Duration::from_millis(100));
        assert_eq!(config.max_write_failures, 3);
    }

    #[test]
    fn test_delay_after_outcome() {
        let config = SyncConfig::default();

        let ok = Ok(CycleReport::new(0));
        assert_eq!(config.delay_after(&ok), Some(config.steady_interval));

        let failed = Err(SyncError::Storage(StorageError::Unavailable("down".into())));
        assert_eq!(config.delay_after(&failed), Some(config.error_interval));

        let escalated = Err(SyncError::StorageUnavailable {
            failures: 3,
            source: StorageError::Write("x".into()),
        });
        assert_eq!(config.delay_after(&escalated), Some(config.error_interval));

        assert_eq!(config.delay_after(&Err(SyncError::Cancelled)), None);
    }

    #[test]
    fn test_write_failure_limit() {
        let config = SyncConfig::default();
        assert!(!config.write_failures_exhausted(2));
        assert!(config.write_failures_exhausted(3));

        let unlimited = SyncConfig {
            max_write_failures: 0,
            ..SyncConfig::default()
        };
        assert!(!unlimited.write_failures_exhausted(1_000));
    }
}
