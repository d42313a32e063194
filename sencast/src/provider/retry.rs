//! Bounded retry with a fixed delay for provider downloads.

use std::time::Duration;

use crate::config::ProviderSettings;

/// How often and how patiently a failed download is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// `max_retries` counts retries after the first attempt.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(settings.max_retries.saturating_add(1), settings.retry_delay)
    }

    /// Whether another attempt follows a failure of attempt `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ProviderSettings::default())
    }
}
