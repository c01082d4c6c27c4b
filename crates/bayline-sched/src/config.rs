//! Scheduling configuration.

use chrono::Duration;

/// Configuration for the appointment service.
#[derive(Debug, Clone)]
pub struct SchedConfig {
    /// Standard appointment duration in minutes, applied when a booking
    /// arrives without an end time or with a zero-length interval
    /// (default: 60).
    pub default_duration_minutes: i64,
}

impl SchedConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::minutes(self.default_duration_minutes)
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60,
        }
    }
}
