use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval used when the requested one is missing or unusable.
pub const DEFAULT_INTERVAL_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub interval_ms: u64,
    /// Intents emitted since the timer was started.
    pub ticks: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn begin(&mut self, interval: Duration, started_at: DateTime<Utc>) {
        *self = Self {
            status: TimerStatus::Running,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            ticks: 0,
            started_at: Some(started_at),
        };
    }

    pub fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn stop(&mut self) {
        *self = Self::default();
    }
}

/// Parse a user-supplied interval in seconds. Non-numeric, non-finite,
/// non-positive or unrepresentable input falls back to
/// [`DEFAULT_INTERVAL_SECS`].
pub fn normalize_interval(input: &str) -> Duration {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(interval_from_secs)
        .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_INTERVAL_SECS))
}

/// `None` unless `secs` is a usable, non-zero interval.
pub fn interval_from_secs(secs: f64) -> Option<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|interval| !interval.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_intervals_fall_back_to_default() {
        let default = Duration::from_secs(5);

        assert_eq!(normalize_interval("abc"), default);
        assert_eq!(normalize_interval(""), default);
        assert_eq!(normalize_interval("0"), default);
        assert_eq!(normalize_interval("-10"), default);
        assert_eq!(normalize_interval("NaN"), default);
        assert_eq!(normalize_interval("inf"), default);
        assert_eq!(normalize_interval("1e-30"), default);
    }

    #[test]
    fn valid_intervals_are_kept() {
        assert_eq!(normalize_interval("10"), Duration::from_secs(10));
        assert_eq!(normalize_interval(" 2.5 "), Duration::from_millis(2500));
        assert_eq!(normalize_interval("1"), Duration::from_secs(1));
    }

    #[test]
    fn stop_returns_to_idle() {
        let mut state = TimerState::new();
        state.begin(Duration::from_secs(5), Utc::now());
        state.record_tick();

        assert!(state.is_running());
        assert_eq!(state.interval_ms, 5000);
        assert_eq!(state.ticks, 1);

        state.stop();
        assert_eq!(state, TimerState::default());
    }
}
