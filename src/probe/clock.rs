//! Clock abstraction for report timestamps
//!
//! Production code uses `SystemClock` which delegates to `chrono::Utc::now()`.
//! Tests use `MockClock` to pin the timestamps that end up in probe reports.
//!
//! Uptime is not derived from this clock: it comes from the monotonic
//! `tokio::time::Instant` held by the `ShutdownCoordinator`.

use chrono::{DateTime, SecondsFormat, Utc};

/// Trait for getting the current wall-clock time
///
/// Injected into the probes so tests can control report timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as an RFC 3339 string with millisecond precision
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Production clock that delegates to `chrono::Utc::now()`
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for testing with controllable time
#[cfg(test)]
#[allow(clippy::expect_used)]
pub struct MockClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    #[allow(dead_code)]
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().expect("MockClock lock poisoned");
        *now += duration;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("MockClock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_returns_time() {
        let clock = SystemClock;
        // Just verify it returns a reasonable time (after 2020)
        assert!(clock.now().timestamp() > 1_577_836_800);
    }

    #[test]
    fn test_timestamp_is_rfc3339_with_millis() {
        let fixed = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let clock = MockClock::new(fixed);
        assert_eq!(clock.timestamp(), "2026-03-14T15:09:26.000Z");
    }

    #[test]
    fn test_mock_clock_advance() {
        let fixed = Utc::now();
        let clock = MockClock::new(fixed);
        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(clock.now(), fixed + chrono::Duration::seconds(60));
    }
}
