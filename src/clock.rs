//! Time source and local-date helpers.
//!
//! Every "now" and "today" in the core comes from a [`Clock`] so that caches and
//! the sync driver can be exercised against a fixed instant in tests.

use crate::constants::DATE_FORMAT_ISO;
use chrono::{DateTime, Duration, Local, NaiveDate, SecondsFormat, Utc};
use std::sync::Mutex;

/// A source of the current local time.
pub trait Clock: Send + Sync {
    /// Returns the current instant in the device's local timezone.
    fn now(&self) -> DateTime<Local>;

    /// Returns the current instant as epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Returns today's local date key (`YYYY-MM-DD`).
    fn today_key(&self) -> String {
        local_date_key(self.now().date_naive())
    }

    /// Returns the current instant as an ISO-8601 UTC string with millisecond precision.
    fn now_iso(&self) -> String {
        iso_timestamp(self.now())
    }
}

/// Clock backed by the system's wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Local, TimeZone};
/// use perspectiv::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
/// assert_eq!(clock.today_key(), "2024-03-01");
///
/// clock.advance(Duration::days(1));
/// assert_eq!(clock.today_key(), "2024-03-02");
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }

    /// Sets the clock to `to`.
    pub fn set(&self, to: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Formats a calendar date as the zero-padded local date key `YYYY-MM-DD`.
///
/// This key is the day boundary for all "today" semantics. No timezone
/// conversion happens here; callers pass a date already taken from the local clock.
///
/// ```
/// use chrono::NaiveDate;
/// use perspectiv::clock::local_date_key;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// assert_eq!(local_date_key(date), "2024-03-01");
/// ```
pub fn local_date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT_ISO).to_string()
}

/// Formats an instant as `2024-03-01T09:00:00.000Z`.
pub fn iso_timestamp<Tz: chrono::TimeZone>(at: DateTime<Tz>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_date_key_zero_pads() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(local_date_key(date), "2024-01-05");

        let date = NaiveDate::from_ymd_opt(987, 12, 31).unwrap();
        assert_eq!(local_date_key(date), "0987-12-31");
    }

    #[test]
    fn test_manual_clock_millis_and_iso() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start.with_timezone(&Local));

        assert_eq!(clock.now_millis(), start.timestamp_millis());
        assert_eq!(clock.now_iso(), "2024-03-01T12:00:00.000Z");

        clock.advance(Duration::milliseconds(1500));
        assert_eq!(clock.now_millis(), start.timestamp_millis() + 1500);
        assert_eq!(clock.now_iso(), "2024-03-01T12:00:01.500Z");
    }

    #[test]
    fn test_today_key_follows_local_midnight() {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap());
        assert_eq!(clock.today_key(), "2024-03-01");

        clock.advance(Duration::minutes(2));
        assert_eq!(clock.today_key(), "2024-03-02");
    }
}
