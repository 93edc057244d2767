//! Time and timestamp helpers.

use chrono::{DateTime, Datelike, Local, Timelike, Utc};

/// UTC timestamp used for ticks, override expiry and log samples.
pub type Timestamp = DateTime<Utc>;

/// Microseconds in one second.
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// Microseconds in one day; the upper bound of any time-of-day value.
pub const MICROS_PER_DAY: u64 = 24 * 60 * 60 * MICROS_PER_SECOND;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Microseconds elapsed since local midnight at `at`.
#[must_use]
pub fn micros_since_local_midnight(at: Timestamp) -> u64 {
    let local = at.with_timezone(&Local);
    let seconds = u64::from(local.num_seconds_from_midnight());
    // chrono reports leap seconds as nanosecond values past 1e9
    let micros = u64::from(local.nanosecond() / 1_000).min(MICROS_PER_SECOND - 1);
    seconds * MICROS_PER_SECOND + micros
}

/// Local day of the week at `at`, 0 = Sunday through 6 = Saturday.
#[must_use]
pub fn local_weekday(at: Timestamp) -> u64 {
    u64::from(at.with_timezone(&Local).weekday().num_days_from_sunday())
}

/// Whole microseconds from `from` until `to`, zero when `to` is not later
/// and saturated when the gap does not fit.
#[must_use]
pub fn micros_until(from: Timestamp, to: Timestamp) -> u64 {
    if to <= from {
        return 0;
    }
    (to - from)
        .num_microseconds()
        .and_then(|us| u64::try_from(us).ok())
        .unwrap_or(u64::MAX)
}
