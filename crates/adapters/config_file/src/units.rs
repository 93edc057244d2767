//! Conversion of schedule values into raw sensor units.

use aquaria_domain::sensor::SensorKind;
use aquaria_domain::time::{MICROS_PER_DAY, MICROS_PER_SECOND};

const MICROS_PER_UNIT: f64 = 1_000_000.0;
const ZERO_CELSIUS: f64 = 273.15;

/// Parse `<number><C|F|K>` into micro-kelvin.
///
/// ```
/// use aquaria_adapter_config_file::parse_temperature;
///
/// assert_eq!(parse_temperature("25C"), Some(298_150_000));
/// assert_eq!(parse_temperature("77f"), Some(298_150_000));
/// assert_eq!(parse_temperature("25"), None);
/// ```
#[must_use]
pub fn parse_temperature(token: &str) -> Option<u64> {
    let split = token.len().checked_sub(1)?;
    if !token.is_char_boundary(split) {
        return None;
    }
    let (number, unit) = token.split_at(split);
    let value: f64 = number.parse().ok()?;
    let kelvin = match unit {
        "C" | "c" => value + ZERO_CELSIUS,
        "F" | "f" => (value - 32.0) * 5.0 / 9.0 + ZERO_CELSIUS,
        "K" | "k" => value,
        _ => return None,
    };
    to_micros(kelvin)
}

/// Parse `H[:M[:S[.frac]]]` into microseconds since midnight.
///
/// Hours must be below 24, minutes and seconds below 60.
#[must_use]
pub fn parse_time_of_day(token: &str) -> Option<u64> {
    let mut parts = token.splitn(3, ':');
    let hours = parse_field(parts.next()?, 24)?;
    let minutes = parts.next().map_or(Some(0), |m| parse_field(m, 60))?;
    let seconds = match parts.next() {
        Some(s) => {
            let s: f64 = s.parse().ok()?;
            if !(0.0..60.0).contains(&s) {
                return None;
            }
            to_micros(s)?
        }
        None => 0,
    };
    let micros = (hours * 3600 + minutes * 60) * MICROS_PER_SECOND + seconds;
    (micros < MICROS_PER_DAY).then_some(micros)
}

/// Parse a weekday name, short or long, into `0` (Sunday) to `6`.
#[must_use]
pub fn parse_weekday(token: &str) -> Option<u64> {
    const DAYS: [(&str, &str); 7] = [
        ("sun", "sunday"),
        ("mon", "monday"),
        ("tue", "tuesday"),
        ("wed", "wednesday"),
        ("thu", "thursday"),
        ("fri", "friday"),
        ("sat", "saturday"),
    ];
    let token = token.to_ascii_lowercase();
    DAYS.iter()
        .zip(0..)
        .find(|((short, long), _)| token == *short || token == *long)
        .map(|(_, day)| day)
}

/// Parse `token` in the units of a `kind` sensor.
pub(crate) fn parse_value(kind: SensorKind, token: &str) -> Option<u64> {
    match kind {
        SensorKind::Temperature => parse_temperature(token),
        SensorKind::Time => parse_time_of_day(token),
        SensorKind::Weekday => parse_weekday(token),
        SensorKind::Nop => None,
    }
}

fn parse_field(field: &str, limit: u64) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok().filter(|value| *value < limit)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_micros(value: f64) -> Option<u64> {
    let micros = (value * MICROS_PER_UNIT).round();
    (micros.is_finite() && micros >= 0.0 && micros < u64::MAX as f64).then_some(micros as u64)
}
