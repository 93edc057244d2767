//! Sensor: a named source of a numeric reading.
//!
//! A sensor is either built in (constant, time of day, weekday) or backed by
//! a helper process that prints one integer per invocation. Readings are raw
//! `u64` values whose unit depends on the [`SensorKind`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::id::SensorId;
use crate::time::{self, Timestamp};

/// A raw sensor reading.
///
/// [`Reading::INVALID`] marks "no valid reading yet" and never satisfies a
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reading(u64);

impl Reading {
    pub const INVALID: Self = Self(u64::MAX);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }

    /// The value if valid, `None` for the sentinel.
    #[must_use]
    pub const fn get(self) -> Option<u64> {
        if self.is_valid() { Some(self.0) } else { None }
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<u64> for Reading {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// What a sensor measures, which fixes the unit of its readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorKind {
    /// Constant reading, used for unconditional rules.
    #[serde(rename = "no-op")]
    Nop,
    /// Microseconds since local midnight.
    Time,
    /// Day of the week, 0 = Sunday.
    Weekday,
    /// Micro-kelvin.
    #[serde(rename = "temp")]
    Temperature,
}

impl SensorKind {
    /// Name used on the wire and in the configuration file.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nop => "no-op",
            Self::Time => "time",
            Self::Weekday => "weekday",
            Self::Temperature => "temp",
        }
    }

    /// Unit label attached to readings of this kind.
    #[must_use]
    pub const fn units(self) -> &'static str {
        match self {
            Self::Nop => "",
            Self::Time => "us",
            Self::Weekday => "day",
            Self::Temperature => "uK",
        }
    }

    /// Look a kind up by its name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Nop, Self::Time, Self::Weekday, Self::Temperature]
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pure reading functions evaluated in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Builtin {
    Constant,
    TimeOfDay,
    Weekday,
}

impl Builtin {
    /// Produce the reading for the instant `now`.
    #[must_use]
    pub fn read(self, now: Timestamp) -> Reading {
        match self {
            Self::Constant => Reading::new(0),
            Self::TimeOfDay => Reading::new(time::micros_since_local_midnight(now)),
            Self::Weekday => Reading::new(time::local_weekday(now)),
        }
    }
}

/// How a sensor obtains its reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorSource {
    Builtin(Builtin),
    /// Helper program printing one unsigned integer per line.
    Process(Command),
}

/// A named reading source.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub kind: SensorKind,
    pub source: SensorSource,
    pub reading: Reading,
}

impl Sensor {
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(self.source, SensorSource::Builtin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_treat_all_ones_as_invalid_reading() {
        assert!(!Reading::INVALID.is_valid());
        assert_eq!(Reading::INVALID.get(), None);
        assert_eq!(Reading::new(u64::MAX), Reading::INVALID);
    }

    #[test]
    fn should_default_to_invalid_reading() {
        assert_eq!(Reading::default(), Reading::INVALID);
    }

    #[test]
    fn should_expose_value_when_reading_is_valid() {
        assert_eq!(Reading::new(293_150_000).get(), Some(293_150_000));
    }

    #[test]
    fn should_resolve_kind_names_case_insensitively() {
        assert_eq!(SensorKind::from_name("TEMP"), Some(SensorKind::Temperature));
        assert_eq!(SensorKind::from_name("no-op"), Some(SensorKind::Nop));
        assert_eq!(SensorKind::from_name("humidity"), None);
    }

    #[test]
    fn should_report_units_per_kind() {
        assert_eq!(SensorKind::Nop.units(), "");
        assert_eq!(SensorKind::Time.units(), "us");
        assert_eq!(SensorKind::Weekday.units(), "day");
        assert_eq!(SensorKind::Temperature.units(), "uK");
    }

    #[test]
    fn should_serialize_kind_with_wire_name() {
        let json = serde_json::to_string(&SensorKind::Temperature).unwrap();
        assert_eq!(json, "\"temp\"");
        let json = serde_json::to_string(&SensorKind::Nop).unwrap();
        assert_eq!(json, "\"no-op\"");
    }

    #[test]
    fn should_read_zero_from_constant_builtin() {
        assert_eq!(Builtin::Constant.read(time::now()), Reading::new(0));
    }

    #[test]
    fn should_read_valid_weekday_from_builtin() {
        let reading = Builtin::Weekday.read(time::now());
        assert!(reading.value() <= 6);
    }
}
