//! Condition: a rule that maps a sensor reading to a desired device state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::DeviceState;
use crate::id::SensorId;
use crate::sensor::Reading;

/// Comparison applied between a reading and a [`Range`].
///
/// Every operator is evaluated on its own; none implies another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `reading < base`
    Less,
    /// `reading <= base`
    LessEqual,
    /// `base <= reading <= end` (closed)
    Equal,
    /// `base < reading < end` (open)
    In,
    /// `base <= reading < end` (half-open)
    At,
    /// `reading < base || reading > end`
    NotEqual,
    /// `reading >= end`
    GreaterEqual,
    /// `reading > end`
    Greater,
}

impl Operator {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Equal => "==",
            Self::In => "in",
            Self::At => "at",
            Self::NotEqual => "!=",
            Self::GreaterEqual => ">=",
            Self::Greater => ">",
        }
    }
}

/// A `(base, span)` pair; the range ends at `base + span`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub base: u64,
    pub span: u64,
}

impl Range {
    #[must_use]
    pub const fn new(base: u64, span: u64) -> Self {
        Self { base, span }
    }

    /// A range holding only `value`.
    #[must_use]
    pub const fn point(value: u64) -> Self {
        Self::new(value, 0)
    }

    /// The range covering `start..=end`. `None` if `end < start`.
    #[must_use]
    pub const fn between(start: u64, end: u64) -> Option<Self> {
        if end < start {
            None
        } else {
            Some(Self::new(start, end - start))
        }
    }

    #[must_use]
    pub const fn end(self) -> u64 {
        self.base.saturating_add(self.span)
    }
}

/// One rule attached to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub sensor: SensorId,
    pub state: DeviceState,
    pub operator: Operator,
    pub range: Range,
}

impl Condition {
    #[must_use]
    pub const fn new(
        sensor: SensorId,
        state: DeviceState,
        operator: Operator,
        range: Range,
    ) -> Self {
        Self {
            sensor,
            state,
            operator,
            range,
        }
    }

    /// Whether `reading` satisfies this condition. The invalid sentinel
    /// never does.
    #[must_use]
    pub fn matches(&self, reading: Reading) -> bool {
        let Some(r) = reading.get() else {
            return false;
        };
        let Range { base, .. } = self.range;
        let end = self.range.end();
        match self.operator {
            Operator::Less => r < base,
            Operator::LessEqual => r <= base,
            Operator::Equal => base <= r && r <= end,
            Operator::In => base < r && r < end,
            Operator::At => base <= r && r < end,
            Operator::NotEqual => r < base || r > end,
            Operator::GreaterEqual => r >= end,
            Operator::Greater => r > end,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}+{}",
            self.state,
            self.sensor,
            self.operator.symbol(),
            self.range.base,
            self.range.span
        )
    }
}
