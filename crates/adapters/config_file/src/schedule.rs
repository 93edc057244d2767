//! `device` blocks and the `on`/`off` rules inside them.

use std::collections::HashSet;

use aquaria_domain::condition::{Condition, Operator, Range};
use aquaria_domain::device::DeviceState;
use aquaria_domain::id::{DeviceId, SensorId};
use aquaria_domain::registry::Registry;
use aquaria_domain::sensor::SensorKind;
use aquaria_domain::time::{MICROS_PER_DAY, MICROS_PER_SECOND};

use crate::error::{ConfigError, SyntaxError};
use crate::lines::{Line, lines};
use crate::units::parse_value;

/// Span of an `at` rule without `for` or `until`.
const DEFAULT_AT_SPAN: u64 = 60 * MICROS_PER_SECOND;

/// Attach the conditions in `text` to devices already in `registry`.
///
/// Conditions keep their file order within a device, which decides which
/// rule wins when several match.
///
/// # Errors
///
/// Returns [`ConfigError::Syntax`] for the first malformed line, for a rule
/// outside a `device` block, or for a second block on the same device.
pub fn parse_schedule(registry: &mut Registry, file: &str, text: &str) -> Result<(), ConfigError> {
    let mut parser = ScheduleParser::default();
    for line in lines(file, text) {
        let mut line = line?;
        let number = line.number;
        parser
            .line(registry, &mut line)
            .map_err(|kind| ConfigError::syntax(file, number, kind))?;
    }
    Ok(())
}

#[derive(Default)]
struct ScheduleParser {
    current: Option<DeviceId>,
    seen: HashSet<DeviceId>,
}

impl ScheduleParser {
    fn line(&mut self, registry: &mut Registry, line: &mut Line<'_>) -> Result<(), SyntaxError> {
        let directive = line.next_token().unwrap_or_default();
        if directive.eq_ignore_ascii_case("device") {
            return self.open_block(registry, line);
        }
        let state = if directive.eq_ignore_ascii_case("on") {
            DeviceState::On
        } else if directive.eq_ignore_ascii_case("off") {
            DeviceState::Off
        } else {
            return Err(SyntaxError::UnknownDirective(directive.to_string()));
        };
        let device = self.current.ok_or(SyntaxError::OutsideBlock)?;

        let name = line.next_token().ok_or(SyntaxError::MissingName("sensor"))?;
        let sensor = registry
            .find_sensor(name)
            .ok_or_else(|| SyntaxError::NoSuchSensor(name.to_string()))?;
        let (id, kind) = (sensor.id, sensor.kind);

        let condition =
            parse_condition(id, kind, state, line).ok_or(SyntaxError::Condition(kind))?;
        registry
            .add_condition(device, condition)
            .map_err(SyntaxError::Registry)
    }

    fn open_block(&mut self, registry: &Registry, line: &mut Line<'_>) -> Result<(), SyntaxError> {
        let name = line.next_token().ok_or(SyntaxError::MissingName("device"))?;
        let device = registry
            .find_device(name)
            .ok_or_else(|| SyntaxError::NoSuchDevice(name.to_string()))?;
        if let Some(extra) = line.next_token() {
            return Err(SyntaxError::UnexpectedToken(extra.to_string()));
        }
        if !self.seen.insert(device.id) {
            return Err(SyntaxError::DuplicateBlock(device.name.clone()));
        }
        self.current = Some(device.id);
        Ok(())
    }
}

/// Parse what follows `on|off <sensor>`. `None` on any malformed token.
fn parse_condition(
    sensor: SensorId,
    kind: SensorKind,
    state: DeviceState,
    line: &mut Line<'_>,
) -> Option<Condition> {
    let condition = |operator, range| Some(Condition::new(sensor, state, operator, range));

    if kind == SensorKind::Nop {
        return if line.has_more() {
            None
        } else {
            condition(Operator::Equal, Range::point(0))
        };
    }

    let keyword = line.next_token()?.to_ascii_lowercase();
    let time = kind == SensorKind::Time;
    let operator = match keyword.as_str() {
        "<" => Operator::Less,
        "<=" => Operator::LessEqual,
        "=" | "==" | "is" if !time => Operator::Equal,
        "!=" | "<>" if !time => Operator::NotEqual,
        ">=" => Operator::GreaterEqual,
        ">" => Operator::Greater,
        "in" | "from" => {
            let start = parse_value(kind, line.next_token()?)?;
            if !line.next_token()?.eq_ignore_ascii_case("to") {
                return None;
            }
            let end = parse_value(kind, line.next_token()?)?;
            let range = finish(line, Range::between(start, end)?)?;
            let operator = if keyword == "in" {
                Operator::In
            } else {
                Operator::Equal
            };
            return condition(operator, range);
        }
        "at" if time => return condition(Operator::At, parse_at(line)?),
        _ => return None,
    };
    let value = parse_value(kind, line.next_token()?)?;
    condition(operator, finish(line, Range::point(value))?)
}

/// `at T [for D | until T2]` for a time-of-day sensor.
fn parse_at(line: &mut Line<'_>) -> Option<Range> {
    let start = parse_value(SensorKind::Time, line.next_token()?)?;
    let Some(keyword) = line.next_token() else {
        return Some(Range::new(start, DEFAULT_AT_SPAN.min(MICROS_PER_DAY - start)));
    };
    let value = parse_value(SensorKind::Time, line.next_token()?)?;
    let range = if keyword.eq_ignore_ascii_case("until") {
        Range::between(start, value)?
    } else if keyword.eq_ignore_ascii_case("for") {
        let range = Range::new(start, value);
        (range.end() <= MICROS_PER_DAY).then_some(range)?
    } else {
        return None;
    };
    finish(line, range)
}

/// Accept `range` only if the line has no tokens left.
fn finish(line: &mut Line<'_>, range: Range) -> Option<Range> {
    (!line.has_more()).then_some(range)
}
