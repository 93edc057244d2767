//! Evaluator: decides the desired state of a device.
//!
//! Pure function of the device, the current sensor readings and the clock.
//! An active override masks every condition. Otherwise conditions are scanned
//! in declaration order and the last one that matches decides the result.

use crate::device::{Device, DeviceState};
use crate::id::SensorId;
use crate::sensor::Reading;
use crate::time::Timestamp;

/// Read access to sensor readings by id.
pub trait Readings {
    fn reading(&self, sensor: SensorId) -> Reading;
}

/// Desired state for `device` at `now`. `None` means "leave unchanged".
#[must_use]
pub fn evaluate(device: &Device, readings: &impl Readings, now: Timestamp) -> Option<DeviceState> {
    if let Some(ovr) = device.active_override(now) {
        return Some(ovr.state);
    }

    device
        .conditions
        .iter()
        .rev()
        .find(|cond| cond.matches(readings.reading(cond.sensor)))
        .map(|cond| cond.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Operator, Range};
    use crate::device::{Actuation, Override};
    use crate::id::DeviceId;
    use crate::time;
    use chrono::TimeDelta;

    struct Fixed(Vec<Reading>);

    impl Readings for Fixed {
        fn reading(&self, sensor: SensorId) -> Reading {
            self.0[sensor.index()]
        }
    }

    const TEMP: SensorId = SensorId::from_index(0);
    const CLOCK: SensorId = SensorId::from_index(1);

    fn heater(conditions: Vec<Condition>) -> Device {
        Device {
            id: DeviceId::from_index(0),
            name: "Heater".to_string(),
            actuated: None,
            manual_override: None,
            conditions,
            actuation: Actuation::Noop,
        }
    }

    #[test]
    fn should_return_unchanged_when_no_condition_matches() {
        let dev = heater(vec![Condition::new(
            TEMP,
            DeviceState::On,
            Operator::Less,
            Range::point(100),
        )]);
        let readings = Fixed(vec![Reading::new(500), Reading::new(0)]);
        assert_eq!(evaluate(&dev, &readings, time::now()), None);
    }

    #[test]
    fn should_return_unchanged_when_device_has_no_conditions() {
        let readings = Fixed(vec![Reading::new(1)]);
        assert_eq!(evaluate(&heater(Vec::new()), &readings, time::now()), None);
    }

    #[test]
    fn should_let_last_matching_condition_win() {
        let dev = heater(vec![
            Condition::new(TEMP, DeviceState::On, Operator::Less, Range::point(100)),
            Condition::new(TEMP, DeviceState::Off, Operator::Less, Range::point(200)),
        ]);
        let readings = Fixed(vec![Reading::new(50), Reading::new(0)]);
        assert_eq!(
            evaluate(&dev, &readings, time::now()),
            Some(DeviceState::Off)
        );
    }

    #[test]
    fn should_fall_back_to_earlier_match_when_later_condition_misses() {
        let dev = heater(vec![
            Condition::new(TEMP, DeviceState::On, Operator::Less, Range::point(100)),
            Condition::new(CLOCK, DeviceState::Off, Operator::Greater, Range::point(10)),
        ]);
        let readings = Fixed(vec![Reading::new(50), Reading::new(5)]);
        assert_eq!(
            evaluate(&dev, &readings, time::now()),
            Some(DeviceState::On)
        );
    }

    #[test]
    fn should_skip_conditions_whose_sensor_is_invalid() {
        let dev = heater(vec![
            Condition::new(CLOCK, DeviceState::On, Operator::GreaterEqual, Range::point(0)),
            Condition::new(TEMP, DeviceState::Off, Operator::NotEqual, Range::point(1)),
        ]);
        let readings = Fixed(vec![Reading::INVALID, Reading::new(3)]);
        assert_eq!(
            evaluate(&dev, &readings, time::now()),
            Some(DeviceState::On)
        );
    }

    #[test]
    fn should_return_override_state_while_override_is_active() {
        let now = time::now();
        let mut dev = heater(vec![Condition::new(
            TEMP,
            DeviceState::On,
            Operator::Less,
            Range::point(100),
        )]);
        dev.manual_override = Some(Override::new(DeviceState::Off, now + TimeDelta::seconds(5)));
        let readings = Fixed(vec![Reading::new(10), Reading::new(0)]);

        assert_eq!(evaluate(&dev, &readings, now), Some(DeviceState::Off));
    }

    #[test]
    fn should_revert_to_rules_when_override_expires() {
        let now = time::now();
        let mut dev = heater(vec![Condition::new(
            TEMP,
            DeviceState::On,
            Operator::Less,
            Range::point(100),
        )]);
        dev.manual_override = Some(Override::new(DeviceState::Off, now + TimeDelta::seconds(5)));
        let readings = Fixed(vec![Reading::new(10), Reading::new(0)]);

        let later = now + TimeDelta::seconds(5);
        assert_eq!(evaluate(&dev, &readings, later), Some(DeviceState::On));
    }
}
