//! Registry: the in-memory catalog of sensors and devices.
//!
//! Entities live in arena vectors addressed by [`SensorId`] / [`DeviceId`];
//! a lower-cased name index provides case-insensitive lookup. Iteration
//! follows declaration order. Nothing is ever removed.

use std::collections::HashMap;

use crate::condition::Condition;
use crate::device::{Actuation, Device, DeviceState, Override};
use crate::error::{AquariaError, NotFoundError, ValidationError};
use crate::evaluator::{self, Readings};
use crate::id::{DeviceId, SensorId};
use crate::sensor::{Builtin, Reading, Sensor, SensorKind, SensorSource};
use crate::time::{MICROS_PER_DAY, Timestamp};

/// Names of the sensors every registry starts with.
pub const BUILTIN_SENSORS: [(&str, SensorKind, Builtin); 3] = [
    ("Always", SensorKind::Nop, Builtin::Constant),
    ("Time", SensorKind::Time, Builtin::TimeOfDay),
    ("Weekday", SensorKind::Weekday, Builtin::Weekday),
];

#[derive(Debug, Default)]
pub struct Registry {
    sensors: Vec<Sensor>,
    devices: Vec<Device>,
    sensor_names: HashMap<String, SensorId>,
    device_names: HashMap<String, DeviceId>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl Registry {
    /// An empty registry, without the built-in sensors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the `Always`, `Time` and `Weekday`
    /// built-in sensors.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, kind, builtin) in BUILTIN_SENSORS {
            let id = SensorId::from_index(registry.sensors.len());
            registry.sensor_names.insert(key(name), id);
            registry.sensors.push(Sensor {
                id,
                name: name.to_string(),
                kind,
                source: SensorSource::Builtin(builtin),
                reading: Reading::INVALID,
            });
        }
        registry
    }

    /// Register a sensor. Its reading starts out invalid.
    ///
    /// # Errors
    ///
    /// Returns [`AquariaError::Validation`] when the name is empty or
    /// already taken by another sensor.
    pub fn add_sensor(
        &mut self,
        name: impl Into<String>,
        kind: SensorKind,
        source: SensorSource,
    ) -> Result<SensorId, AquariaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.sensor_names.contains_key(&key(&name)) {
            return Err(ValidationError::DuplicateName {
                kind: "sensor",
                name,
            }
            .into());
        }
        let id = SensorId::from_index(self.sensors.len());
        self.sensor_names.insert(key(&name), id);
        self.sensors.push(Sensor {
            id,
            name,
            kind,
            source,
            reading: Reading::INVALID,
        });
        Ok(id)
    }

    /// Register a device with no conditions and no actuated state.
    ///
    /// # Errors
    ///
    /// Returns [`AquariaError::Validation`] when the name is empty or
    /// already taken by another device.
    pub fn add_device(
        &mut self,
        name: impl Into<String>,
        actuation: Actuation,
    ) -> Result<DeviceId, AquariaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.device_names.contains_key(&key(&name)) {
            return Err(ValidationError::DuplicateName {
                kind: "device",
                name,
            }
            .into());
        }
        let id = DeviceId::from_index(self.devices.len());
        self.device_names.insert(key(&name), id);
        self.devices.push(Device {
            id,
            name,
            actuated: None,
            manual_override: None,
            conditions: Vec::new(),
            actuation,
        });
        Ok(id)
    }

    /// Append a condition to a device, after every condition added before.
    ///
    /// # Errors
    ///
    /// Returns [`AquariaError::NotFound`] for an unknown device or sensor id,
    /// and [`ValidationError::TimeRangeOverflow`] when a condition on a
    /// time-of-day sensor reaches past 24 hours.
    pub fn add_condition(
        &mut self,
        device: DeviceId,
        condition: Condition,
    ) -> Result<(), AquariaError> {
        let sensor = self.sensor(condition.sensor).ok_or_else(|| NotFoundError {
            entity: "Sensor",
            key: condition.sensor.to_string(),
        })?;
        let end = condition.range.base.checked_add(condition.range.span);
        if sensor.kind == SensorKind::Time && end.is_none_or(|end| end > MICROS_PER_DAY) {
            return Err(ValidationError::TimeRangeOverflow.into());
        }
        let device = self.device_mut(device)?;
        device.conditions.push(condition);
        Ok(())
    }

    #[must_use]
    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(id.index())
    }

    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.index())
    }

    fn device_mut(&mut self, id: DeviceId) -> Result<&mut Device, AquariaError> {
        self.devices.get_mut(id.index()).ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                key: id.to_string(),
            }
            .into()
        })
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn find_sensor(&self, name: &str) -> Option<&Sensor> {
        self.sensor_names
            .get(&key(name))
            .and_then(|id| self.sensor(*id))
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn find_device(&self, name: &str) -> Option<&Device> {
        self.device_names
            .get(&key(name))
            .and_then(|id| self.device(*id))
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn sensor_ids(&self) -> impl Iterator<Item = SensorId> + use<> {
        (0..self.sensors.len()).map(SensorId::from_index)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = DeviceId> + use<> {
        (0..self.devices.len()).map(DeviceId::from_index)
    }

    /// Store the latest reading of a sensor. Unknown ids are ignored.
    pub fn set_reading(&mut self, id: SensorId, reading: Reading) {
        if let Some(sensor) = self.sensors.get_mut(id.index()) {
            sensor.reading = reading;
        }
    }

    /// Record the state last pushed to a device's actuator. Unknown ids are
    /// ignored.
    pub fn set_actuated(&mut self, id: DeviceId, state: DeviceState) {
        if let Some(device) = self.devices.get_mut(id.index()) {
            device.actuated = Some(state);
        }
    }

    /// Pin a device to `state` until `expires_at`, replacing any previous
    /// override as a single assignment.
    ///
    /// # Errors
    ///
    /// Returns [`AquariaError::NotFound`] when no device is called `name`.
    pub fn set_override(
        &mut self,
        name: &str,
        state: DeviceState,
        expires_at: Timestamp,
    ) -> Result<DeviceId, AquariaError> {
        let id = *self
            .device_names
            .get(&key(name))
            .ok_or_else(|| NotFoundError {
                entity: "Device",
                key: name.to_string(),
            })?;
        self.device_mut(id)?.manual_override = Some(Override::new(state, expires_at));
        Ok(id)
    }

    /// Run the evaluator for one device against the current readings.
    #[must_use]
    pub fn evaluate(&self, id: DeviceId, now: Timestamp) -> Option<DeviceState> {
        self.device(id)
            .and_then(|device| evaluator::evaluate(device, self, now))
    }
}

impl Readings for Registry {
    fn reading(&self, sensor: SensorId) -> Reading {
        self.sensor(sensor)
            .map_or(Reading::INVALID, |sensor| sensor.reading)
    }
}
