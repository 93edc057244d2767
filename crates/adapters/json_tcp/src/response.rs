//! Response documents, built from a read-only walk of the registry.

use serde::{Deserialize, Serialize};

use aquaria_domain::device::Device;
use aquaria_domain::sensor::Sensor;
use aquaria_domain::time::{self, Timestamp};

/// Label of an override set through `set-device`.
pub const REASON_SET: &str = "set";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: u64,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorView {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Absent while the sensor has no valid reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<Quantity>,
}

impl SensorView {
    #[must_use]
    pub fn new(sensor: &Sensor) -> Self {
        Self {
            name: sensor.name.clone(),
            kind: sensor.kind.name().to_string(),
            reading: sensor.reading.get().map(|value| Quantity {
                value,
                units: sensor.kind.units().to_string(),
            }),
        }
    }
}

/// Why a device is in its current state; only overrides are reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub input: String,
    pub active: bool,
    /// Time left before the override lapses.
    pub expires: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceView {
    pub name: String,
    /// Absent until the device has been actuated once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Present only while an override is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
}

impl DeviceView {
    #[must_use]
    pub fn new(device: &Device, now: Timestamp) -> Self {
        Self {
            name: device.name.clone(),
            active: device.actuated.map(|state| state.is_on()),
            reason: device.active_override(now).map(|ovr| Reason {
                input: REASON_SET.to_string(),
                active: ovr.state.is_on(),
                expires: Quantity {
                    value: time::micros_until(now, ovr.expires_at),
                    units: "us".to_string(),
                },
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorList {
    pub sensor: Vec<SensorView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList {
    pub device: Vec<DeviceView>,
}

/// The `{}` sent back for a refused request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Sensors(SensorList),
    Devices(DeviceList),
    Empty(Empty),
}

impl Response {
    /// The wire form: compact JSON and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only a broken `Serialize` impl
    /// can cause.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}
