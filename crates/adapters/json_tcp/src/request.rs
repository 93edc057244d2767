//! Validated client requests.

use std::time::Duration;

use serde_json::{Map, Value, json};

use aquaria_app::control::DEFAULT_OVERRIDE;
use aquaria_domain::device::DeviceState;

use crate::decoder::{Quantity, RawRequest};
use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// One named sensor, or all of them when `name` is `None`.
    GetSensor { name: Option<String> },
    /// One named device, or all of them when `name` is `None`.
    GetDevice { name: Option<String> },
    /// Pin a device to `state` for `expire`.
    SetDevice {
        name: String,
        state: DeviceState,
        expire: Duration,
    },
}

impl Request {
    /// Encode as the JSON object a server decodes back into `self`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::GetSensor { name } => lookup("get-sensor", name.as_deref()),
            Self::GetDevice { name } => lookup("get-device", name.as_deref()),
            Self::SetDevice {
                name,
                state,
                expire,
            } => {
                let mut body = json!({
                    "request": "set-device",
                    "name": name,
                    "active": state.is_on(),
                });
                if expire.subsec_nanos() == 0 {
                    body["expire"] = json!(expire.as_secs());
                } else {
                    let micros = u64::try_from(expire.as_micros()).unwrap_or(u64::MAX);
                    body["timeout"] = json!({ "value": micros, "units": "us" });
                }
                body
            }
        }
    }
}

fn lookup(request: &str, name: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("request".into(), request.into());
    if let Some(name) = name {
        body.insert("name".into(), name.into());
    }
    Value::Object(body)
}

impl TryFrom<RawRequest> for Request {
    type Error = ProtocolError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        let kind = raw.request.ok_or(ProtocolError::MissingField("request"))?;
        let name = raw.name.filter(|name| !name.is_empty());
        match kind.as_str() {
            "get-sensor" => Ok(Self::GetSensor { name }),
            "get-device" => Ok(Self::GetDevice { name }),
            "set-device" => {
                let name = name.ok_or(ProtocolError::MissingField("name"))?;
                let active = raw.active.ok_or(ProtocolError::MissingField("active"))?;
                let expire = match (raw.expire, raw.timeout) {
                    (Some(secs), _) => Duration::from_secs(secs),
                    (None, Some(timeout)) => timeout_duration(timeout)?,
                    (None, None) => DEFAULT_OVERRIDE,
                };
                Ok(Self::SetDevice {
                    name,
                    state: DeviceState::from(active),
                    expire,
                })
            }
            _ => Err(ProtocolError::UnknownRequest(kind)),
        }
    }
}

/// Seconds unless `units` says otherwise.
fn timeout_duration(timeout: Quantity) -> Result<Duration, ProtocolError> {
    let value = timeout
        .value
        .ok_or(ProtocolError::MissingField("timeout.value"))?;
    match timeout.units.as_deref().unwrap_or("s") {
        "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "us" => Ok(Duration::from_micros(value)),
        other => Err(ProtocolError::UnknownUnits(other.to_string())),
    }
}
