//! Request handling against the registry.

use aquaria_app::control;
use aquaria_domain::device::Device;
use aquaria_domain::registry::Registry;
use aquaria_domain::time::Timestamp;

use crate::error::ProtocolError;
use crate::request::Request;
use crate::response::{DeviceList, DeviceView, Response, SensorList, SensorView};

/// Answer `request` at `now`.
///
/// Lookups of an unknown name answer an empty list. `set-device` answers
/// like `get-device` for the same name once the override is in place.
///
/// # Errors
///
/// Returns [`ProtocolError::Rejected`] when `set-device` names no device.
#[tracing::instrument(skip(registry, now))]
pub fn dispatch(
    registry: &mut Registry,
    request: Request,
    now: Timestamp,
) -> Result<Response, ProtocolError> {
    match request {
        Request::GetSensor { name } => Ok(sensors(registry, name.as_deref())),
        Request::GetDevice { name } => Ok(devices(registry, name.as_deref(), now)),
        Request::SetDevice {
            name,
            state,
            expire,
        } => {
            control::set_device(registry, &name, state, expire, now)
                .map_err(ProtocolError::Rejected)?;
            Ok(devices(registry, Some(&name), now))
        }
    }
}

fn sensors(registry: &Registry, name: Option<&str>) -> Response {
    let sensor = match name {
        None => registry.sensors().map(SensorView::new).collect(),
        Some(name) => registry.find_sensor(name).map(SensorView::new).into_iter().collect(),
    };
    Response::Sensors(SensorList { sensor })
}

fn devices(registry: &Registry, name: Option<&str>, now: Timestamp) -> Response {
    let view = |device: &Device| DeviceView::new(device, now);
    let device = match name {
        None => registry.devices().map(view).collect(),
        Some(name) => registry.find_device(name).map(view).into_iter().collect(),
    };
    Response::Devices(DeviceList { device })
}
