//! Actuation port: push a new on/off state to a device.

use std::future::Future;

use aquaria_domain::command::Command;
use aquaria_domain::device::DeviceState;
use aquaria_domain::error::AquariaError;

/// Drives a device through its helper.
///
/// Called only when the evaluated state differs from the last actuated one.
/// The call is awaited to completion before the tick continues.
pub trait Actuator {
    /// Run `command` for `device` so that it ends up in `state`.
    fn actuate(
        &self,
        device: &str,
        command: &Command,
        state: DeviceState,
    ) -> impl Future<Output = Result<(), AquariaError>> + Send;
}
