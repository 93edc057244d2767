//! Control use-cases: client-driven manual overrides.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use aquaria_domain::device::DeviceState;
use aquaria_domain::error::AquariaError;
use aquaria_domain::id::DeviceId;
use aquaria_domain::registry::Registry;
use aquaria_domain::time::Timestamp;

/// How long an override lasts when the client gives no expiry.
pub const DEFAULT_OVERRIDE: Duration = Duration::from_secs(600);

/// Pin the device called `name` to `state` for `expire` from `now`.
///
/// The override masks every condition of the device until it expires; the
/// next tick actuates the device if its state changes.
///
/// # Errors
///
/// Returns [`AquariaError::NotFound`] when no device is called `name`.
#[tracing::instrument(skip(registry, now))]
pub fn set_device(
    registry: &mut Registry,
    name: &str,
    state: DeviceState,
    expire: Duration,
    now: Timestamp,
) -> Result<DeviceId, AquariaError> {
    let expires_at = TimeDelta::from_std(expire)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let id = registry.set_override(name, state, expires_at)?;
    tracing::info!(%state, %expires_at, "device override set");
    Ok(id)
}
