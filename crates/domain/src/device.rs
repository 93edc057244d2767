//! Device: a named on/off actuator governed by conditions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::condition::Condition;
use crate::id::DeviceId;
use crate::time::Timestamp;

/// Binary state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for DeviceState {
    fn from(active: bool) -> Self {
        if active { Self::On } else { Self::Off }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "on",
            Self::Off => "off",
        })
    }
}

/// A manual state pinned by a client until `expires_at`.
///
/// State and expiry always change together as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub state: DeviceState,
    pub expires_at: Timestamp,
}

impl Override {
    #[must_use]
    pub const fn new(state: DeviceState, expires_at: Timestamp) -> Self {
        Self { state, expires_at }
    }

    /// Active while the expiry is strictly after `now`.
    #[must_use]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

/// How a device is driven when its state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actuation {
    /// Run the helper with `--state=on|off` appended.
    Process(Command),
    /// Only record the transition.
    Noop,
}

#[derive(Debug, Clone)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Last state pushed to the actuator; `None` until the first change.
    pub actuated: Option<DeviceState>,
    pub manual_override: Option<Override>,
    /// Evaluated in declaration order; the last match wins.
    pub conditions: Vec<Condition>,
    pub actuation: Actuation,
}

impl Device {
    /// The override if it is still active at `now`.
    #[must_use]
    pub fn active_override(&self, now: Timestamp) -> Option<&Override> {
        self.manual_override
            .as_ref()
            .filter(|ovr| ovr.is_active(now))
    }
}
