//! Typed identifier newtypes backed by registry arena indices.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident, $prefix:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(usize);

        impl $name {
            /// Wrap an arena index.
            #[must_use]
            pub const fn from_index(index: usize) -> Self {
                Self(index)
            }

            /// Access the inner arena index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Sensor`](crate::sensor::Sensor) within a registry.
    SensorId,
    "sensor"
);

define_id!(
    /// Identifier of a [`Device`](crate::device::Device) within a registry.
    DeviceId,
    "device"
);
