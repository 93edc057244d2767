//! Acquisition port: non-blocking sensor reads through helper programs.
//!
//! The scheduler calls [`Acquirer::acquire`] once per tick for every
//! helper-backed sensor. Implementations must never block: a helper that has
//! not answered yet is reported as [`Acquisition::Pending`] and asked again on
//! the next tick.

use aquaria_domain::command::Command;
use aquaria_domain::error::AquariaError;
use aquaria_domain::id::SensorId;

/// Outcome of one acquisition attempt.
#[derive(Debug)]
pub enum Acquisition {
    /// The helper is still running; keep the previous reading.
    Pending,
    /// The helper printed a value.
    Reading(u64),
    /// The helper failed; the reading becomes invalid for this tick.
    Failed(AquariaError),
}

/// Starts or polls the helper behind a sensor.
pub trait Acquirer {
    /// Start a helper for `sensor` if none is running, otherwise poll the
    /// running one.
    fn acquire(&mut self, sensor: SensorId, command: &Command) -> Acquisition;
}
