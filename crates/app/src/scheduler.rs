//! Scheduler: one tick of the control loop.
//!
//! A tick runs `REFRESH → EVALUATE → ACTUATE → LOG` to completion:
//!
//! 1. every sensor is refreshed: built-ins synchronously, helper-backed
//!    sensors through the [`Acquirer`] port without blocking;
//! 2. every device is evaluated against the fresh readings;
//! 3. devices whose desired state differs from the last actuated one are
//!    driven through the [`Actuator`] port, one at a time;
//! 4. the tick's samples go to the [`TickLog`].
//!
//! [`TickTimer`] decides when the next tick is due.

use std::time::Duration;

use aquaria_domain::device::{Actuation, DeviceState};
use aquaria_domain::evaluator::Readings;
use aquaria_domain::id::{DeviceId, SensorId};
use aquaria_domain::registry::Registry;
use aquaria_domain::sensor::{Reading, SensorSource};
use aquaria_domain::time::Timestamp;

use crate::ports::{Acquirer, Acquisition, Actuator, TickLog};

/// Nominal interval between two ticks when nothing else happens.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub at: Timestamp,
    /// Valid readings of helper-backed sensors after the refresh.
    pub readings: Vec<(SensorId, Reading)>,
    /// Sensors whose helper failed this tick.
    pub failed_sensors: Vec<SensorId>,
    /// Devices that changed state, in declaration order.
    pub changes: Vec<(DeviceId, DeviceState)>,
    /// Devices whose actuation helper reported an error.
    pub failed_actuations: Vec<DeviceId>,
}

impl TickReport {
    fn new(at: Timestamp) -> Self {
        Self {
            at,
            readings: Vec::new(),
            failed_sensors: Vec::new(),
            changes: Vec::new(),
            failed_actuations: Vec::new(),
        }
    }
}

/// Runs scheduler ticks over a registry it does not own.
pub struct Scheduler<Q, A, L> {
    acquirer: Q,
    actuator: A,
    log: L,
}

impl<Q, A, L> Scheduler<Q, A, L>
where
    Q: Acquirer,
    A: Actuator,
    L: TickLog,
{
    pub fn new(acquirer: Q, actuator: A, log: L) -> Self {
        Self {
            acquirer,
            actuator,
            log,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Run one full tick at `now`.
    #[tracing::instrument(skip_all, fields(at = %now))]
    pub async fn tick(&mut self, registry: &mut Registry, now: Timestamp) -> TickReport {
        let mut report = TickReport::new(now);

        self.refresh(registry, now, &mut report);
        let changes = evaluate_all(registry, now);
        self.actuate(registry, changes, &mut report).await;
        self.log.record(registry, &report);

        report
    }

    fn refresh(&mut self, registry: &mut Registry, now: Timestamp, report: &mut TickReport) {
        for id in registry.sensor_ids() {
            let Some(sensor) = registry.sensor(id) else {
                continue;
            };
            let reading = match &sensor.source {
                SensorSource::Builtin(builtin) => Some(builtin.read(now)),
                SensorSource::Process(command) => match self.acquirer.acquire(id, command) {
                    Acquisition::Pending => None,
                    Acquisition::Reading(value) => Some(Reading::new(value)),
                    Acquisition::Failed(err) => {
                        tracing::warn!(
                            sensor = %sensor.name,
                            error = %err,
                            "sensor acquisition failed"
                        );
                        report.failed_sensors.push(id);
                        Some(Reading::INVALID)
                    }
                },
            };
            let logged = !sensor.is_builtin();
            if let Some(reading) = reading {
                registry.set_reading(id, reading);
            }
            let current = registry.reading(id);
            if logged && current.is_valid() {
                report.readings.push((id, current));
            }
        }
    }

    async fn actuate(
        &self,
        registry: &mut Registry,
        changes: Vec<(DeviceId, DeviceState)>,
        report: &mut TickReport,
    ) {
        for (id, state) in changes {
            let Some(device) = registry.device(id) else {
                continue;
            };
            if let Actuation::Process(command) = &device.actuation
                && let Err(err) = self.actuator.actuate(&device.name, command, state).await
            {
                tracing::warn!(device = %device.name, %state, error = %err, "actuation failed");
                report.failed_actuations.push(id);
            }
            tracing::info!(device = %device.name, %state, "device state changed");
            registry.set_actuated(id, state);
            report.changes.push((id, state));
        }
    }
}

/// Desired transitions for every device whose evaluated state differs from
/// its actuated one.
fn evaluate_all(registry: &Registry, now: Timestamp) -> Vec<(DeviceId, DeviceState)> {
    registry
        .devices()
        .filter_map(|device| {
            let desired = registry.evaluate(device.id, now)?;
            (device.actuated != Some(desired)).then_some((device.id, desired))
        })
        .collect()
}

/// Tracks the wall-clock second of the last tick.
///
/// A tick is due when the poll timed out, or when an event arrives in a later
/// second than the previous tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickTimer {
    last_second: Option<i64>,
}

impl TickTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `now` lies in a different second than the last marked tick.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.last_second.is_none_or(|last| last != now.timestamp())
    }

    pub fn mark(&mut self, now: Timestamp) {
        self.last_second = Some(now.timestamp());
    }
}
