//! Tick log port: one sample set per scheduler tick.

use aquaria_domain::registry::Registry;

use crate::scheduler::TickReport;

/// Sink for per-tick samples (sensor readings and device changes).
///
/// Logging must not interrupt the control loop: implementations handle their
/// own write errors.
pub trait TickLog {
    fn record(&mut self, registry: &Registry, report: &TickReport);
}

/// Discards every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTickLog;

impl TickLog for NullTickLog {
    fn record(&mut self, _registry: &Registry, _report: &TickReport) {}
}

impl<L: TickLog> TickLog for Option<L> {
    fn record(&mut self, registry: &Registry, report: &TickReport) {
        if let Some(log) = self {
            log.record(registry, report);
        }
    }
}
