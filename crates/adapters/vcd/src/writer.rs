//! VCD writer.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use aquaria_app::ports::TickLog;
use aquaria_app::scheduler::TickReport;
use aquaria_domain::id::{DeviceId, SensorId};
use aquaria_domain::registry::Registry;

/// Writes one VCD sample block per tick.
#[derive(Debug)]
pub struct VcdLog<W: Write> {
    out: W,
    sensors: HashMap<SensorId, String>,
    devices: HashMap<DeviceId, String>,
    started: bool,
}

impl VcdLog<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the file cannot be created.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        tracing::info!(path = %path.display(), "vcd log opened");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> VcdLog<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            sensors: HashMap::new(),
            devices: HashMap::new(),
            started: false,
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Assign identifiers and write the definitions section.
    fn write_header(&mut self, registry: &Registry) -> io::Result<()> {
        let mut next_id = 1u32;
        let mut assign = || {
            let id = format!("{next_id:X}");
            next_id += 1;
            id
        };

        writeln!(self.out, "$version Aquaria Aquarium Controller $end")?;
        writeln!(self.out, "$timescale 1 ns $end")?;
        writeln!(self.out, "$scope module Aquaria $end")?;
        for sensor in registry.sensors().filter(|s| !s.is_builtin()) {
            let id = assign();
            writeln!(self.out, "$var real 64 {id} Sensor.{} $end", sensor.name)?;
            self.sensors.insert(sensor.id, id);
        }
        for device in registry.devices() {
            let id = assign();
            writeln!(self.out, "$var wire 1 {id} Device.{} $end", device.name)?;
            self.devices.insert(device.id, id);
        }
        writeln!(self.out, "$upscope $end")?;
        writeln!(self.out, "$enddefinitions $end")
    }

    fn write_sample(&mut self, registry: &Registry, report: &TickReport) -> io::Result<()> {
        if !self.started {
            self.write_header(registry)?;
            self.started = true;
        }

        writeln!(
            self.out,
            "#{}{:09}",
            report.at.timestamp(),
            report.at.timestamp_subsec_nanos()
        )?;
        for (sensor, reading) in &report.readings {
            if let Some(id) = self.sensors.get(sensor)
                && let Some(value) = reading.get()
            {
                writeln!(self.out, "r{value} {id}")?;
            }
        }
        for (device, state) in &report.changes {
            if let Some(id) = self.devices.get(device) {
                writeln!(self.out, "b{} {id}", u8::from(state.is_on()))?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write> TickLog for VcdLog<W> {
    fn record(&mut self, registry: &Registry, report: &TickReport) {
        if let Err(err) = self.write_sample(registry, report) {
            tracing::warn!(error = %err, "failed to write vcd sample");
        }
    }
}
