//! # aquaria-adapter-vcd
//!
//! Implements the [`TickLog`](aquaria_app::ports::TickLog) port by writing a
//! value change dump that waveform viewers such as GTKWave can open.
//!
//! Each helper-backed sensor becomes a `real` variable and each device a
//! one-bit `wire`. The header is written just before the first sample, so
//! every sensor and device declared at startup is listed.
//!
//! ## Dependency rule
//!
//! Depends on `aquaria-app` and `aquaria-domain`.

mod writer;

pub use writer::VcdLog;
