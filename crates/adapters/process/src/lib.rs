//! # aquaria-adapter-process
//!
//! Runs external helper programs for sensors and devices.
//!
//! ## How it works
//!
//! A sensor helper is spawned with its stdout and stderr piped. A background
//! task reads both pipes into fixed 256-byte line buffers: the first full line
//! on stdout is the reading, every stderr line is logged as a warning. The
//! control loop polls the task through a [`ProcessHandle`] and never blocks.
//!
//! A device helper is run to completion with `--state=on|off` appended to its
//! configured arguments; its exit status tells whether the switch worked.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `aquaria-app` and `aquaria-domain`.

mod acquirer;
mod actuator;
mod error;
mod line_buffer;
mod runner;

pub use acquirer::{ProcessAcquirer, parse_reading};
pub use actuator::ProcessActuator;
pub use error::ProcessError;
pub use line_buffer::LineBuffer;
pub use runner::{ProcessHandle, ProcessStatus};
