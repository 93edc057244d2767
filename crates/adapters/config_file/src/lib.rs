//! # aquaria-adapter-config-file
//!
//! Reads the two line-based files that describe an installation and turns
//! them into a populated [`Registry`].
//!
//! ## Config file
//!
//! ```text
//! # name     program              arguments
//! device Heater  /usr/lib/aquaria/relay  -p 3
//! sensor Temp temp /usr/lib/aquaria/w1-temp 28-000002a8b3c1
//! ```
//!
//! ## Schedule file
//!
//! ```text
//! device Heater
//!     on  Temp < 24.5C
//!     off Temp >= 25.5C
//!
//! device Light
//!     on  Time at 8:00 until 20:30
//!     off Weekday is sun
//! ```
//!
//! `#` starts a comment. Tokens are separated by blanks or commas. Any error
//! is reported with its `file:line` and aborts loading.
//!
//! ## Dependency rule
//!
//! Depends on `aquaria-domain` only; it performs file IO and nothing else.

mod config;
mod error;
mod lines;
mod schedule;
mod units;

use std::path::Path;

pub use config::parse_config;
pub use error::{ConfigError, SyntaxError};
pub use schedule::parse_schedule;
pub use units::{parse_temperature, parse_time_of_day, parse_weekday};

use aquaria_domain::registry::Registry;

/// Options that change how devices are wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Record state changes without running device helpers.
    pub dry_run: bool,
}

/// Build a registry from a config file and a schedule file.
///
/// The registry starts with the built-in sensors; the config file adds
/// helper-backed sensors and devices, then the schedule file adds conditions.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when a file cannot be read and
/// [`ConfigError::Syntax`] on the first malformed line.
pub fn load(
    config: &Path,
    schedule: &Path,
    options: LoadOptions,
) -> Result<Registry, ConfigError> {
    let mut registry = Registry::with_builtins();

    let text = read(config)?;
    parse_config(&mut registry, &config.display().to_string(), &text, options)?;

    let text = read(schedule)?;
    parse_schedule(&mut registry, &schedule.display().to_string(), &text)?;

    tracing::info!(
        sensors = registry.sensors().count(),
        devices = registry.devices().count(),
        "registry loaded"
    );
    Ok(registry)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
