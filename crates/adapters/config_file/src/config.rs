//! `device` and `sensor` declarations.

use aquaria_domain::command::Command;
use aquaria_domain::device::Actuation;
use aquaria_domain::registry::Registry;
use aquaria_domain::sensor::{SensorKind, SensorSource};

use crate::LoadOptions;
use crate::error::{ConfigError, SyntaxError};
use crate::lines::{Line, lines};

/// Add the devices and helper-backed sensors declared in `text`.
///
/// ```text
/// device <name> <program> [args...]
/// sensor <name> <type> <program> [args...]
/// ```
///
/// With [`LoadOptions::dry_run`] every device is wired to a no-op actuator.
///
/// # Errors
///
/// Returns [`ConfigError::Syntax`] for the first line that is malformed or
/// names a device or sensor twice.
pub fn parse_config(
    registry: &mut Registry,
    file: &str,
    text: &str,
    options: LoadOptions,
) -> Result<(), ConfigError> {
    for line in lines(file, text) {
        let mut line = line?;
        let number = line.number;
        declare(registry, &mut line, options)
            .map_err(|kind| ConfigError::syntax(file, number, kind))?;
    }
    Ok(())
}

fn declare(
    registry: &mut Registry,
    line: &mut Line<'_>,
    options: LoadOptions,
) -> Result<(), SyntaxError> {
    let directive = line.next_token().unwrap_or_default();
    if directive.eq_ignore_ascii_case("device") {
        let name = line.next_token().ok_or(SyntaxError::MissingName("device"))?;
        let command = command(line, "device")?;
        let actuation = if options.dry_run {
            Actuation::Noop
        } else {
            Actuation::Process(command)
        };
        registry
            .add_device(name, actuation)
            .map_err(SyntaxError::Registry)?;
        tracing::debug!(device = name, "device declared");
    } else if directive.eq_ignore_ascii_case("sensor") {
        let name = line.next_token().ok_or(SyntaxError::MissingName("sensor"))?;
        let kind = line.next_token().ok_or(SyntaxError::MissingType)?;
        let kind =
            SensorKind::from_name(kind).ok_or_else(|| SyntaxError::UnknownType(kind.to_string()))?;
        let command = command(line, "sensor")?;
        registry
            .add_sensor(name, kind, SensorSource::Process(command))
            .map_err(SyntaxError::Registry)?;
        tracing::debug!(sensor = name, %kind, "sensor declared");
    } else {
        return Err(SyntaxError::UnknownDirective(directive.to_string()));
    }
    Ok(())
}

fn command(line: &mut Line<'_>, what: &'static str) -> Result<Command, SyntaxError> {
    let program = line.next_token().ok_or(SyntaxError::MissingProgram(what))?;
    let mut command = Command::new(program);
    while let Some(arg) = line.next_token() {
        command = command.arg(arg);
    }
    Ok(command)
}
