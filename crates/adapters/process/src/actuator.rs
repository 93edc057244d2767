//! [`Actuator`] backed by helper processes.

use std::future::Future;
use std::process::Stdio;

use aquaria_app::ports::Actuator;
use aquaria_domain::command::Command;
use aquaria_domain::device::DeviceState;
use aquaria_domain::error::AquariaError;

use crate::error::ProcessError;

/// Runs a device's helper with `--state=on|off` appended and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessActuator;

impl ProcessActuator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run `command` for `state` to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] when the helper cannot start or exits
    /// unsuccessfully.
    pub async fn run(command: &Command, state: DeviceState) -> Result<(), ProcessError> {
        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .arg(state_flag(state))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let program = command.program.as_str();
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::warn!(program, "{line}");
        }

        if output.status.success() {
            Ok(())
        } else if let Some(code) = output.status.code() {
            Err(ProcessError::ExitStatus(code))
        } else {
            Err(ProcessError::Signal)
        }
    }
}

fn state_flag(state: DeviceState) -> String {
    format!("--state={state}")
}

impl Actuator for ProcessActuator {
    fn actuate(
        &self,
        device: &str,
        command: &Command,
        state: DeviceState,
    ) -> impl Future<Output = Result<(), AquariaError>> + Send {
        tracing::debug!(device, %command, %state, "running actuator");
        async move { Self::run(command, state).await.map_err(ProcessError::into_domain) }
    }
}
