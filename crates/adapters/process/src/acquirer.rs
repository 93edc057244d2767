//! [`Acquirer`] backed by helper processes.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use aquaria_app::ports::{Acquirer, Acquisition};
use aquaria_domain::command::Command;
use aquaria_domain::id::SensorId;

use crate::error::ProcessError;
use crate::runner::{ProcessHandle, ProcessStatus};

/// Keeps at most one running helper per sensor.
///
/// A helper is spawned the first time a sensor is acquired and polled on the
/// following ticks. Once it answers or fails the handle is dropped, so the
/// next acquisition starts a fresh helper.
#[derive(Debug, Default)]
pub struct ProcessAcquirer {
    running: HashMap<SensorId, ProcessHandle>,
}

impl ProcessAcquirer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of helpers currently running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.running.len()
    }
}

impl Drop for ProcessAcquirer {
    fn drop(&mut self) {
        for (sensor, mut handle) in self.running.drain() {
            tracing::debug!(?sensor, "killing pending sensor helper");
            handle.kill();
        }
    }
}

impl Acquirer for ProcessAcquirer {
    fn acquire(&mut self, sensor: SensorId, command: &Command) -> Acquisition {
        let handle = match self.running.entry(sensor) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match ProcessHandle::spawn(command) {
                Ok(handle) => entry.insert(handle),
                Err(err) => return Acquisition::Failed(err.into_domain()),
            },
        };

        let status = handle.poll();
        if !matches!(status, ProcessStatus::Pending) {
            self.running.remove(&sensor);
        }

        match status {
            ProcessStatus::Pending => Acquisition::Pending,
            ProcessStatus::Line(line) => match parse_reading(&line) {
                Ok(value) => Acquisition::Reading(value),
                Err(err) => Acquisition::Failed(err.into_domain()),
            },
            ProcessStatus::Failed(err) => Acquisition::Failed(err.into_domain()),
        }
    }
}

/// Parse a helper's output line as an unsigned integer, decimal or `0x` hex.
///
/// # Errors
///
/// Returns [`ProcessError::InvalidReading`] for anything else.
pub fn parse_reading(line: &str) -> Result<u64, ProcessError> {
    let text = line.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| ProcessError::InvalidReading(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TEMP: SensorId = SensorId::from_index(3);

    fn sh(script: &str) -> Command {
        Command::new("sh").args(["-c", script])
    }

    async fn acquire_until_done(acquirer: &mut ProcessAcquirer, command: &Command) -> Acquisition {
        for _ in 0..50 {
            match acquirer.acquire(TEMP, command) {
                Acquisition::Pending => tokio::time::sleep(Duration::from_millis(20)).await,
                done => return done,
            }
        }
        Acquisition::Pending
    }

    #[test]
    fn should_parse_decimal_and_hex_readings() {
        assert_eq!(parse_reading("293150000").unwrap(), 293_150_000);
        assert_eq!(parse_reading(" 42 ").unwrap(), 42);
        assert_eq!(parse_reading("0x1F").unwrap(), 31);
        assert_eq!(parse_reading("0XfF").unwrap(), 255);
    }

    #[test]
    fn should_reject_non_numeric_readings() {
        for line in ["", "-1", "21.5", "0x", "warm"] {
            assert!(
                matches!(parse_reading(line), Err(ProcessError::InvalidReading(_))),
                "{line:?}"
            );
        }
    }

    #[tokio::test]
    async fn should_report_pending_right_after_spawn() {
        let mut acquirer = ProcessAcquirer::new();
        let outcome = acquirer.acquire(TEMP, &sh("sleep 1; echo 1"));
        assert!(matches!(outcome, Acquisition::Pending));
        assert_eq!(acquirer.running(), 1);
    }

    #[tokio::test]
    async fn should_return_reading_and_release_helper() {
        let mut acquirer = ProcessAcquirer::new();
        let outcome = acquire_until_done(&mut acquirer, &sh("echo 293150000")).await;
        assert!(matches!(outcome, Acquisition::Reading(293_150_000)));
        assert_eq!(acquirer.running(), 0);
    }

    #[tokio::test]
    async fn should_keep_reading_when_helper_prints_more_afterwards() {
        let mut acquirer = ProcessAcquirer::new();
        let chatty = sh("echo 290000000; sleep 0.3; echo done");
        let outcome = acquire_until_done(&mut acquirer, &chatty).await;
        assert!(matches!(outcome, Acquisition::Reading(290_000_000)));
    }

    #[tokio::test]
    async fn should_fail_then_respawn_on_next_acquisition() {
        let mut acquirer = ProcessAcquirer::new();
        let failing = sh("exit 2");
        let outcome = acquire_until_done(&mut acquirer, &failing).await;
        assert!(matches!(outcome, Acquisition::Failed(_)));
        assert_eq!(acquirer.running(), 0);

        let outcome = acquirer.acquire(TEMP, &failing);
        assert!(matches!(outcome, Acquisition::Pending));
        assert_eq!(acquirer.running(), 1);
    }

    #[tokio::test]
    async fn should_fail_immediately_when_program_is_missing() {
        let mut acquirer = ProcessAcquirer::new();
        let outcome = acquirer.acquire(TEMP, &Command::new("/nonexistent/aquaria-probe"));
        assert!(matches!(outcome, Acquisition::Failed(_)));
        assert_eq!(acquirer.running(), 0);
    }

    #[tokio::test]
    async fn should_fail_when_helper_prints_garbage() {
        let mut acquirer = ProcessAcquirer::new();
        let outcome = acquire_until_done(&mut acquirer, &sh("echo hot")).await;
        assert!(matches!(outcome, Acquisition::Failed(_)));
    }
}
