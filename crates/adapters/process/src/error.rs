//! Process adapter error types.

use aquaria_domain::error::AquariaError;

use crate::line_buffer::LineBuffer;

/// Errors specific to helper processes.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The helper could not be started.
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A pipe requested at spawn time was not available.
    #[error("helper has no {0} pipe")]
    MissingPipe(&'static str),

    /// Reading a pipe or waiting for the child failed.
    #[error("helper i/o failed")]
    Io(#[source] std::io::Error),

    /// stdout reached end of file before a full line.
    #[error("helper closed its output before printing a line")]
    ClosedWithoutLine,

    /// stdout filled the line buffer without a newline.
    #[error("helper output exceeds {} bytes without a newline", LineBuffer::CAPACITY)]
    Overflow,

    /// The helper exited with a non-zero status.
    #[error("helper exited with status {0}")]
    ExitStatus(i32),

    /// The helper was terminated by a signal.
    #[error("helper was terminated by a signal")]
    Signal,

    /// The printed line is not an unsigned integer.
    #[error("helper printed an invalid reading {0:?}")]
    InvalidReading(String),

    /// The collecting task went away without reporting.
    #[error("helper was aborted")]
    Aborted,
}

impl ProcessError {
    /// Convert into an [`AquariaError::Process`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> AquariaError {
        AquariaError::Process(Box::new(self))
    }
}

impl From<ProcessError> for AquariaError {
    fn from(err: ProcessError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_exit_status() {
        assert_eq!(
            ProcessError::ExitStatus(3).to_string(),
            "helper exited with status 3"
        );
    }

    #[test]
    fn should_display_overflow_with_capacity() {
        assert_eq!(
            ProcessError::Overflow.to_string(),
            "helper output exceeds 256 bytes without a newline"
        );
    }

    #[test]
    fn should_convert_into_process_domain_error() {
        let err: AquariaError = ProcessError::Signal.into();
        assert!(matches!(err, AquariaError::Process(_)));
    }
}
