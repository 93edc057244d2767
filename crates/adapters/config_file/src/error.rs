//! Config-file adapter error types.

use std::path::PathBuf;

use aquaria_domain::error::AquariaError;
use aquaria_domain::sensor::SensorKind;

/// Errors raised while loading the config or schedule file. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be understood.
    #[error("{file}:{line}: {kind}")]
    Syntax {
        file: String,
        line: usize,
        kind: SyntaxError,
    },
}

impl ConfigError {
    pub(crate) fn syntax(file: &str, line: usize, kind: SyntaxError) -> Self {
        Self::Syntax {
            file: file.to_string(),
            line,
            kind,
        }
    }
}

/// What was wrong with a line.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("line too long (> {0} characters)")]
    LineTooLong(usize),

    #[error("unrecognized directive {0:?}")]
    UnknownDirective(String),

    #[error("no {0} name given")]
    MissingName(&'static str),

    #[error("no {0} program given")]
    MissingProgram(&'static str),

    #[error("no sensor type given")]
    MissingType,

    #[error("unknown sensor type {0:?}")]
    UnknownType(String),

    #[error("no such device {0:?}")]
    NoSuchDevice(String),

    #[error("no such sensor {0:?}")]
    NoSuchSensor(String),

    #[error("unexpected {0:?} after device name")]
    UnexpectedToken(String),

    #[error("only one 'device' block allowed per device, {0:?} already has one")]
    DuplicateBlock(String),

    #[error("state control line outside of a 'device' block")]
    OutsideBlock,

    #[error("cannot parse condition for a {0} sensor")]
    Condition(SensorKind),

    #[error("rejected by registry")]
    Registry(#[source] AquariaError),
}
