//! JSON-over-TCP adapter error types.

use aquaria_domain::error::AquariaError;

/// Why a request was refused. Any of these ends the connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("invalid JSON string")]
    InvalidString(#[source] serde_json::Error),

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("more than {0} bytes of pending input")]
    Overflow(usize),

    #[error("request is not an object")]
    NotAnObject,

    #[error("unexpected nesting")]
    UnexpectedNesting,

    #[error("unknown key {0:?}")]
    UnknownKey(String),

    #[error("expected {expected} for {key:?}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },

    #[error("decoder stopped after an earlier error")]
    Poisoned,

    #[error("unknown request {0:?}")]
    UnknownRequest(String),

    #[error("missing {0:?}")]
    MissingField(&'static str),

    #[error("unknown units {0:?}")]
    UnknownUnits(String),

    #[error("request rejected")]
    Rejected(#[source] AquariaError),
}

/// Errors seen by [`Client`](crate::Client).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed")]
    Io(#[from] std::io::Error),

    #[error("malformed response")]
    Json(#[from] serde_json::Error),

    #[error("server closed the connection")]
    Closed,

    #[error("server refused the request")]
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquaria_domain::error::NotFoundError;

    #[test]
    fn should_describe_type_mismatch() {
        let err = ProtocolError::TypeMismatch {
            key: "active",
            expected: "a boolean",
        };
        assert_eq!(err.to_string(), "expected a boolean for \"active\"");
    }

    #[test]
    fn should_keep_domain_error_as_source() {
        let err = ProtocolError::Rejected(
            NotFoundError {
                entity: "Device",
                key: "Pump".to_string(),
            }
            .into(),
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Device \"Pump\" not found");
    }
}
