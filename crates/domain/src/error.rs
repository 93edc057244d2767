//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`AquariaError`] via `#[from]` or an explicit `into_domain()`.

/// Top-level domain error.
#[derive(Debug, thiserror::Error)]
pub enum AquariaError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A helper process failed (spawn, exit status, malformed output).
    #[error("process error")]
    Process(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Violated domain invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("{kind} named {name:?} already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("time range exceeds 24 hours")]
    TimeRangeOverflow,
}

/// A lookup by name or id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {key:?} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub key: String,
}
