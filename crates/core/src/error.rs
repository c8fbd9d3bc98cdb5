//! Shared error model.

use thiserror::Error;

/// Result type used across the workspace for value-level failures.
pub type DomainResult<T> = Result<T, DomainError>;

/// Value-level error.
///
/// Only parsing at the edges surfaces these; the permission subsystem absorbs
/// malformed data instead of failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
