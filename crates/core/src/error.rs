//! Errors for values parsed from untrusted input.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Input rejected before it reaches any store or policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// Identifier text that does not parse as the expected id kind.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
