use thiserror::Error;

/// Authentication-phase failures.
///
/// The variants are kept distinct for logging and tests; callers facing a
/// client collapse all of them into a single "unauthenticated" answer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,

    #[error("token is malformed")]
    MalformedToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,
}

impl AuthError {
    /// Stable machine-readable reason, used in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
        }
    }
}

/// Producing a token failed. Only happens on key or serialization problems,
/// which are configuration errors rather than per-request conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("signing key unavailable")]
    KeyUnavailable,

    #[error("failed to sign token: {0}")]
    Encode(String),
}
