use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use warden_core::DomainError;

/// Role identifier used for policy evaluation.
///
/// A session acts as exactly one role at a time; the role travels inside the
/// signed claims and is the only thing the policy engine keys on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Validate untrusted input: non-empty, no whitespace, no path separators.
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("role must not be empty"));
        }
        if name.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(DomainError::validation(format!("invalid role '{name}'")));
        }
        Ok(Self(Cow::Owned(name.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
