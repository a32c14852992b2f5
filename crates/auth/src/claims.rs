use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{UserId, UserUuid};

use crate::{AuthError, Role};

/// Who a token speaks for: the stable part of the claims that survives a
/// reissue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: UserId,
    pub user_uuid: UserUuid,
    pub role: Role,
    pub username: String,
    pub nickname: String,
}

/// Signed token payload.
///
/// Immutable once built: fields are private and there are no setters. Acting
/// under a different role means building a new `Claims` through
/// [`crate::TokenIssuer`] and handing out a new token.
///
/// Timestamps are unix seconds (JWT `NumericDate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    sub: UserId,
    uuid: UserUuid,
    role: Role,
    username: String,
    nickname: String,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

impl Claims {
    /// Build claims valid from `issued_at` for `ttl_secs`.
    ///
    /// Returns `None` if the window would be empty or overflow.
    pub(crate) fn new(
        subject: Subject,
        issuer: &str,
        issued_at: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Option<Self> {
        if ttl_secs <= 0 {
            return None;
        }
        let iat = issued_at.timestamp();
        let exp = iat.checked_add(ttl_secs)?;
        Some(Self {
            sub: subject.user_id,
            uuid: subject.user_uuid,
            role: subject.role,
            username: subject.username,
            nickname: subject.nickname,
            iss: issuer.to_string(),
            iat,
            nbf: iat,
            exp,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.sub
    }

    pub fn user_uuid(&self) -> UserUuid {
        self.uuid
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn issuer(&self) -> &str {
        &self.iss
    }

    pub fn issued_at(&self) -> i64 {
        self.iat
    }

    pub fn not_before(&self) -> i64 {
        self.nbf
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }

    /// The subject this token was issued for, with its role.
    pub fn subject(&self) -> Subject {
        Subject {
            user_id: self.sub,
            user_uuid: self.uuid,
            role: self.role.clone(),
            username: self.username.clone(),
            nickname: self.nickname.clone(),
        }
    }

    /// Check the validity window at `now`.
    ///
    /// A window with `exp <= iat` can only come from a token we did not mint
    /// and is reported as malformed.
    pub fn check_window(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if self.exp <= self.iat {
            return Err(AuthError::MalformedToken);
        }
        let now = now.timestamp();
        if now < self.nbf {
            return Err(AuthError::NotYetValid);
        }
        if now >= self.exp {
            return Err(AuthError::Expired);
        }
        Ok(())
    }
}
