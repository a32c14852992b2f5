use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{Claims, Role, SigningError, Subject, TokenCodec};

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> i64 {
        self.claims.expires_at()
    }
}

/// Mints tokens with the configured lifetime.
///
/// The TTL is fixed at construction; callers cannot request longer-lived
/// tokens. Two calls at different instants yield different tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        Self { codec, ttl_secs }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn issue(&self, subject: Subject, now: DateTime<Utc>) -> Result<IssuedToken, SigningError> {
        let claims = Claims::new(subject, self.codec.issuer(), now, self.ttl_secs)
            .ok_or_else(|| SigningError::Encode("token lifetime out of range".to_string()))?;
        let token = self.codec.encode(&claims)?;

        tracing::debug!(
            user_id = %claims.user_id(),
            role = %claims.role(),
            expires_at = claims.expires_at(),
            "issued token"
        );

        Ok(IssuedToken { token, claims })
    }

    /// Issue a new token for the same subject acting as `role`.
    ///
    /// `previous` is left untouched; it stays valid until its own expiry.
    pub fn reissue_with_role(
        &self,
        previous: &Claims,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, SigningError> {
        let subject = Subject {
            role,
            ..previous.subject()
        };
        self.issue(subject, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;
    use crate::claims::tests::subject;
    use chrono::TimeZone;

    fn issuer(ttl: Duration) -> TokenIssuer {
        let codec = TokenCodec::hs256(b"issuer-test-secret", "warden").unwrap();
        TokenIssuer::new(Arc::new(codec), ttl)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn viewer_token_expires_after_one_hour() {
        let issuer = issuer(Duration::from_secs(3600));
        let issued = issuer.issue(subject(7, "viewer"), t0()).unwrap();

        let claims = issuer.codec().decode(&issued.token, t0()).unwrap();
        assert_eq!(claims.user_id().get(), 7);
        assert_eq!(claims.role().as_str(), "viewer");
        assert_eq!(claims.issued_at(), t0().timestamp());
        assert_eq!(claims.not_before(), t0().timestamp());
        assert_eq!(claims.expires_at(), t0().timestamp() + 3600);

        let later = t0() + chrono::Duration::seconds(3601);
        assert_eq!(
            issuer.codec().decode(&issued.token, later),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn issuing_at_different_instants_differs() {
        let issuer = issuer(Duration::from_secs(60));
        let s = subject(1, "admin");
        let a = issuer.issue(s.clone(), t0()).unwrap();
        let b = issuer
            .issue(s, t0() + chrono::Duration::seconds(1))
            .unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(b.expires_at() - a.expires_at(), 1);
    }

    #[test]
    fn reissue_keeps_subject_and_changes_role_only() {
        let issuer = issuer(Duration::from_secs(600));
        let old = issuer.issue(subject(3, "admin"), t0()).unwrap();
        let later = t0() + chrono::Duration::seconds(30);
        let new = issuer
            .reissue_with_role(&old.claims, Role::new("editor"), later)
            .unwrap();

        assert_eq!(new.claims.role().as_str(), "editor");
        assert_eq!(new.claims.user_id(), old.claims.user_id());
        assert_eq!(new.claims.user_uuid(), old.claims.user_uuid());
        assert_eq!(new.claims.issued_at(), later.timestamp());
        // The old claims are a separate value and still say admin.
        assert_eq!(old.claims.role().as_str(), "admin");
    }

    #[test]
    fn zero_ttl_is_clamped_to_one_second() {
        let issuer = issuer(Duration::ZERO);
        assert_eq!(issuer.ttl_secs(), 1);
    }
}
