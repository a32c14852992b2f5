//! Compact JWS (HS256) encoding of [`Claims`].

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{AuthError, Claims, SigningError};

/// Signs and verifies tokens with a process-wide secret.
///
/// Built once at startup and shared read-only; no locking needed. Rotating
/// the secret means building a new codec, which invalidates every
/// outstanding token.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn hs256(secret: &[u8], issuer: impl Into<String>) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::KeyUnavailable);
        }
        let issuer = issuer.into();

        // Time checks run in `Claims::check_window` against the caller's clock,
        // so the library only verifies signature, algorithm and issuer.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);
        validation.set_issuer(&[issuer.as_str()]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, SigningError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| SigningError::Encode(e.to_string()))
    }

    /// Verify `token` and return its claims if valid at `now`.
    ///
    /// The signature is checked (constant-time MAC comparison) before the
    /// payload is deserialized, so an unsigned payload is never parsed.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        data.claims.check_window(now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::tests::subject;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn codec() -> TokenCodec {
        TokenCodec::hs256(b"unit-test-secret", "warden").unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
    }

    fn claims(ttl: i64) -> Claims {
        Claims::new(subject(7, "viewer"), "warden", t0(), ttl).unwrap()
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert_eq!(
            TokenCodec::hs256(b"", "warden").unwrap_err(),
            SigningError::KeyUnavailable
        );
    }

    #[test]
    fn decode_returns_the_encoded_claims() {
        let codec = codec();
        let c = claims(3600);
        let token = codec.encode(&c).unwrap();
        assert_eq!(codec.decode(&token, t0()).unwrap(), c);
    }

    #[test]
    fn expiry_and_not_before_are_enforced() {
        let codec = codec();
        let token = codec.encode(&claims(60)).unwrap();

        assert_eq!(
            codec.decode(&token, t0() + Duration::seconds(60)),
            Err(AuthError::Expired)
        );
        assert_eq!(
            codec.decode(&token, t0() - Duration::seconds(1)),
            Err(AuthError::NotYetValid)
        );
    }

    #[test]
    fn foreign_secret_fails_signature_check() {
        let token = codec().encode(&claims(60)).unwrap();
        let other = TokenCodec::hs256(b"some-other-secret", "warden").unwrap();
        assert_eq!(other.decode(&token, t0()), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let c = Claims::new(subject(7, "viewer"), "someone-else", t0(), 60).unwrap();
        let token = codec().encode(&c).unwrap();
        assert_eq!(codec().decode(&token, t0()), Err(AuthError::MalformedToken));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        assert_eq!(codec.decode("", t0()), Err(AuthError::MalformedToken));
        assert_eq!(codec.decode("a.b", t0()), Err(AuthError::MalformedToken));
        assert_eq!(
            codec.decode("not-a-token-at-all", t0()),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn unsigned_token_is_rejected() {
        // Same header/payload, algorithm "none" and empty signature.
        let token = codec().encode(&claims(60)).unwrap();
        let mut parts = token.split('.');
        let payload = parts.nth(1).unwrap();
        let none_header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let forged = format!("{none_header}.{payload}.");
        assert!(codec().decode(&forged, t0()).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: flipping any single bit of a token never yields a valid token.
        #[test]
        fn single_bit_flip_never_verifies(pos in any::<prop::sample::Index>(), bit in 0u8..7) {
            let codec = codec();
            let token = codec.encode(&claims(3600)).unwrap();
            let mut bytes = token.into_bytes();
            let i = pos.index(bytes.len());
            bytes[i] ^= 1 << bit;

            // Tokens are ASCII; a flip in bits 0..7 keeps them ASCII.
            let tampered = String::from_utf8(bytes).unwrap();
            let err = codec.decode(&tampered, t0()).unwrap_err();
            prop_assert!(
                matches!(err, AuthError::InvalidSignature | AuthError::MalformedToken),
                "unexpected error {err:?}"
            );
        }

        /// Property: any instant at or past expiry is rejected as expired.
        #[test]
        fn decode_after_expiry_is_expired(ttl in 1i64..100_000, late in 0i64..1_000_000) {
            let codec = codec();
            let token = codec.encode(&claims(ttl)).unwrap();
            let at = t0() + Duration::seconds(ttl + late);
            prop_assert_eq!(codec.decode(&token, at), Err(AuthError::Expired));
        }

        /// Property: round trip holds anywhere inside the validity window.
        #[test]
        fn round_trip_inside_window(ttl in 1i64..100_000, offset in 0i64..100_000) {
            prop_assume!(offset < ttl);
            let codec = codec();
            let c = claims(ttl);
            let token = codec.encode(&c).unwrap();
            prop_assert_eq!(codec.decode(&token, t0() + Duration::seconds(offset)), Ok(c));
        }
    }
}
