//! Stateless bearer tokens
//!
//! HS256 JWTs carrying `{sub, role, iat, exp}`. There is no refresh flow, no
//! rotation and no revocation list: a token stays valid until `exp` even if the
//! principal changes their password.

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};
use crate::ids::{Clock, SystemClock};
use crate::models::Role;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject_id: Uuid,
    pub role: Role,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: i64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self::with_clock(secret, ttl_hours, Arc::new(SystemClock))
    }

    /// `clock` only drives `iat`/`exp`; expiry is checked against wall time
    pub fn with_clock(secret: &str, ttl_hours: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
            clock,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_hours)
    }

    pub fn issue(&self, subject_id: Uuid, role: Role) -> Result<IssuedToken> {
        let issued_at = self.clock.now();
        let expires_at = Duration::try_hours(self.ttl_hours)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                IdentityError::Token(format!(
                    "token lifetime of {} hours is out of range",
                    self.ttl_hours
                ))
            })?;

        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| IdentityError::Token(e.to_string()))?;

        Ok(IssuedToken {
            token,
            // exp has second precision on the wire
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            IdentityError::InvalidToken
        })?;

        let subject_id =
            Uuid::parse_str(&data.claims.sub).map_err(|_| IdentityError::InvalidToken)?;

        Ok(VerifiedToken {
            subject_id,
            role: data.claims.role,
        })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_hours", &self.ttl_hours)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::FixedClock;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_issue_then_verify_round_trips() {
        let tokens = TokenService::new(SECRET, 168);
        let subject = Uuid::new_v4();

        let issued = tokens.issue(subject, Role::Doctor).unwrap();
        let verified = tokens.verify(&issued.token).unwrap();

        assert_eq!(verified.subject_id, subject);
        assert_eq!(verified.role, Role::Doctor);
        assert!(issued.expires_at > Utc::now() + Duration::hours(167));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let tokens = TokenService::new(SECRET, 168);
        let issued = tokens.issue(Uuid::new_v4(), Role::Patient).unwrap();

        let (unsigned, signature) = issued.token.rsplit_once('.').unwrap();
        let flipped = if signature.starts_with('A') { "B" } else { "A" };
        let rest: String = signature.chars().skip(1).collect();
        let tampered = format!("{unsigned}.{flipped}{rest}");

        assert!(matches!(tokens.verify(&tampered), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let issued = TokenService::new("other-secret", 168)
            .issue(Uuid::new_v4(), Role::Patient)
            .unwrap();
        let tokens = TokenService::new(SECRET, 168);
        assert!(matches!(tokens.verify(&issued.token), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let eight_days_ago = Utc::now() - Duration::days(8);
        let tokens = TokenService::with_clock(SECRET, 168, Arc::new(FixedClock(eight_days_ago)));

        let issued = tokens.issue(Uuid::new_v4(), Role::Patient).unwrap();
        assert!(issued.expires_at < Utc::now());
        assert!(matches!(tokens.verify(&issued.token), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let config = IdentityConfig {
            token_ttl_hours: 1_000_000_000_000,
            ..Default::default()
        };
        let err = TokenService::from_config(&config)
            .issue(Uuid::new_v4(), Role::Patient)
            .unwrap_err();
        assert!(matches!(err, IdentityError::Token(_)));

        let huge = TokenService::new(SECRET, i64::MAX);
        assert!(matches!(huge.issue(Uuid::new_v4(), Role::Doctor), Err(IdentityError::Token(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = TokenService::new(SECRET, 168);
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());
    }
}
