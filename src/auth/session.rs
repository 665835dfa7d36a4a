//! Session credential minting and validation.

use crate::error::AuthError;
use crate::models::{Chain, SessionClaims};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::Duration;

/// Mints HS256 session tokens bound to an authenticated address.
///
/// Keys and lifetime are fixed at construction; minting touches no shared
/// mutable state and is safe to call concurrently.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "Session signing secret is empty".to_string(),
            ));
        }

        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Configuration("Session TTL out of range".to_string()))?;
        if ttl_secs == 0 {
            return Err(AuthError::Configuration(
                "Session TTL must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        })
    }

    /// Produce a signed token with `sub = address`.
    pub fn mint(&self, chain: Chain, address: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();

        let claims = SessionClaims {
            sub: address.to_string(),
            chain,
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Configuration(format!("Failed to sign token: {}", e)))
    }

    /// Check signature and expiry of a presented token and return its claims.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::SessionInvalid(format!("Invalid token: {}", e)))
    }
}
