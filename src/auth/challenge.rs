//! Challenge generation, sign-in message layout, and challenge extraction.

use crate::auth::verify::validate_address;
use crate::error::AuthError;
use crate::models::{Chain, Challenge};
use crate::storage::ChallengeStore;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::TryRngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use std::time::Duration;

/// Marker preceding the challenge value in the sign-in message.
pub const NONCE_MARKER: &str = "Nonce: ";

/// Random bytes per challenge value (256 bits).
pub const CHALLENGE_BYTES: usize = 32;

/// Generate a cryptographically random challenge value.
///
/// Returns a base64url string without padding (43 characters) from 32 bytes
/// of OS randomness. The alphabet has no spaces, colons, or newlines, so the
/// value can never contain the marker or a field delimiter.
pub fn generate_challenge_value() -> Result<String, AuthError> {
    let mut bytes = [0u8; CHALLENGE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Store(format!("Random source failure: {}", e)))?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render the human-readable message the wallet is asked to sign.
pub fn build_sign_message(app_name: &str, challenge: &Challenge) -> String {
    format!(
        "Sign in to {}\nAddress: {}\n{}{}\nIssued At: {}\nExpiration Time: {}",
        app_name,
        challenge.address,
        NONCE_MARKER,
        challenge.value,
        rfc3339(challenge.issued_at),
        rfc3339(challenge.expires_at),
    )
}

/// Locate the challenge value inside a presented message.
///
/// Takes the text after the first marker up to the next newline or the end
/// of the message. Runs before any store or crypto work.
pub fn extract_challenge(message: &str) -> Result<&str, AuthError> {
    let start = message
        .find(NONCE_MARKER)
        .ok_or_else(|| AuthError::MalformedInput("Nonce not found in message".to_string()))?
        + NONCE_MARKER.len();

    let rest = &message[start..];
    let end = rest.find('\n').unwrap_or(rest.len());

    let value = rest[..end].trim();
    if value.is_empty() {
        return Err(AuthError::MalformedInput("Empty nonce".to_string()));
    }

    Ok(value)
}

/// Issues challenges and records them in the challenge store.
#[derive(Clone)]
pub struct ChallengeIssuer {
    store: Arc<dyn ChallengeStore>,
    app_name: String,
    ttl: Duration,
}

impl ChallengeIssuer {
    pub fn new(store: Arc<dyn ChallengeStore>, app_name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            app_name: app_name.into(),
            ttl,
        }
    }

    /// Issue a fresh challenge for `address`, superseding any live one.
    ///
    /// The record is persisted before the message is returned.
    pub async fn issue(&self, chain: Chain, address: &str) -> Result<String, AuthError> {
        validate_address(chain, address)?;

        let value = generate_challenge_value()?;
        let issued_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthError::Configuration(format!("Invalid challenge TTL: {}", e)))?;

        let challenge = Challenge {
            value,
            address: address.to_string(),
            chain,
            issued_at,
            expires_at: issued_at + ttl,
        };

        self.store.put(&challenge).await?;

        tracing::info!(action = "challenge_issued", chain = %chain, address = %address, "Challenge issued");

        Ok(build_sign_message(&self.app_name, &challenge))
    }
}
