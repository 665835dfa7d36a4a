//! Error taxonomy for the authentication core.
//!
//! Every per-request failure carries an internal reason for logging, but the
//! text handed back to an external caller is the same for all of them so a
//! client cannot tell a wrong address from a wrong signature or a stale nonce.

/// Generic text returned to callers for any rejected authentication attempt.
pub const REJECTED_MESSAGE: &str = "Authentication failed";

/// Generic text returned to callers for infrastructure failures.
pub const INTERNAL_MESSAGE: &str = "Internal error";

/// Authentication error types.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad address or signature encoding, wrong lengths, missing challenge marker.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Challenge not found, expired, already consumed, or bound to another address.
    #[error("Challenge invalid: {0}")]
    ChallengeInvalid(String),

    /// Well-formed signature that does not prove authorship.
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Presented session token is forged, malformed, or expired.
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Signing or store misconfiguration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Challenge store unreachable or returned garbage.
    #[error("Store error: {0}")]
    Store(String),
}

impl AuthError {
    /// Stage tag for internal logging.
    pub fn stage(&self) -> &'static str {
        match self {
            AuthError::MalformedInput(_) => "malformed_input",
            AuthError::ChallengeInvalid(_) => "challenge_invalid",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::SessionInvalid(_) => "session_invalid",
            AuthError::Configuration(_) => "configuration",
            AuthError::Store(_) => "store",
        }
    }

    /// True for failures caused by the request rather than by the server.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedInput(_)
                | AuthError::ChallengeInvalid(_)
                | AuthError::SignatureInvalid(_)
                | AuthError::SessionInvalid(_)
        )
    }

    /// Message safe to show an external caller.
    pub fn public_message(&self) -> &'static str {
        if self.is_rejection() {
            REJECTED_MESSAGE
        } else {
            // Log detailed error server-side, return generic message to client
            tracing::error!(stage = self.stage(), error = %self, "Internal authentication error");
            INTERNAL_MESSAGE
        }
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Store(format!("Redis error: {}", err))
    }
}
