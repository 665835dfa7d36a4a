//! The authenticate flow: extract, consume, verify, mint.
//!
//! Stages run in order and the first failure ends the request. A challenge
//! consumed by a request whose signature then fails stays consumed; the
//! client has to ask for a new one.

use crate::auth::challenge::{ChallengeIssuer, extract_challenge};
use crate::auth::session::SessionIssuer;
use crate::auth::verify::verify_signature;
use crate::config::Config;
use crate::error::AuthError;
use crate::models::{
    ChallengeRequest, ChallengeResponse, Chain, ConsumeOutcome, VerifyRequest, VerifyResponse,
};
use crate::storage::ChallengeStore;
use chrono::Utc;
use std::sync::Arc;

/// Entry point for the two operations the core exposes.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn ChallengeStore>,
    challenges: ChallengeIssuer,
    sessions: SessionIssuer,
}

impl Authenticator {
    pub fn new(store: Arc<dyn ChallengeStore>, challenges: ChallengeIssuer, sessions: SessionIssuer) -> Self {
        Self {
            store,
            challenges,
            sessions,
        }
    }

    /// Wire up issuers from process configuration.
    pub fn from_config(config: &Config, store: Arc<dyn ChallengeStore>) -> Result<Self, AuthError> {
        config
            .validate()
            .map_err(|e| AuthError::Configuration(e.to_string()))?;

        let challenges = ChallengeIssuer::new(store.clone(), &config.app_name, config.challenge_ttl());
        let sessions = SessionIssuer::new(config.jwt_secret.as_bytes(), config.session_ttl())?;

        Ok(Self::new(store, challenges, sessions))
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Issue a challenge and return the message the wallet must sign.
    pub async fn issue_challenge(&self, req: &ChallengeRequest) -> Result<ChallengeResponse, AuthError> {
        let message = self.challenges.issue(req.chain, &req.address).await?;
        Ok(ChallengeResponse { message })
    }

    /// Exchange a signed challenge for a session token.
    pub async fn authenticate(&self, req: &VerifyRequest) -> Result<VerifyResponse, AuthError> {
        let result = self.run_stages(req).await;

        match &result {
            Ok(_) => {
                tracing::info!(action = "auth_success", chain = %req.chain, address = %req.address, "Wallet authenticated");
            }
            Err(e) if e.is_rejection() => {
                tracing::warn!(action = "auth_failed", chain = %req.chain, address = %req.address, stage = e.stage(), reason = %e, "Authentication rejected");
            }
            Err(e) => {
                tracing::error!(action = "auth_error", chain = %req.chain, stage = e.stage(), error = %e, "Authentication aborted");
            }
        }

        result
    }

    async fn run_stages(&self, req: &VerifyRequest) -> Result<VerifyResponse, AuthError> {
        let value = extract_challenge(&req.message)?;

        self.consume(value, &req.address, req.chain).await?;

        verify_signature(req.chain, &req.address, &req.message, &req.signature)?;

        let token = self.sessions.mint(req.chain, &req.address)?;

        Ok(VerifyResponse {
            token,
            address: req.address.clone(),
        })
    }

    async fn consume(&self, value: &str, address: &str, chain: Chain) -> Result<(), AuthError> {
        match self
            .store
            .consume_if_matches(value, address, chain, Utc::now())
            .await?
        {
            ConsumeOutcome::Consumed => Ok(()),
            ConsumeOutcome::NotFound => Err(AuthError::ChallengeInvalid(
                "Nonce is invalid or already used".to_string(),
            )),
            ConsumeOutcome::Expired => Err(AuthError::ChallengeInvalid(
                "Nonce has expired".to_string(),
            )),
            ConsumeOutcome::AddressMismatch => Err(AuthError::ChallengeInvalid(
                "Nonce was requested by a different address".to_string(),
            )),
        }
    }
}
