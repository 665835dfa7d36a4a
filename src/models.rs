//! Data models for challenges, sessions, and the caller-facing request shapes.
//!
//! All models use serde for serialization/deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Chain Variants
// ============================================================================

/// Supported address/signature ecosystems.
///
/// The set is closed: a new ecosystem is a new variant plus a new arm in each
/// match, never a change to an existing arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Ed25519 keys, base58 addresses.
    Solana,
    /// secp256k1 ECDSA with public-key recovery, hex addresses.
    Ethereum,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
        }
    }

    /// Form of the address used as the per-address upsert key.
    ///
    /// Base58 is case-significant; hex addresses are folded to lower case.
    pub fn canonical_address(&self, address: &str) -> String {
        match self {
            Chain::Solana => address.to_string(),
            Chain::Ethereum => address.to_ascii_lowercase(),
        }
    }

    /// Compare two addresses under this chain's casing rule.
    pub fn addresses_match(&self, a: &str, b: &str) -> bool {
        match self {
            Chain::Solana => a == b,
            Chain::Ethereum => a.eq_ignore_ascii_case(b),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solana" => Ok(Chain::Solana),
            "ethereum" => Ok(Chain::Ethereum),
            _ => Err(format!("Unknown chain: {}", s)),
        }
    }
}

// ============================================================================
// Storage Models
// ============================================================================

/// One outstanding authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Unpredictable token the client must echo inside the signed message.
    pub value: String,
    /// Address the challenge is bound to, as the client supplied it.
    pub address: String,
    pub chain: Chain,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// A challenge is dead from `expires_at` onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of an atomic consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Record matched and was deleted.
    Consumed,
    /// Never issued, already consumed, superseded, or swept.
    NotFound,
    /// Record exists but is bound to a different address. Left in place.
    AddressMismatch,
    /// Record was past `expires_at`. Deleted.
    Expired,
}

// ============================================================================
// Session Models
// ============================================================================

/// Claims carried by a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated address.
    pub sub: String,
    pub chain: Chain,
    pub iat: i64,
    pub exp: i64,
}

// ============================================================================
// Auth Models
// ============================================================================

/// Request for an authentication challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeRequest {
    pub chain: Chain,
    pub address: String,
}

/// Message the client must sign.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeResponse {
    pub message: String,
}

/// Request to verify a signed challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub chain: Chain,
    pub address: String,
    /// Exact text that was signed.
    pub message: String,
    /// hex for both chains, optional `0x` prefix
    pub signature: String,
}

/// Response after successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub token: String,
    pub address: String,
}
