//! Wallet authentication: challenge issuance, signature verification, and session minting.

pub mod challenge;
pub mod flow;
pub mod session;
pub mod verify;

pub use challenge::{ChallengeIssuer, NONCE_MARKER, extract_challenge, generate_challenge_value};
pub use flow::Authenticator;
pub use session::SessionIssuer;
pub use verify::{validate_address, verify_signature};
