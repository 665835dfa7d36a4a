//! Signature verification over the closed set of supported chains.
//!
//! Each arm decodes, length-checks, and verifies on its own. No arm shares
//! decoding helpers with another arm beyond plain hex parsing.

use crate::error::AuthError;
use crate::models::Chain;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey as Ed25519Key};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey as EcdsaKey};
use sha3::{Digest, Keccak256};

const ED25519_PUBKEY_LEN: usize = 32;
const ED25519_SIGNATURE_LEN: usize = 64;

const ETH_ADDRESS_LEN: usize = 20;
const ETH_SIGNATURE_LEN: usize = 65;
const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Verify that `signature` over `message` was produced by the key behind `address`.
///
/// Returns `MalformedInput` for undecodable or wrongly sized input and
/// `SignatureInvalid` for well-formed input that does not verify.
pub fn verify_signature(
    chain: Chain,
    address: &str,
    message: &str,
    signature: &str,
) -> Result<(), AuthError> {
    match chain {
        Chain::Solana => verify_ed25519(address, message.as_bytes(), signature),
        Chain::Ethereum => verify_secp256k1_recovery(address, message.as_bytes(), signature),
    }
}

/// Check that `address` has the shape its chain expects.
pub fn validate_address(chain: Chain, address: &str) -> Result<(), AuthError> {
    match chain {
        Chain::Solana => decode_solana_address(address).map(|_| ()),
        Chain::Ethereum => decode_eth_address(address).map(|_| ()),
    }
}

fn decode_hex(label: &str, input: &str) -> Result<Vec<u8>, AuthError> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(stripped).map_err(|e| AuthError::MalformedInput(format!("Invalid {} hex: {}", label, e)))
}

// ============================================================================
// Ed25519 (Solana)
// ============================================================================

fn decode_solana_address(address: &str) -> Result<[u8; ED25519_PUBKEY_LEN], AuthError> {
    let pubkey_bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| AuthError::MalformedInput(format!("Invalid address base58: {}", e)))?;

    if pubkey_bytes.len() != ED25519_PUBKEY_LEN {
        return Err(AuthError::MalformedInput(format!(
            "Invalid pubkey length: expected {} bytes, got {}",
            ED25519_PUBKEY_LEN,
            pubkey_bytes.len()
        )));
    }

    pubkey_bytes
        .try_into()
        .map_err(|_| AuthError::MalformedInput("Failed to convert pubkey to array".to_string()))
}

fn verify_ed25519(address: &str, message: &[u8], signature: &str) -> Result<(), AuthError> {
    let pubkey_array = decode_solana_address(address)?;

    let signature_bytes = decode_hex("signature", signature)?;
    if signature_bytes.len() != ED25519_SIGNATURE_LEN {
        return Err(AuthError::MalformedInput(format!(
            "Invalid signature length: expected {} bytes, got {}",
            ED25519_SIGNATURE_LEN,
            signature_bytes.len()
        )));
    }

    let signature_array: [u8; ED25519_SIGNATURE_LEN] = signature_bytes
        .try_into()
        .map_err(|_| AuthError::MalformedInput("Failed to convert signature to array".to_string()))?;

    // Not every 32-byte string is a curve point
    let verifying_key = Ed25519Key::from_bytes(&pubkey_array)
        .map_err(|e| AuthError::MalformedInput(format!("Invalid public key: {}", e)))?;

    let signature = Ed25519Signature::from_bytes(&signature_array);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| AuthError::SignatureInvalid("Ed25519 verification failed".to_string()))
}

// ============================================================================
// secp256k1 with recovery (Ethereum)
// ============================================================================

fn decode_eth_address(address: &str) -> Result<[u8; ETH_ADDRESS_LEN], AuthError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| AuthError::MalformedInput("Address must start with 0x".to_string()))?;

    let bytes = hex::decode(hex_part)
        .map_err(|e| AuthError::MalformedInput(format!("Invalid address hex: {}", e)))?;

    bytes.try_into().map_err(|b: Vec<u8>| {
        AuthError::MalformedInput(format!(
            "Invalid address length: expected {} bytes, got {}",
            ETH_ADDRESS_LEN,
            b.len()
        ))
    })
}

/// EIP-191 personal-message hash.
pub fn eth_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(ETH_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Address of a secp256k1 public key: last 20 bytes of Keccak-256 over the
/// uncompressed point without its tag byte.
pub fn eth_address_from_key(key: &EcdsaKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[32 - ETH_ADDRESS_LEN..]))
}

fn verify_secp256k1_recovery(address: &str, message: &[u8], signature: &str) -> Result<(), AuthError> {
    decode_eth_address(address)?;

    let signature_bytes = decode_hex("signature", signature)?;
    if signature_bytes.len() != ETH_SIGNATURE_LEN {
        return Err(AuthError::MalformedInput(format!(
            "Invalid signature length: expected {} bytes, got {}",
            ETH_SIGNATURE_LEN,
            signature_bytes.len()
        )));
    }

    // Wallets emit either 0/1 or 27/28
    let v = match signature_bytes[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        v => {
            return Err(AuthError::MalformedInput(format!("Invalid recovery id: {}", v)));
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| AuthError::MalformedInput(format!("Invalid recovery id: {}", v)))?;

    let signature = EcdsaSignature::from_slice(&signature_bytes[..64])
        .map_err(|e| AuthError::MalformedInput(format!("Invalid signature scalars: {}", e)))?;

    let hash = eth_message_hash(message);

    let recovered = EcdsaKey::recover_from_prehash(&hash, &signature, recovery_id)
        .map_err(|_| AuthError::SignatureInvalid("Public key recovery failed".to_string()))?;

    let recovered_address = eth_address_from_key(&recovered);
    if !Chain::Ethereum.addresses_match(&recovered_address, address) {
        return Err(AuthError::SignatureInvalid(
            "Recovered address does not match".to_string(),
        ));
    }

    Ok(())
}
