//! End-to-end tests for the wallet sign-in flow.
//!
//! Every scenario runs against the in-memory store. The Redis variants need a
//! running Redis instance (default: redis://127.0.0.1:6379, override with
//! REDIS_URL) and skip themselves when it is not reachable.

use ed25519_dalek::{Signer, SigningKey};
use std::sync::Arc;
use std::time::Duration;
use walletauth::auth::verify::{eth_address_from_key, eth_message_hash};
use walletauth::auth::{Authenticator, ChallengeIssuer, SessionIssuer};
use walletauth::config::Config;
use walletauth::error::{AuthError, REJECTED_MESSAGE};
use walletauth::models::{ChallengeRequest, Chain, VerifyRequest};
use walletauth::storage::{ChallengeStore, MemoryChallengeStore, RedisChallengeStore};
use zeroize::Zeroizing;

const SECRET: &str = "integration-secret-integration-secret";

/// Helper to get Redis URL from environment or use default.
fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn test_config() -> Config {
    Config {
        jwt_secret: Zeroizing::new(SECRET.to_string()),
        redis_url: redis_url(),
        app_name: "WalletAuth".to_string(),
        challenge_ttl_secs: 300,
        session_ttl_secs: 900,
        sweep_interval_secs: 60,
    }
}

fn memory_authenticator() -> Authenticator {
    let store: Arc<dyn ChallengeStore> = Arc::new(MemoryChallengeStore::new());
    Authenticator::from_config(&test_config(), store).expect("valid config")
}

async fn redis_authenticator() -> Option<Authenticator> {
    match RedisChallengeStore::connect(&redis_url()).await {
        Ok(store) => {
            let store: Arc<dyn ChallengeStore> = Arc::new(store);
            Some(Authenticator::from_config(&test_config(), store).expect("valid config"))
        }
        Err(_) => {
            eprintln!("Skipping test: Redis not available");
            None
        }
    }
}

/// Wallet key for either chain.
enum Wallet {
    Solana(SigningKey),
    Ethereum(k256::ecdsa::SigningKey),
}

impl Wallet {
    fn generate(chain: Chain) -> Self {
        let mut seed = [0u8; 32];
        rand::fill(&mut seed);
        match chain {
            Chain::Solana => Wallet::Solana(SigningKey::from_bytes(&seed)),
            Chain::Ethereum => {
                Wallet::Ethereum(k256::ecdsa::SigningKey::from_slice(&seed).expect("valid scalar"))
            }
        }
    }

    fn chain(&self) -> Chain {
        match self {
            Wallet::Solana(_) => Chain::Solana,
            Wallet::Ethereum(_) => Chain::Ethereum,
        }
    }

    fn address(&self) -> String {
        match self {
            Wallet::Solana(key) => bs58::encode(key.verifying_key().as_bytes()).into_string(),
            Wallet::Ethereum(key) => eth_address_from_key(key.verifying_key()),
        }
    }

    fn sign(&self, message: &str) -> String {
        match self {
            Wallet::Solana(key) => hex::encode(key.sign(message.as_bytes()).to_bytes()),
            Wallet::Ethereum(key) => {
                let hash = eth_message_hash(message.as_bytes());
                let (sig, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();
                let mut bytes = sig.to_bytes().to_vec();
                bytes.push(27 + recovery_id.to_byte());
                format!("0x{}", hex::encode(bytes))
            }
        }
    }
}

async fn request_message(auth: &Authenticator, wallet: &Wallet) -> String {
    auth.issue_challenge(&ChallengeRequest {
        chain: wallet.chain(),
        address: wallet.address(),
    })
    .await
    .expect("challenge issued")
    .message
}

fn signed_request(wallet: &Wallet, signer: &Wallet, message: &str) -> VerifyRequest {
    VerifyRequest {
        chain: wallet.chain(),
        address: wallet.address(),
        message: message.to_string(),
        signature: signer.sign(message),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

async fn sign_in_returns_session_for_address(auth: &Authenticator, chain: Chain) {
    let wallet = Wallet::generate(chain);

    let message = request_message(auth, &wallet).await;
    assert!(message.contains("Nonce: "));
    assert!(message.contains(&wallet.address()));

    let resp = auth
        .authenticate(&signed_request(&wallet, &wallet, &message))
        .await
        .expect("authenticated");

    assert_eq!(resp.address, wallet.address());
    let claims = auth.sessions().validate(&resp.token).unwrap();
    assert_eq!(claims.sub, wallet.address());
    assert_eq!(claims.chain, chain);
}

async fn wrong_key_burns_challenge(auth: &Authenticator, chain: Chain) {
    let wallet = Wallet::generate(chain);
    let impostor = Wallet::generate(chain);

    let message = request_message(auth, &wallet).await;

    let err = auth
        .authenticate(&signed_request(&wallet, &impostor, &message))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SignatureInvalid(_)));
    assert_eq!(err.public_message(), REJECTED_MESSAGE);

    let err = auth
        .authenticate(&signed_request(&wallet, &wallet, &message))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ChallengeInvalid(_)));
    assert_eq!(err.public_message(), REJECTED_MESSAGE);
}

async fn replay_is_rejected(auth: &Authenticator, chain: Chain) {
    let wallet = Wallet::generate(chain);
    let message = request_message(auth, &wallet).await;
    let req = signed_request(&wallet, &wallet, &message);

    assert!(auth.authenticate(&req).await.is_ok());
    let err = auth.authenticate(&req).await.unwrap_err();
    assert!(matches!(err, AuthError::ChallengeInvalid(_)));
}

async fn reissue_invalidates_first(auth: &Authenticator, chain: Chain) {
    let wallet = Wallet::generate(chain);
    let first = request_message(auth, &wallet).await;
    let second = request_message(auth, &wallet).await;

    let err = auth
        .authenticate(&signed_request(&wallet, &wallet, &first))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ChallengeInvalid(_)));

    assert!(
        auth.authenticate(&signed_request(&wallet, &wallet, &second))
            .await
            .is_ok()
    );
}

async fn concurrent_sign_in_has_one_winner(auth: &Authenticator, chain: Chain) {
    let wallet = Wallet::generate(chain);
    let message = request_message(auth, &wallet).await;
    let req = signed_request(&wallet, &wallet, &message);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let auth = auth.clone();
            let req = req.clone();
            tokio::spawn(async move { auth.authenticate(&req).await })
        })
        .collect();

    let mut successes = 0;
    let mut consumed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AuthError::ChallengeInvalid(_)) => consumed += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(consumed, 7);
}

// ============================================================================
// In-memory store
// ============================================================================

#[tokio::test]
async fn test_sign_in_solana() {
    sign_in_returns_session_for_address(&memory_authenticator(), Chain::Solana).await;
}

#[tokio::test]
async fn test_sign_in_ethereum() {
    sign_in_returns_session_for_address(&memory_authenticator(), Chain::Ethereum).await;
}

#[tokio::test]
async fn test_wrong_key_burns_challenge() {
    let auth = memory_authenticator();
    wrong_key_burns_challenge(&auth, Chain::Solana).await;
    wrong_key_burns_challenge(&auth, Chain::Ethereum).await;
}

#[tokio::test]
async fn test_replay_rejected() {
    let auth = memory_authenticator();
    replay_is_rejected(&auth, Chain::Solana).await;
    replay_is_rejected(&auth, Chain::Ethereum).await;
}

#[tokio::test]
async fn test_reissue_invalidates_first() {
    let auth = memory_authenticator();
    reissue_invalidates_first(&auth, Chain::Solana).await;
    reissue_invalidates_first(&auth, Chain::Ethereum).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sign_in() {
    let auth = memory_authenticator();
    concurrent_sign_in_has_one_winner(&auth, Chain::Solana).await;
    concurrent_sign_in_has_one_winner(&auth, Chain::Ethereum).await;
}

#[tokio::test]
async fn test_hand_written_message_with_marker() {
    // A message of the form "...Nonce: XYZ..." with the value at the very end
    let store = Arc::new(MemoryChallengeStore::new());
    let store_dyn: Arc<dyn ChallengeStore> = store.clone();
    let auth = Authenticator::new(
        store_dyn.clone(),
        ChallengeIssuer::new(store_dyn, "WalletAuth", Duration::from_secs(300)),
        SessionIssuer::new(SECRET.as_bytes(), Duration::from_secs(900)).unwrap(),
    );
    let wallet = Wallet::generate(Chain::Solana);

    let issued = request_message(&auth, &wallet).await;
    let value = walletauth::auth::extract_challenge(&issued).unwrap().to_string();

    let message = format!("Sign in to WalletAuth Nonce: {}", value);
    let resp = auth
        .authenticate(&signed_request(&wallet, &wallet, &message))
        .await
        .unwrap();
    assert_eq!(
        auth.sessions().validate(&resp.token).unwrap().sub,
        wallet.address()
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_configuration_error() {
    let mut config = test_config();
    config.jwt_secret = Zeroizing::new("short".to_string());

    let store: Arc<dyn ChallengeStore> = Arc::new(MemoryChallengeStore::new());
    let err = Authenticator::from_config(&config, store).err().unwrap();
    assert!(matches!(err, AuthError::Configuration(_)));
    assert!(!err.is_rejection());
}

// ============================================================================
// Redis store
// ============================================================================

#[tokio::test]
async fn test_redis_sign_in_both_chains() {
    let Some(auth) = redis_authenticator().await else { return };
    sign_in_returns_session_for_address(&auth, Chain::Solana).await;
    sign_in_returns_session_for_address(&auth, Chain::Ethereum).await;
}

#[tokio::test]
async fn test_redis_wrong_key_and_replay() {
    let Some(auth) = redis_authenticator().await else { return };
    wrong_key_burns_challenge(&auth, Chain::Solana).await;
    replay_is_rejected(&auth, Chain::Ethereum).await;
    reissue_invalidates_first(&auth, Chain::Solana).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_redis_concurrent_sign_in() {
    let Some(auth) = redis_authenticator().await else { return };
    concurrent_sign_in_has_one_winner(&auth, Chain::Solana).await;
    concurrent_sign_in_has_one_winner(&auth, Chain::Ethereum).await;
}
