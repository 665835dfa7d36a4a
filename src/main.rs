//! walletauth maintenance binary.
//!
//! - `walletauth` / `walletauth sweeper`: load config, connect to Redis, and
//!   sweep expired challenges on the configured interval.
//! - `walletauth keygen <solana|ethereum>`: print a throwaway keypair for
//!   exercising the sign-in flow by hand.

use std::sync::Arc;
use walletauth::{
    auth::verify::eth_address_from_key,
    cleanup,
    config::Config,
    models::Chain,
    storage::{ChallengeStore, RedisChallengeStore},
};

/// Generate a development keypair. Returns (address, hex secret).
fn keygen(chain: Chain) -> Result<(String, String), String> {
    let mut seed = [0u8; 32];
    rand::fill(&mut seed);

    let keypair = match chain {
        Chain::Solana => {
            let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
            let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
            (address, hex::encode(seed))
        }
        Chain::Ethereum => {
            let signing_key = k256::ecdsa::SigningKey::from_slice(&seed)
                .map_err(|e| format!("secp256k1 key: {}", e))?;
            (eth_address_from_key(signing_key.verifying_key()), hex::encode(seed))
        }
    };

    // Zero the seed
    seed.fill(0);

    Ok(keypair)
}

fn print_keygen_usage() {
    eprintln!("Usage: walletauth keygen <solana|ethereum>");
    eprintln!();
    eprintln!("Print a fresh development keypair (address and hex secret).");
    eprintln!("Never use these keys for real funds.");
}

async fn run_sweeper() {
    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(config = ?config, "Starting challenge sweeper");

    let store = RedisChallengeStore::connect(&config.redis_url)
        .await
        .expect("Failed to connect to Redis");
    let store: Arc<dyn ChallengeStore> = Arc::new(store);

    tokio::select! {
        _ = cleanup::run_sweep_loop(store, config.sweep_interval()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down sweeper");
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Check for keygen subcommand
    if args.len() >= 2 && args[1] == "keygen" {
        let chain = match args.get(2).map(|s| s.parse::<Chain>()) {
            Some(Ok(chain)) if args.len() == 3 => chain,
            _ => {
                print_keygen_usage();
                std::process::exit(1);
            }
        };

        match keygen(chain) {
            Ok((address, secret)) => {
                println!("address: {}", address);
                println!("secret:  {}", secret);
            }
            Err(e) => {
                eprintln!("Error generating keypair: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.len() >= 2 && args[1] != "sweeper" {
        eprintln!("Unknown command: {}", args[1]);
        eprintln!("Usage: walletauth [sweeper | keygen <solana|ethereum>]");
        std::process::exit(1);
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    run_sweeper().await;
}
