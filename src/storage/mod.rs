//! Challenge storage.
//!
//! `ChallengeStore` is the seam between the authentication flow and the
//! backing store. Every mutation must be atomic inside the store itself so
//! that several server instances can share one store.

pub mod memory;
pub mod redis_store;

use crate::error::AuthError;
use crate::models::{Challenge, Chain, ConsumeOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;

pub use memory::MemoryChallengeStore;
pub use redis_store::RedisChallengeStore;

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert `challenge`, replacing any challenge bound to the same address.
    async fn put(&self, challenge: &Challenge) -> Result<(), AuthError>;

    /// Atomically look up `value`, check expiry and the bound address, and
    /// delete the record on a match.
    ///
    /// Of any number of concurrent calls for one value at most one returns
    /// `Consumed`.
    async fn consume_if_matches(
        &self,
        value: &str,
        claimed_address: &str,
        chain: Chain,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, AuthError>;

    /// Delete every challenge whose `expires_at` is not after `now`.
    ///
    /// Returns the number of records removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AuthError>;
}

/// Maximum number of keys returned by scan_keys to prevent unbounded memory allocation.
const SCAN_MAX_KEYS: usize = 10_000;

/// Scan for Redis keys matching a pattern using SCAN (non-blocking).
///
/// Unlike KEYS, SCAN does not block the Redis server during iteration.
/// Capped at SCAN_MAX_KEYS results to prevent unbounded memory growth.
pub async fn scan_keys<C>(con: &mut C, pattern: &str) -> Result<Vec<String>, redis::RedisError>
where
    C: AsyncCommands,
{
    let mut all_keys = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(100)
            .query_async(con)
            .await?;
        all_keys.extend(keys);
        if all_keys.len() >= SCAN_MAX_KEYS {
            all_keys.truncate(SCAN_MAX_KEYS);
            break;
        }
        cursor = new_cursor;
        if cursor == 0 {
            break;
        }
    }
    Ok(all_keys)
}
