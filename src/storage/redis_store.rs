//! Redis challenge store.
//!
//! Redis key patterns:
//! - `challenge:{value}`: challenge record (HASH: address, chain, issued_at, expires_at, index)
//! - `challenge_addr:{chain}:{canonical address}`: live challenge value for an address (STRING)
//!
//! Timestamps are Unix milliseconds. Both keys carry a PX TTL matching the
//! challenge window, so Redis drops abandoned challenges on its own; the
//! periodic sweep and the expiry check inside the consume script cover the
//! gap between `expires_at` and Redis evicting the key.
//!
//! Every mutation is one Lua script, so it executes as a single step on the
//! server no matter how many application instances share the database.

use super::{ChallengeStore, scan_keys};
use crate::error::AuthError;
use crate::models::{Challenge, Chain, ConsumeOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;

const CHALLENGE_PREFIX: &str = "challenge:";
const ADDRESS_PREFIX: &str = "challenge_addr:";

/// Upsert keyed by address: drop the previous challenge, write the new one.
const PUT_SCRIPT: &str = r"
local prev = redis.call('GET', KEYS[1])
if prev then
    redis.call('DEL', ARGV[7] .. prev)
end
redis.call('HSET', KEYS[2],
    'address', ARGV[2],
    'chain', ARGV[3],
    'issued_at', ARGV[4],
    'expires_at', ARGV[5],
    'index', KEYS[1])
redis.call('PEXPIRE', KEYS[2], ARGV[6])
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[6])
return 1
";

/// Returns 1 consumed, 0 not found, -1 address mismatch, -2 expired.
const CONSUME_SCRIPT: &str = r"
local rec = redis.call('HMGET', KEYS[1], 'address', 'chain', 'expires_at', 'index')
if not rec[1] then
    return 0
end

local function drop()
    redis.call('DEL', KEYS[1])
    if rec[4] and redis.call('GET', rec[4]) == ARGV[5] then
        redis.call('DEL', rec[4])
    end
end

if tonumber(rec[3]) <= tonumber(ARGV[3]) then
    drop()
    return -2
end

if rec[2] ~= ARGV[2] then
    return -1
end

local stored = rec[1]
local claimed = ARGV[1]
if ARGV[4] == '1' then
    stored = string.lower(stored)
    claimed = string.lower(claimed)
end
if stored ~= claimed then
    return -1
end

drop()
return 1
";

/// Delete one record if it is past its expiry. Returns 1 if deleted.
const SWEEP_SCRIPT: &str = r"
local exp = redis.call('HGET', KEYS[1], 'expires_at')
if exp and tonumber(exp) <= tonumber(ARGV[1]) then
    local idx = redis.call('HGET', KEYS[1], 'index')
    redis.call('DEL', KEYS[1])
    if idx and redis.call('GET', idx) == ARGV[2] then
        redis.call('DEL', idx)
    end
    return 1
end
return 0
";

fn challenge_key(value: &str) -> String {
    format!("{}{}", CHALLENGE_PREFIX, value)
}

fn address_key(chain: Chain, address: &str) -> String {
    format!(
        "{}{}:{}",
        ADDRESS_PREFIX,
        chain.as_str(),
        chain.canonical_address(address)
    )
}

fn case_insensitive_flag(chain: Chain) -> &'static str {
    match chain {
        Chain::Solana => "0",
        Chain::Ethereum => "1",
    }
}

#[derive(Clone)]
pub struct RedisChallengeStore {
    con: MultiplexedConnection,
    put_script: redis::Script,
    consume_script: redis::Script,
    sweep_script: redis::Script,
}

impl RedisChallengeStore {
    pub fn new(con: MultiplexedConnection) -> Self {
        Self {
            con,
            put_script: redis::Script::new(PUT_SCRIPT),
            consume_script: redis::Script::new(CONSUME_SCRIPT),
            sweep_script: redis::Script::new(SWEEP_SCRIPT),
        }
    }

    /// Open a multiplexed connection and wrap it.
    pub async fn connect(redis_url: &str) -> Result<Self, AuthError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AuthError::Configuration(format!("Invalid Redis URL: {}", e)))?;
        let con = client.get_multiplexed_async_connection().await?;
        Ok(Self::new(con))
    }
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put(&self, challenge: &Challenge) -> Result<(), AuthError> {
        let mut con = self.con.clone();

        let ttl_ms = (challenge.expires_at - Utc::now()).num_milliseconds().max(1);

        let _: i64 = self
            .put_script
            .key(address_key(challenge.chain, &challenge.address))
            .key(challenge_key(&challenge.value))
            .arg(&challenge.value)
            .arg(&challenge.address)
            .arg(challenge.chain.as_str())
            .arg(challenge.issued_at.timestamp_millis())
            .arg(challenge.expires_at.timestamp_millis())
            .arg(ttl_ms)
            .arg(CHALLENGE_PREFIX)
            .invoke_async(&mut con)
            .await?;

        Ok(())
    }

    async fn consume_if_matches(
        &self,
        value: &str,
        claimed_address: &str,
        chain: Chain,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, AuthError> {
        let mut con = self.con.clone();

        let code: i64 = self
            .consume_script
            .key(challenge_key(value))
            .arg(claimed_address)
            .arg(chain.as_str())
            .arg(now.timestamp_millis())
            .arg(case_insensitive_flag(chain))
            .arg(value)
            .invoke_async(&mut con)
            .await?;

        match code {
            1 => Ok(ConsumeOutcome::Consumed),
            0 => Ok(ConsumeOutcome::NotFound),
            -1 => Ok(ConsumeOutcome::AddressMismatch),
            -2 => Ok(ConsumeOutcome::Expired),
            other => Err(AuthError::Store(format!(
                "Unexpected consume script result: {}",
                other
            ))),
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AuthError> {
        let mut con = self.con.clone();

        let keys = scan_keys(&mut con, &format!("{}*", CHALLENGE_PREFIX)).await?;
        let now_ms = now.timestamp_millis();

        let mut removed = 0;
        for key in &keys {
            let value = key.strip_prefix(CHALLENGE_PREFIX).unwrap_or(key);
            let deleted: i64 = self
                .sweep_script
                .key(key)
                .arg(now_ms)
                .arg(value)
                .invoke_async(&mut con)
                .await?;
            if deleted == 1 {
                removed += 1;
            }
        }

        Ok(removed)
    }
}
