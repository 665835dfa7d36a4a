//! In-process challenge store.
//!
//! One mutex guards both maps, so every operation is a single critical
//! section. Suitable for a single instance and for tests.

use super::ChallengeStore;
use crate::error::AuthError;
use crate::models::{Challenge, Chain, ConsumeOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    /// challenge value -> record
    by_value: HashMap<String, Challenge>,
    /// (chain, canonical address) -> live challenge value
    by_address: HashMap<(Chain, String), String>,
}

#[derive(Default)]
pub struct MemoryChallengeStore {
    inner: Mutex<Inner>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AuthError> {
        self.inner
            .lock()
            .map_err(|_| AuthError::Store("Challenge store lock poisoned".to_string()))
    }

    /// Look up a record without consuming it.
    pub fn get(&self, value: &str) -> Option<Challenge> {
        self.lock().ok()?.by_value.get(value).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.by_value.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn remove(&mut self, value: &str) -> Option<Challenge> {
        let challenge = self.by_value.remove(value)?;
        let index_key = (
            challenge.chain,
            challenge.chain.canonical_address(&challenge.address),
        );
        if self.by_address.get(&index_key).map(String::as_str) == Some(value) {
            self.by_address.remove(&index_key);
        }
        Some(challenge)
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(&self, challenge: &Challenge) -> Result<(), AuthError> {
        let mut inner = self.lock()?;

        let index_key = (
            challenge.chain,
            challenge.chain.canonical_address(&challenge.address),
        );
        if let Some(previous) = inner.by_address.insert(index_key, challenge.value.clone()) {
            inner.by_value.remove(&previous);
        }
        inner
            .by_value
            .insert(challenge.value.clone(), challenge.clone());

        Ok(())
    }

    async fn consume_if_matches(
        &self,
        value: &str,
        claimed_address: &str,
        chain: Chain,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, AuthError> {
        let mut inner = self.lock()?;

        let Some(challenge) = inner.by_value.get(value) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        if challenge.is_expired(now) {
            inner.remove(value);
            return Ok(ConsumeOutcome::Expired);
        }

        if challenge.chain != chain || !chain.addresses_match(&challenge.address, claimed_address) {
            return Ok(ConsumeOutcome::AddressMismatch);
        }

        inner.remove(value);
        Ok(ConsumeOutcome::Consumed)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AuthError> {
        let mut inner = self.lock()?;

        let expired: Vec<String> = inner
            .by_value
            .values()
            .filter(|c| c.is_expired(now))
            .map(|c| c.value.clone())
            .collect();

        for value in &expired {
            inner.remove(value);
        }

        Ok(expired.len())
    }
}
