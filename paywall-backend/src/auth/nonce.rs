//! Single-use handshake nonces.

use base64::Engine;
use moka::sync::Cache;
use rand::RngCore;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Upper bound on outstanding nonces; older entries are evicted first.
const MAX_OUTSTANDING_NONCES: u64 = 100_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedNonce {
    pub nonce: String,
    pub expires_in: u64,
}

#[derive(Clone)]
struct NonceEntry {
    owner: String,
    issued_at: Instant,
}

/// Nonces issued per identity key, expiring after a fixed TTL.
pub struct NonceStore {
    cache: Cache<String, NonceEntry>,
    ttl: Duration,
    ttl_secs: u64,
}

impl NonceStore {
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        let cache = Cache::builder()
            .max_capacity(MAX_OUTSTANDING_NONCES)
            .time_to_live(ttl)
            .build();
        Self { cache, ttl, ttl_secs }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a fresh nonce bound to `identity_key`.
    pub fn issue(&self, identity_key: &str) -> IssuedNonce {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let nonce = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.cache.insert(
            nonce.clone(),
            NonceEntry {
                owner: identity_key.to_string(),
                issued_at: Instant::now(),
            },
        );
        IssuedNonce {
            nonce,
            expires_in: self.ttl_secs,
        }
    }

    /// Remove the nonce, returning true only if it was live and bound to `identity_key`.
    /// A nonce presented with the wrong key is burned as well.
    ///
    /// `remove` can hand back an entry whose TTL has passed but which the
    /// cache has not evicted yet, so the age is checked here too.
    pub fn consume(&self, nonce: &str, identity_key: &str) -> bool {
        match self.cache.remove(nonce) {
            Some(entry) if entry.issued_at.elapsed() >= self.ttl => {
                log::debug!("[auth] Rejecting expired nonce for {}", entry.owner);
                false
            }
            Some(entry) => entry.owner == identity_key,
            None => false,
        }
    }
}
