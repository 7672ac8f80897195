//! Request nonces bound to a user and an action

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::NonceConfig;

/// Action the search endpoint checks nonces against
pub const SEARCH_ACTION: &str = "acm-content-connect-search";

const NONCE_LEN: usize = 10;

/// Issues and verifies nonces.
///
/// A nonce is a keyed blake3 hash of `tick|action|user_id`, where the tick
/// advances every half lifetime. Nonces from the current and the previous
/// tick are accepted.
#[derive(Debug, Clone)]
pub struct NonceManager {
    key: [u8; 32],
    lifetime_secs: u64,
}

impl NonceManager {
    pub fn new(secret: &str, lifetime_secs: u64) -> Self {
        Self {
            key: blake3::derive_key("content-connect nonce v1", secret.as_bytes()),
            lifetime_secs: lifetime_secs.max(2),
        }
    }

    pub fn from_config(config: &NonceConfig) -> Self {
        Self::new(&config.secret, config.lifetime_secs)
    }

    pub fn create(&self, action: &str, user_id: u64) -> String {
        self.create_at(action, user_id, now_secs())
    }

    pub fn verify(&self, nonce: &str, action: &str, user_id: u64) -> bool {
        self.verify_at(nonce, action, user_id, now_secs())
    }

    pub fn create_at(&self, action: &str, user_id: u64, now: u64) -> String {
        self.hash(self.tick(now), action, user_id)
    }

    pub fn verify_at(&self, nonce: &str, action: &str, user_id: u64, now: u64) -> bool {
        if nonce.len() != NONCE_LEN {
            return false;
        }
        let tick = self.tick(now);
        [tick, tick.saturating_sub(1)]
            .into_iter()
            .any(|t| constant_time_eq(self.hash(t, action, user_id).as_bytes(), nonce.as_bytes()))
    }

    fn tick(&self, now: u64) -> u64 {
        now / (self.lifetime_secs / 2)
    }

    fn hash(&self, tick: u64, action: &str, user_id: u64) -> String {
        let message = format!("{tick}|{action}|{user_id}");
        let hash = blake3::keyed_hash(&self.key, message.as_bytes()).to_hex();
        hash[..NONCE_LEN].to_string()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
