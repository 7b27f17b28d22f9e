use crate::application::idempotency::DEFAULT_KEY_VALIDITY;
use crate::application::lock_manager::DEFAULT_LOCK_TIMEOUT;
use std::time::Duration;

/// Tunables of a [`LedgerEngine`](crate::application::engine::LedgerEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound for waiting on any single lock.
    pub lock_timeout: Duration,
    /// Maximum age of an idempotency key at admission.
    pub key_validity: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            key_validity: DEFAULT_KEY_VALIDITY,
        }
    }
}

impl LedgerConfig {
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_key_validity(mut self, key_validity: Duration) -> Self {
        self.key_validity = key_validity;
        self
    }
}
