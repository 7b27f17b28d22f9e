//! Per-key mutexes with a single global acquisition order.
//!
//! Keys sort as every account id ascending, then the idempotency key. All
//! callers acquire in that order, so the wait-for graph between concurrent
//! operations can never contain a cycle.

use crate::domain::account::AccountId;
use crate::error::{LedgerError, Result};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can be locked. Variant order is the acquisition order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Account(AccountId),
    Idempotency(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Account(id) => write!(f, "account:{}", id),
            LockKey::Idempotency(key) => write!(f, "key:{}", key),
        }
    }
}

/// Low-level acquisition failure; the services turn it into
/// [`LedgerError::LockAcquisitionTimeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTimeout {
    pub key: LockKey,
    pub requested: Vec<LockKey>,
}

type LockMap = DashMap<LockKey, Arc<Mutex<()>>>;

/// A fully acquired set of locks. Dropping it releases them in reverse
/// acquisition order.
pub struct LockSet {
    locks: Arc<LockMap>,
    held: Vec<(LockKey, OwnedMutexGuard<()>)>,
}

impl LockSet {
    pub fn keys(&self) -> impl Iterator<Item = &LockKey> {
        self.held.iter().map(|(key, _)| key)
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        while let Some((key, guard)) = self.held.pop() {
            drop(guard);
            // Only the map itself still references an idle mutex. Anyone
            // waiting on it holds a clone, which keeps the entry alive.
            self.locks
                .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}

pub struct LockManager {
    locks: Arc<LockMap>,
    timeout: Duration,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Number of keys that currently have a mutex, held or awaited.
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }

    /// Acquires every key in global order, each wait bounded by the timeout.
    ///
    /// On failure the locks already taken are released before returning.
    pub async fn acquire<I>(&self, keys: I) -> std::result::Result<LockSet, LockTimeout>
    where
        I: IntoIterator<Item = LockKey>,
    {
        let ordered: BTreeSet<LockKey> = keys.into_iter().collect();
        let mut set = LockSet {
            locks: Arc::clone(&self.locks),
            held: Vec::with_capacity(ordered.len()),
        };

        for key in &ordered {
            let mutex = Arc::clone(&self.locks.entry(key.clone()).or_default());
            match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
                Ok(guard) => {
                    debug!(key = %key, "Lock acquired");
                    set.held.push((key.clone(), guard));
                }
                Err(_) => {
                    return Err(LockTimeout {
                        key: key.clone(),
                        requested: ordered.iter().cloned().collect(),
                    });
                }
            }
        }
        Ok(set)
    }

    /// Runs `body` while holding every key, releasing them on every exit path.
    pub async fn with_locks<I, F, Fut, T>(&self, keys: I, body: F) -> Result<T>
    where
        I: IntoIterator<Item = LockKey>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _held = self.acquire(keys).await.map_err(|timeout| {
            let keys = timeout
                .requested
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            error!(contended = %timeout.key, keys = %keys, "Couldn't acquire lock");
            LedgerError::LockAcquisitionTimeout { keys }
        })?;
        body().await
    }
}
