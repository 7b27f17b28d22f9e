//! Idempotency keys: `tx-<13-digit epoch millis>-<counter>`.
//!
//! A key can only be admitted while it is younger than the validity window
//! and no log entry references it yet. Consumption is permanent.

use crate::domain::ports::TransactionLogStoreRef;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_KEY_VALIDITY: Duration = Duration::from_secs(5 * 60);

const PREFIX: &str = "tx";
const TIMESTAMP_DIGITS: usize = 13;

pub struct IdempotencyRegistry {
    counter: AtomicU64,
    validity_ms: i64,
    log: TransactionLogStoreRef,
}

impl IdempotencyRegistry {
    pub fn new(log: TransactionLogStoreRef) -> Self {
        Self::with_validity(log, DEFAULT_KEY_VALIDITY)
    }

    pub fn with_validity(log: TransactionLogStoreRef, validity: Duration) -> Self {
        Self {
            counter: AtomicU64::new(0),
            validity_ms: i64::try_from(validity.as_millis()).unwrap_or(i64::MAX),
            log,
        }
    }

    /// Mints a fresh key. The counter makes keys unique within this registry
    /// even when many callers generate in the same millisecond.
    pub fn generate(&self) -> String {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}-{}", PREFIX, Utc::now().timestamp_millis(), sequence)
    }

    pub fn validate_format(&self, key: &str) -> bool {
        self.validate_format_at(key, Utc::now().timestamp_millis())
    }

    /// Checks shape and age of `key` as seen at `now_ms`.
    pub fn validate_format_at(&self, key: &str, now_ms: i64) -> bool {
        let parts: Vec<&str> = key.split('-').collect();
        let [prefix, timestamp, counter] = parts.as_slice() else {
            return false;
        };
        if *prefix != PREFIX || counter.is_empty() {
            return false;
        }
        if timestamp.len() != TIMESTAMP_DIGITS || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let Ok(created_ms) = timestamp.parse::<i64>() else {
            return false;
        };
        // Keys from the future are as suspicious as expired ones.
        created_ms <= now_ms && now_ms - created_ms <= self.validity_ms
    }

    /// A key is usable if it is well formed, fresh and never committed.
    pub async fn is_usable(&self, key: &str) -> Result<bool> {
        if !self.validate_format(key) {
            return Ok(false);
        }
        Ok(!self.log.exists_by_key(key).await?)
    }

    /// Like [`is_usable`](Self::is_usable), but as an operation precondition.
    pub async fn admit(&self, key: &str) -> Result<()> {
        if self.is_usable(key).await? {
            Ok(())
        } else {
            Err(LedgerError::InvalidIdempotencyKey(key.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Amount, Currency, NewAccount};
    use crate::domain::ports::{TransactionLogStore, UnitOfWorkProvider};
    use crate::domain::transaction::{OperationKind, Transaction};
    use crate::infrastructure::in_memory::InMemoryStore;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn registry() -> (InMemoryStore, IdempotencyRegistry) {
        let store = InMemoryStore::new();
        let registry = IdempotencyRegistry::new(Arc::new(store.clone()));
        (store, registry)
    }

    fn key_at(ms: i64) -> String {
        format!("tx-{}-1", ms)
    }

    #[test]
    fn test_generate_format_and_counter() {
        let (_, registry) = registry();
        let first = registry.generate();
        let second = registry.generate();

        assert!(first.starts_with("tx-"));
        assert!(first.ends_with("-1"));
        assert!(second.ends_with("-2"));
        assert!(registry.validate_format(&first));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let (_, registry) = registry();
        let keys: HashSet<String> = (0..10_000).map(|_| registry.generate()).collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_validate_format_window() {
        let (_, registry) = registry();
        let now = 1_700_000_000_000;

        assert!(registry.validate_format_at(&key_at(now), now));
        assert!(registry.validate_format_at(&key_at(now - 5 * 60 * 1000), now));
        assert!(!registry.validate_format_at(&key_at(now - 6 * 60 * 1000), now));
        assert!(!registry.validate_format_at(&key_at(now + 1), now));
    }

    #[test]
    fn test_validate_format_shape() {
        let (_, registry) = registry();
        let now = 1_700_000_000_000;

        assert!(!registry.validate_format_at("tx-123", now));
        assert!(!registry.validate_format_at("tx-1700000000000", now));
        assert!(!registry.validate_format_at("tx-1700000000000-", now));
        assert!(!registry.validate_format_at("tx-1700000000000-1-2", now));
        assert!(!registry.validate_format_at("id-1700000000000-1", now));
        assert!(!registry.validate_format_at("tx-170000000000-1", now));
        assert!(!registry.validate_format_at("tx-17000000000a0-1", now));
        assert!(!registry.validate_format_at("tx-+700000000000-1", now));
        assert!(!registry.validate_format_at("", now));
        // Counter content is not inspected beyond being present.
        assert!(registry.validate_format_at("tx-1700000000000-abc", now));
    }

    #[tokio::test]
    async fn test_is_usable_until_consumed() {
        let (store, registry) = registry();
        let key = registry.generate();
        assert!(registry.is_usable(&key).await.unwrap());

        let account = NewAccount::new("gina", Currency::Eur, 0).unwrap().with_id(1);
        let mut uow = store.begin();
        store.append(
            Transaction::record(&account, Amount::new(1).unwrap(), OperationKind::Deposit, &key),
            &mut uow,
        );
        store.commit(uow).await.unwrap();

        assert!(!registry.is_usable(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_consumed_key_stays_unusable_with_wider_window() {
        let store = InMemoryStore::new();
        let log: TransactionLogStoreRef = Arc::new(store.clone());
        let registry = IdempotencyRegistry::with_validity(log, Duration::from_secs(3600));
        let key = key_at(Utc::now().timestamp_millis() - 10 * 60 * 1000);
        assert!(registry.is_usable(&key).await.unwrap());

        let account = NewAccount::new("hank", Currency::Eur, 0).unwrap().with_id(1);
        let mut uow = store.begin();
        store.append(
            Transaction::record(&account, Amount::new(1).unwrap(), OperationKind::Withdraw, &key),
            &mut uow,
        );
        store.commit(uow).await.unwrap();
        assert!(!registry.is_usable(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_and_future_keys_are_not_usable() {
        let (_, registry) = registry();
        let now = Utc::now().timestamp_millis();
        assert!(!registry.is_usable(&key_at(now - 6 * 60 * 1000)).await.unwrap());
        assert!(!registry.is_usable(&key_at(now + 60 * 1000)).await.unwrap());
        assert!(!registry.is_usable("tx-123").await.unwrap());
    }
}
