use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use txledger::application::engine::LedgerEngine;
use txledger::application::lock_manager::LockKey;
use txledger::config::LedgerConfig;
use txledger::domain::account::Currency;
use txledger::error::{ErrorCategory, LedgerError};
use txledger::infrastructure::in_memory::InMemoryStore;

fn key_at(offset: ChronoDuration) -> String {
    format!("tx-{}-1", (Utc::now() + offset).timestamp_millis())
}

#[tokio::test]
async fn test_stale_future_and_malformed_keys_are_rejected() {
    let engine = LedgerEngine::in_memory();
    let id = engine.create_account("quin", Currency::Eur, 0).await.unwrap().id;

    for key in [
        key_at(ChronoDuration::minutes(-6)),
        key_at(ChronoDuration::minutes(1)),
        "tx-123".to_string(),
        "tx-1700000000000-".to_string(),
        "rx-1700000000000-1".to_string(),
    ] {
        let result = engine.deposit(id, 10, &key).await;
        assert!(
            matches!(result, Err(LedgerError::InvalidIdempotencyKey(_))),
            "{} was accepted",
            key
        );
    }

    let fresh = key_at(ChronoDuration::seconds(-30));
    engine.deposit(id, 10, &fresh).await.unwrap();
    assert_eq!(engine.get_account(id).await.unwrap().balance.value(), 10);
}

#[tokio::test]
async fn test_key_is_consumed_across_operations() {
    let engine = LedgerEngine::in_memory();
    let a = engine.create_account("rae", Currency::Usd, 100).await.unwrap().id;
    let b = engine.create_account("sol", Currency::Usd, 0).await.unwrap().id;

    let key = engine.generate_idempotency_key();
    assert!(engine.transfer(a, b, 40, &key).await.unwrap());

    // A committed transfer key can't be reused for anything else.
    assert!(matches!(
        engine.deposit(b, 1, &key).await,
        Err(LedgerError::InvalidIdempotencyKey(_))
    ));
    assert!(matches!(
        engine.withdraw(a, 1, &key).await,
        Err(LedgerError::InvalidIdempotencyKey(_))
    ));
    assert_eq!(engine.list_transactions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_attempt_does_not_consume_key() {
    let engine = LedgerEngine::in_memory();
    let id = engine.create_account("tia", Currency::Gbp, 5).await.unwrap().id;

    let key = engine.generate_idempotency_key();
    assert!(matches!(
        engine.withdraw(id, 50, &key).await,
        Err(LedgerError::InsufficientBalance { .. })
    ));
    engine.withdraw(id, 5, &key).await.unwrap();
    assert_eq!(engine.get_account(id).await.unwrap().balance.value(), 0);
}

#[tokio::test]
async fn test_lock_timeout_is_retryable_and_changes_nothing() {
    let config = LedgerConfig::default().with_lock_timeout(Duration::from_millis(50));
    let engine = LedgerEngine::from_store(InMemoryStore::new(), config);
    let id = engine.create_account("uri", Currency::Eur, 100).await.unwrap().id;
    let key = engine.generate_idempotency_key();

    let held = engine
        .lock_manager()
        .acquire([LockKey::Account(id)])
        .await
        .unwrap();

    let err = engine.withdraw(id, 30, &key).await.unwrap_err();
    assert!(matches!(err, LedgerError::LockAcquisitionTimeout { .. }));
    assert!(err.is_retryable());
    let response = err.to_response();
    assert_eq!(response.category, ErrorCategory::LockAcquisitionTimeout);
    assert_eq!(response.status, 503);

    assert_eq!(engine.get_account(id).await.unwrap().balance.value(), 100);
    assert!(engine.list_transactions().await.unwrap().is_empty());

    drop(held);
    engine.withdraw(id, 30, &key).await.unwrap();
    assert_eq!(engine.get_account(id).await.unwrap().balance.value(), 70);
}
