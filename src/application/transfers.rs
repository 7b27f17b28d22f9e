use super::coordinator::UnitOfWorkCoordinator;
use super::idempotency::IdempotencyRegistry;
use super::lock_manager::{LockKey, LockManager};
use crate::domain::account::{AccountId, Amount};
use crate::domain::ports::{LedgerStoreRef, TransactionLogStoreRef};
use crate::domain::transaction::{OperationKind, Transaction};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Moves money between two accounts of the same currency.
pub struct TransferService {
    ledger: LedgerStoreRef,
    log: TransactionLogStoreRef,
    locks: Arc<LockManager>,
    registry: Arc<IdempotencyRegistry>,
    coordinator: Arc<UnitOfWorkCoordinator>,
}

impl TransferService {
    pub fn new(
        ledger: LedgerStoreRef,
        log: TransactionLogStoreRef,
        locks: Arc<LockManager>,
        registry: Arc<IdempotencyRegistry>,
        coordinator: Arc<UnitOfWorkCoordinator>,
    ) -> Self {
        Self {
            ledger,
            log,
            locks,
            registry,
            coordinator,
        }
    }

    /// Debits `from` and credits `to` by exactly `amount`, consuming `key`.
    ///
    /// Both account locks are taken lowest id first regardless of direction,
    /// so opposite transfers between the same pair cannot deadlock.
    pub async fn transfer(&self, from: AccountId, to: AccountId, amount: i64, key: &str) -> Result<bool> {
        let amount = Amount::new(amount)?;
        if from == to {
            return Err(LedgerError::Validation(
                "Source and destination accounts must differ".to_string(),
            ));
        }

        let keys = [
            LockKey::Account(from),
            LockKey::Account(to),
            LockKey::Idempotency(key.to_string()),
        ];
        self.locks
            .with_locks(keys, || async move {
                self.registry.admit(key).await?;
                let mut source = self.ledger.get(from).await?.ok_or(LedgerError::NotFound(from))?;
                let mut destination = self.ledger.get(to).await?.ok_or(LedgerError::NotFound(to))?;
                if source.currency != destination.currency {
                    return Err(LedgerError::CurrencyMismatch {
                        from: source.currency,
                        to: destination.currency,
                    });
                }
                source.ensure_covers(amount)?;

                self.coordinator
                    .run_atomic(|uow| {
                        source.withdraw(amount)?;
                        destination.deposit(amount)?;
                        self.ledger.update_in(source.clone(), uow);
                        self.ledger.update_in(destination.clone(), uow);
                        self.log.append(
                            Transaction::record(&source, amount, OperationKind::TransferSource, key),
                            uow,
                        );
                        self.log.append(
                            Transaction::record(
                                &destination,
                                amount,
                                OperationKind::TransferDestination,
                                key,
                            ),
                            uow,
                        );
                        Ok(())
                    })
                    .await?;
                info!(from, to, amount = amount.value(), key, "Transfer committed");
                Ok(true)
            })
            .await
            .inspect_err(|e| warn!(from, to, key, error = %e, "Transfer rejected"))
    }
}
