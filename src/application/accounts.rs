use super::coordinator::UnitOfWorkCoordinator;
use super::idempotency::IdempotencyRegistry;
use super::lock_manager::{LockKey, LockManager};
use crate::domain::account::{validate_name, Account, AccountId, Amount, Currency, NewAccount};
use crate::domain::ports::{LedgerStoreRef, TransactionLogStoreRef};
use crate::domain::transaction::{OperationKind, Transaction};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Single-account workflows: lifecycle plus deposit and withdraw.
pub struct AccountService {
    ledger: LedgerStoreRef,
    log: TransactionLogStoreRef,
    locks: Arc<LockManager>,
    registry: Arc<IdempotencyRegistry>,
    coordinator: Arc<UnitOfWorkCoordinator>,
}

impl AccountService {
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

    pub async fn create(&self, name: &str, currency: Currency, initial_balance: i64) -> Result<Account> {
        let account = self
            .ledger
            .insert(NewAccount::new(name, currency, initial_balance)?)
            .await?;
        info!(account = account.id, currency = %currency, balance = initial_balance, "Account created");
        Ok(account)
    }

    pub async fn get(&self, id: AccountId) -> Result<Account> {
        self.ledger.get(id).await?.ok_or(LedgerError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<Account>> {
        self.ledger.list().await
    }

    pub async fn update_name(&self, id: AccountId, name: &str) -> Result<()> {
        validate_name(name)?;
        self.locks
            .with_locks([LockKey::Account(id)], || async move {
                let mut account = self.get(id).await?;
                account.rename(name)?;
                self.ledger.update(account).await
            })
            .await
    }

    pub async fn delete(&self, id: AccountId) -> Result<()> {
        self.locks
            .with_locks([LockKey::Account(id)], || async move {
                self.get(id).await?;
                self.ledger.delete(id).await?;
                info!(account = id, "Account deleted");
                Ok(())
            })
            .await
    }

    /// Credits `amount` to account `id`, consuming `key`.
    ///
    /// The key is admitted before the account is looked up.
    pub async fn deposit(&self, id: AccountId, amount: i64, key: &str) -> Result<()> {
        let amount = Amount::new(amount)?;
        self.locks
            .with_locks(Self::lock_keys(id, key), || async move {
                self.registry.admit(key).await?;
                let mut account = self.get(id).await?;
                self.coordinator
                    .run_atomic(|uow| {
                        account.deposit(amount)?;
                        self.ledger.update_in(account.clone(), uow);
                        self.log.append(
                            Transaction::record(&account, amount, OperationKind::Deposit, key),
                            uow,
                        );
                        Ok(())
                    })
                    .await?;
                info!(account = id, amount = amount.value(), key, "Deposit committed");
                Ok(())
            })
            .await
            .inspect_err(|e| warn!(account = id, key, error = %e, "Deposit rejected"))
    }

    /// Debits `amount` from account `id`, consuming `key`.
    ///
    /// Existence and balance are checked before the key is admitted.
    pub async fn withdraw(&self, id: AccountId, amount: i64, key: &str) -> Result<()> {
        let amount = Amount::new(amount)?;
        self.locks
            .with_locks(Self::lock_keys(id, key), || async move {
                let mut account = self.get(id).await?;
                account.ensure_covers(amount)?;
                self.registry.admit(key).await?;
                self.coordinator
                    .run_atomic(|uow| {
                        account.withdraw(amount)?;
                        self.ledger.update_in(account.clone(), uow);
                        self.log.append(
                            Transaction::record(&account, amount, OperationKind::Withdraw, key),
                            uow,
                        );
                        Ok(())
                    })
                    .await?;
                info!(account = id, amount = amount.value(), key, "Withdrawal committed");
                Ok(())
            })
            .await
            .inspect_err(|e| warn!(account = id, key, error = %e, "Withdrawal rejected"))
    }

    fn lock_keys(id: AccountId, key: &str) -> [LockKey; 2] {
        [LockKey::Account(id), LockKey::Idempotency(key.to_string())]
    }
}
