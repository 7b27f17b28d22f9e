use super::accounts::AccountService;
use super::coordinator::UnitOfWorkCoordinator;
use super::idempotency::IdempotencyRegistry;
use super::lock_manager::LockManager;
use super::transfers::TransferService;
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountId, Currency};
use crate::domain::ports::{
    LedgerStore, LedgerStoreRef, TransactionLogStore, TransactionLogStoreRef, UnitOfWorkProvider,
    UnitOfWorkProviderRef,
};
use crate::domain::transaction::Transaction;
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryStore;
use std::sync::Arc;

/// The main entry point of the ledger.
///
/// `LedgerEngine` wires one lock manager, one idempotency registry and one
/// unit-of-work coordinator into the account and transfer services. It is
/// `Send + Sync`; share it behind an `Arc` to call it from many tasks.
pub struct LedgerEngine {
    accounts: AccountService,
    transfers: TransferService,
    registry: Arc<IdempotencyRegistry>,
    locks: Arc<LockManager>,
    log: TransactionLogStoreRef,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` with default timeouts.
    ///
    /// # Arguments
    ///
    /// * `ledger` - The store for account rows.
    /// * `log` - The append-only transaction log.
    /// * `provider` - Commits units of work spanning `ledger` and `log`.
    pub fn new(
        ledger: LedgerStoreRef,
        log: TransactionLogStoreRef,
        provider: UnitOfWorkProviderRef,
    ) -> Self {
        Self::with_config(ledger, log, provider, LedgerConfig::default())
    }

    pub fn with_config(
        ledger: LedgerStoreRef,
        log: TransactionLogStoreRef,
        provider: UnitOfWorkProviderRef,
        config: LedgerConfig,
    ) -> Self {
        let locks = Arc::new(LockManager::new(config.lock_timeout));
        let registry = Arc::new(IdempotencyRegistry::with_validity(
            Arc::clone(&log),
            config.key_validity,
        ));
        let coordinator = Arc::new(UnitOfWorkCoordinator::new(provider));

        let accounts = AccountService::new(
            Arc::clone(&ledger),
            Arc::clone(&log),
            Arc::clone(&locks),
            Arc::clone(&registry),
            Arc::clone(&coordinator),
        );
        let transfers = TransferService::new(
            ledger,
            Arc::clone(&log),
            Arc::clone(&locks),
            Arc::clone(&registry),
            coordinator,
        );

        Self {
            accounts,
            transfers,
            registry,
            locks,
            log,
        }
    }

    /// Builds an engine over a single backend that serves all three ports.
    pub fn from_store<S>(store: S, config: LedgerConfig) -> Self
    where
        S: LedgerStore + TransactionLogStore + UnitOfWorkProvider + Clone + 'static,
    {
        Self::with_config(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            config,
        )
    }

    pub fn in_memory() -> Self {
        Self::from_store(InMemoryStore::new(), LedgerConfig::default())
    }

    pub async fn create_account(
        &self,
        name: &str,
        currency: Currency,
        initial_balance: i64,
    ) -> Result<Account> {
        self.accounts.create(name, currency, initial_balance).await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        self.accounts.get(id).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.accounts.list().await
    }

    pub async fn update_account_name(&self, id: AccountId, name: &str) -> Result<()> {
        self.accounts.update_name(id, name).await
    }

    pub async fn delete_account(&self, id: AccountId) -> Result<()> {
        self.accounts.delete(id).await
    }

    pub async fn deposit(&self, id: AccountId, amount: i64, key: &str) -> Result<()> {
        self.accounts.deposit(id, amount, key).await
    }

    pub async fn withdraw(&self, id: AccountId, amount: i64, key: &str) -> Result<()> {
        self.accounts.withdraw(id, amount, key).await
    }

    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: i64,
        key: &str,
    ) -> Result<bool> {
        self.transfers.transfer(from, to, amount, key).await
    }

    pub fn generate_idempotency_key(&self) -> String {
        self.registry.generate()
    }

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.log.list_all().await
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }
}
