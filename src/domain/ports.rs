use super::account::{Account, AccountId, NewAccount};
use super::transaction::Transaction;
use super::unit_of_work::{StagedWrite, UnitOfWork};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Current-balance store for accounts.
///
/// The `*_in` variants only stage the write into a [`UnitOfWork`]; it becomes
/// visible when the owning [`UnitOfWorkProvider`] commits.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, id: AccountId) -> Result<Option<Account>>;
    async fn list(&self) -> Result<Vec<Account>>;
    async fn insert(&self, account: NewAccount) -> Result<Account>;
    async fn update(&self, account: Account) -> Result<()>;
    async fn delete(&self, id: AccountId) -> Result<()>;

    /// Hands out the next unused account id.
    fn reserve_id(&self) -> Result<AccountId>;

    fn insert_in(&self, account: NewAccount, uow: &mut UnitOfWork) -> Result<Account> {
        let account = account.with_id(self.reserve_id()?);
        uow.stage(StagedWrite::InsertAccount(account.clone()));
        Ok(account)
    }

    fn update_in(&self, account: Account, uow: &mut UnitOfWork) {
        uow.stage(StagedWrite::UpdateAccount(account));
    }

    fn delete_in(&self, id: AccountId, uow: &mut UnitOfWork) {
        uow.stage(StagedWrite::DeleteAccount(id));
    }
}

/// Append-only log of committed money movements.
#[async_trait]
pub trait TransactionLogStore: Send + Sync {
    async fn exists_by_key(&self, key: &str) -> Result<bool>;
    async fn list_all(&self) -> Result<Vec<Transaction>>;

    fn append(&self, tx: Transaction, uow: &mut UnitOfWork) {
        uow.stage(StagedWrite::AppendTransaction(tx));
    }
}

/// Applies a [`UnitOfWork`] to the ledger and log as one atomic step.
#[async_trait]
pub trait UnitOfWorkProvider: Send + Sync {
    fn begin(&self) -> UnitOfWork {
        UnitOfWork::new()
    }

    /// Either every staged write becomes visible, or none does.
    async fn commit(&self, uow: UnitOfWork) -> Result<()>;

    fn rollback(&self, uow: UnitOfWork) {
        drop(uow);
    }
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type TransactionLogStoreRef = Arc<dyn TransactionLogStore>;
pub type UnitOfWorkProviderRef = Arc<dyn UnitOfWorkProvider>;
