use crate::domain::account::{Account, AccountId, NewAccount};
use crate::domain::ports::{LedgerStore, TransactionLogStore, UnitOfWorkProvider};
use crate::domain::transaction::{OperationKind, Transaction};
use crate::domain::unit_of_work::{StagedWrite, UnitOfWork};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    entries_by_key: HashMap<String, Vec<(OperationKind, AccountId)>>,
}

impl Tables {
    /// Dry-runs `writes` against the current rows so that `apply` cannot fail halfway.
    fn check<'a>(&'a self, writes: &'a [StagedWrite]) -> Result<()> {
        let mut staged: HashMap<AccountId, Option<&'a Account>> = HashMap::new();
        let mut staged_entries: HashSet<(&str, OperationKind, AccountId)> = HashSet::new();

        for write in writes {
            match write {
                StagedWrite::InsertAccount(account) => {
                    if self.current(&staged, account.id).is_some() {
                        return Err(LedgerError::Internal(format!(
                            "Account {} already exists",
                            account.id
                        )));
                    }
                    staged.insert(account.id, Some(account));
                }
                StagedWrite::UpdateAccount(account) => {
                    let existing = self
                        .current(&staged, account.id)
                        .ok_or(LedgerError::NotFound(account.id))?;
                    ensure_currency_unchanged(existing, account)?;
                    staged.insert(account.id, Some(account));
                }
                StagedWrite::DeleteAccount(id) => {
                    if self.current(&staged, *id).is_none() {
                        return Err(LedgerError::NotFound(*id));
                    }
                    staged.insert(*id, None);
                }
                StagedWrite::AppendTransaction(tx) => {
                    let entry = (tx.idempotency_key.as_str(), tx.kind, tx.account_id);
                    let committed = self
                        .entries_by_key
                        .get(&tx.idempotency_key)
                        .is_some_and(|entries| entries.contains(&(tx.kind, tx.account_id)));
                    if committed || !staged_entries.insert(entry) {
                        return Err(LedgerError::Internal(format!(
                            "Duplicate log entry for {} {:?} on account {}",
                            tx.idempotency_key, tx.kind, tx.account_id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The row for `id` as it would look after the writes staged so far.
    fn current<'a>(
        &'a self,
        staged: &HashMap<AccountId, Option<&'a Account>>,
        id: AccountId,
    ) -> Option<&'a Account> {
        match staged.get(&id) {
            Some(row) => *row,
            None => self.accounts.get(&id),
        }
    }

    fn apply(&mut self, writes: Vec<StagedWrite>) {
        for write in writes {
            match write {
                StagedWrite::InsertAccount(account) | StagedWrite::UpdateAccount(account) => {
                    self.accounts.insert(account.id, account);
                }
                StagedWrite::DeleteAccount(id) => {
                    self.accounts.remove(&id);
                }
                StagedWrite::AppendTransaction(mut tx) => {
                    tx.id = self.transactions.len() as u64 + 1;
                    self.entries_by_key
                        .entry(tx.idempotency_key.clone())
                        .or_default()
                        .push((tx.kind, tx.account_id));
                    self.transactions.push(tx);
                }
            }
        }
    }
}

pub(crate) fn ensure_currency_unchanged(existing: &Account, updated: &Account) -> Result<()> {
    if existing.currency != updated.currency {
        return Err(LedgerError::Validation(format!(
            "Currency of account {} cannot change",
            existing.id
        )));
    }
    Ok(())
}

/// A thread-safe in-memory ledger and transaction log.
///
/// Both tables live behind one `RwLock`, so a committed unit of work is
/// observed either completely or not at all. Clones share the same tables.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    next_id: Arc<AtomicU32>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().cloned().collect())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account> {
        let account = account.with_id(self.reserve_id()?);
        let mut tables = self.tables.write().await;
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: Account) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .accounts
            .get(&account.id)
            .ok_or(LedgerError::NotFound(account.id))?;
        ensure_currency_unchanged(existing, &account)?;
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .accounts
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::NotFound(id))
    }

    fn reserve_id(&self) -> Result<AccountId> {
        // Saturates at the last id instead of wrapping back to 0.
        self.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map_err(|_| LedgerError::Internal("Account ids exhausted".to_string()))
    }
}

#[async_trait]
impl TransactionLogStore for InMemoryStore {
    async fn exists_by_key(&self, key: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.entries_by_key.contains_key(key))
    }

    async fn list_all(&self) -> Result<Vec<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables.transactions.clone())
    }
}

#[async_trait]
impl UnitOfWorkProvider for InMemoryStore {
    async fn commit(&self, uow: UnitOfWork) -> Result<()> {
        let writes = uow.into_writes();
        let mut tables = self.tables.write().await;
        tables.check(&writes)?;
        debug!(writes = writes.len(), "Committing unit of work");
        tables.apply(writes);
        Ok(())
    }
}
