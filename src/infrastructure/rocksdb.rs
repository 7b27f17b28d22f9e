use super::in_memory::ensure_currency_unchanged;
use crate::domain::account::{Account, AccountId, NewAccount};
use crate::domain::ports::{LedgerStore, TransactionLogStore, UnitOfWorkProvider};
use crate::domain::transaction::{OperationKind, Transaction};
use crate::domain::unit_of_work::{StagedWrite, UnitOfWork};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Column Family for storing account rows.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for the transaction log, keyed by log sequence number.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family indexing log entries by idempotency key.
pub const CF_KEYS: &str = "idempotency_keys";
/// Column Family for store bookkeeping such as id sequences.
pub const CF_META: &str = "meta";

const NEXT_ACCOUNT_ID: &[u8] = b"next_account_id";

type KeyEntries = Vec<(OperationKind, AccountId)>;

/// A persistent store implementation using RocksDB.
///
/// Accounts, the transaction log, its idempotency-key index and the account
/// id sequence live in separate Column Families. A unit of work is written as one `WriteBatch`,
/// so a balance change and its log entry are persisted together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    next_account_id: Arc<AtomicU32>,
    next_tx_id: Arc<AtomicU64>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the id
    /// sequences. Account ids continue from the persisted sequence, so ids of
    /// deleted accounts are never handed out again.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_TRANSACTIONS, CF_KEYS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let persisted = db.get_cf(column_family(&db, CF_META)?, NEXT_ACCOUNT_ID)?;
        let next_account_id = match persisted {
            Some(bytes) => decode_account_id(&bytes)?,
            None => match last_key(&db, CF_ACCOUNTS)? {
                Some(key) => decode_account_id(&key)?.saturating_add(1),
                None => 1,
            },
        };
        let next_tx_id = match last_key(&db, CF_TRANSACTIONS)? {
            Some(key) => decode_tx_id(&key)? + 1,
            None => 1,
        };

        Ok(Self {
            db: Arc::new(db),
            next_account_id: Arc::new(AtomicU32::new(next_account_id)),
            next_tx_id: Arc::new(AtomicU64::new(next_tx_id)),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        column_family(&self.db, name)
    }

    fn read_account(&self, id: AccountId) -> Result<Option<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_entries(&self, key: &str) -> Result<KeyEntries> {
        let cf = self.cf(CF_KEYS)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// The row for `id` as it would look after the writes staged so far.
    fn current(
        &self,
        staged: &HashMap<AccountId, Option<Account>>,
        id: AccountId,
    ) -> Result<Option<Account>> {
        match staged.get(&id) {
            Some(row) => Ok(row.clone()),
            None => self.read_account(id),
        }
    }

    /// Translates staged writes into one batch, validating them on the way.
    fn build_batch(&self, writes: Vec<StagedWrite>) -> Result<(WriteBatch, u64)> {
        let accounts = self.cf(CF_ACCOUNTS)?;
        let transactions = self.cf(CF_TRANSACTIONS)?;
        let keys = self.cf(CF_KEYS)?;
        let meta = self.cf(CF_META)?;

        let mut batch = WriteBatch::default();
        let mut staged: HashMap<AccountId, Option<Account>> = HashMap::new();
        let mut inserted = false;
        let mut entries: HashMap<String, KeyEntries> = HashMap::new();
        let mut next_tx_id = self.next_tx_id.load(Ordering::SeqCst);

        for write in writes {
            match write {
                StagedWrite::InsertAccount(account) => {
                    if self.current(&staged, account.id)?.is_some() {
                        return Err(LedgerError::Internal(format!(
                            "Account {} already exists",
                            account.id
                        )));
                    }
                    batch.put_cf(accounts, account.id.to_be_bytes(), serde_json::to_vec(&account)?);
                    inserted = true;
                    staged.insert(account.id, Some(account));
                }
                StagedWrite::UpdateAccount(account) => {
                    let existing = self
                        .current(&staged, account.id)?
                        .ok_or(LedgerError::NotFound(account.id))?;
                    ensure_currency_unchanged(&existing, &account)?;
                    batch.put_cf(accounts, account.id.to_be_bytes(), serde_json::to_vec(&account)?);
                    staged.insert(account.id, Some(account));
                }
                StagedWrite::DeleteAccount(id) => {
                    if self.current(&staged, id)?.is_none() {
                        return Err(LedgerError::NotFound(id));
                    }
                    batch.delete_cf(accounts, id.to_be_bytes());
                    staged.insert(id, None);
                }
                StagedWrite::AppendTransaction(mut tx) => {
                    let known = match entries.entry(tx.idempotency_key.clone()) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(e) => e.insert(self.read_entries(&tx.idempotency_key)?),
                    };
                    if known.contains(&(tx.kind, tx.account_id)) {
                        return Err(LedgerError::Internal(format!(
                            "Duplicate log entry for {} {:?} on account {}",
                            tx.idempotency_key, tx.kind, tx.account_id
                        )));
                    }
                    known.push((tx.kind, tx.account_id));
                    tx.id = next_tx_id;
                    next_tx_id += 1;
                    batch.put_cf(transactions, tx.id.to_be_bytes(), serde_json::to_vec(&tx)?);
                }
            }
        }

        for (key, known) in &entries {
            batch.put_cf(keys, key.as_bytes(), serde_json::to_vec(known)?);
        }
        if inserted {
            // Covers every id reserved so far, committed or not.
            let sequence = self.next_account_id.load(Ordering::SeqCst);
            batch.put_cf(meta, NEXT_ACCOUNT_ID, sequence.to_be_bytes());
        }
        Ok((batch, next_tx_id))
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::Internal(format!("{} column family not found", name)))
}

fn last_key(db: &DB, name: &str) -> Result<Option<Box<[u8]>>> {
    let cf = column_family(db, name)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => Ok(Some(item?.0)),
        None => Ok(None),
    }
}

fn decode_account_id(key: &[u8]) -> Result<AccountId> {
    <[u8; 4]>::try_from(key)
        .map(AccountId::from_be_bytes)
        .map_err(|_| LedgerError::Internal("Corrupted account key".to_string()))
}

fn decode_tx_id(key: &[u8]) -> Result<u64> {
    <[u8; 8]>::try_from(key)
        .map(u64::from_be_bytes)
        .map_err(|_| LedgerError::Internal("Corrupted transaction key".to_string()))
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        self.read_account(id)
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }

    async fn insert(&self, account: NewAccount) -> Result<Account> {
        let mut uow = self.begin();
        let account = self.insert_in(account, &mut uow)?;
        self.commit(uow).await?;
        Ok(account)
    }

    async fn update(&self, account: Account) -> Result<()> {
        let mut uow = self.begin();
        self.update_in(account, &mut uow);
        self.commit(uow).await
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let mut uow = self.begin();
        self.delete_in(id, &mut uow);
        self.commit(uow).await
    }

    fn reserve_id(&self) -> Result<AccountId> {
        self.next_account_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map_err(|_| LedgerError::Internal("Account ids exhausted".to_string()))
    }
}

#[async_trait]
impl TransactionLogStore for RocksDBStore {
    async fn exists_by_key(&self, key: &str) -> Result<bool> {
        let cf = self.cf(CF_KEYS)?;
        // Just check if the key exists without retrieving the value
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }

    async fn list_all(&self) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            transactions.push(serde_json::from_slice(&value)?);
        }
        Ok(transactions)
    }
}

#[async_trait]
impl UnitOfWorkProvider for RocksDBStore {
    async fn commit(&self, uow: UnitOfWork) -> Result<()> {
        let _serialized = self.commit_lock.lock().await;
        let staged = uow.len();
        let (batch, next_tx_id) = self.build_batch(uow.into_writes())?;
        self.db.write(batch)?;
        self.next_tx_id.store(next_tx_id, Ordering::SeqCst);
        debug!(writes = staged, "Committed write batch");
        Ok(())
    }
}
