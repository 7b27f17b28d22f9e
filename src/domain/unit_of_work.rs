use super::account::{Account, AccountId};
use super::transaction::Transaction;

/// A single write recorded inside a unit of work, applied only on commit.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    InsertAccount(Account),
    UpdateAccount(Account),
    DeleteAccount(AccountId),
    AppendTransaction(Transaction),
}

/// Ordered batch of ledger and log writes that commit or roll back together.
///
/// Nothing staged here is visible to readers until a
/// [`UnitOfWorkProvider`](super::ports::UnitOfWorkProvider) commits it.
/// Dropping an uncommitted unit of work discards every staged write.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    writes: Vec<StagedWrite>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, write: StagedWrite) {
        self.writes.push(write);
    }

    pub fn into_writes(self) -> Vec<StagedWrite> {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
