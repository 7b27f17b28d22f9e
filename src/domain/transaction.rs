use super::account::{Account, AccountId, Amount, Currency};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Deposit,
    Withdraw,
    TransferSource,
    TransferDestination,
}

/// Immutable audit record of one committed balance change.
///
/// `id` is assigned by the transaction log when the unit of work commits;
/// it is zero while the record is only staged.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    pub id: u64,
    pub idempotency_key: String,
    pub kind: OperationKind,
    pub account_id: AccountId,
    pub amount: u64,
    pub currency: Currency,
    pub timestamp_ms: i64,
}

impl Transaction {
    /// Builds a log record for `account`, stamped with the current time.
    pub fn record(account: &Account, amount: Amount, kind: OperationKind, key: &str) -> Self {
        Self {
            id: 0,
            idempotency_key: key.to_string(),
            kind,
            account_id: account.id,
            amount: amount.value(),
            currency: account.currency,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::NewAccount;

    #[test]
    fn test_record_copies_account_currency() {
        let account = NewAccount::new("dave", Currency::Usd, 500)
            .unwrap()
            .with_id(9);
        let tx = Transaction::record(&account, Amount::new(42).unwrap(), OperationKind::Deposit, "tx-k");

        assert_eq!(tx.id, 0);
        assert_eq!(tx.account_id, 9);
        assert_eq!(tx.currency, Currency::Usd);
        assert_eq!(tx.amount, 42);
        assert_eq!(tx.idempotency_key, "tx-k");
        assert!(tx.timestamp_ms > 0);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&OperationKind::TransferDestination).unwrap();
        assert_eq!(json, "\"TRANSFER_DESTINATION\"");
    }
}
