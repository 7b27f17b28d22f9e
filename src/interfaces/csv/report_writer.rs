use super::CsvError;
use crate::domain::account::{Account, AccountId, Currency};
use crate::domain::transaction::Transaction;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    id: AccountId,
    name: &'a str,
    currency: Currency,
    balance: u64,
    formatted: Decimal,
}

impl<'a> From<&'a Account> for AccountRow<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            id: account.id,
            name: &account.name,
            currency: account.currency,
            balance: account.balance.value(),
            formatted: account.balance.to_decimal(),
        }
    }
}

/// Writes final account balances as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<(), CsvError> {
        if accounts.is_empty() {
            self.writer
                .write_record(["id", "name", "currency", "balance", "formatted"])?;
        }
        for account in accounts {
            self.writer.serialize(AccountRow::from(account))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes the transaction log as CSV.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions(&mut self, transactions: &[Transaction]) -> Result<(), CsvError> {
        if transactions.is_empty() {
            self.writer.write_record([
                "id",
                "idempotency_key",
                "kind",
                "account_id",
                "amount",
                "currency",
                "timestamp_ms",
            ])?;
        }
        for tx in transactions {
            self.writer.serialize(tx)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Amount, NewAccount};
    use crate::domain::transaction::OperationKind;

    #[test]
    fn test_account_report() {
        let accounts = vec![
            NewAccount::new("uma", Currency::Eur, 10050).unwrap().with_id(1),
            NewAccount::new("vic", Currency::Usd, 7).unwrap().with_id(2),
        ];
        let mut buffer = Vec::new();
        AccountWriter::new(&mut buffer).write_accounts(&accounts).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "id,name,currency,balance,formatted");
        assert_eq!(lines[1], "1,uma,EUR,10050,100.50");
        assert_eq!(lines[2], "2,vic,USD,7,0.07");
    }

    #[test]
    fn test_empty_account_report_has_header() {
        let mut buffer = Vec::new();
        AccountWriter::new(&mut buffer).write_accounts(&[]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap().trim_end(),
            "id,name,currency,balance,formatted"
        );
    }

    #[test]
    fn test_transaction_report() {
        let account = NewAccount::new("wes", Currency::Gbp, 0).unwrap().with_id(3);
        let mut tx = Transaction::record(
            &account,
            Amount::new(15).unwrap(),
            OperationKind::TransferSource,
            "tx-1700000000000-1",
        );
        tx.id = 1;
        tx.timestamp_ms = 1_700_000_000_000;

        let mut buffer = Vec::new();
        TransactionWriter::new(&mut buffer)
            .write_transactions(&[tx])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("id,idempotency_key,kind,account_id,amount,currency,timestamp_ms"));
        assert!(output.contains("1,tx-1700000000000-1,TRANSFER_SOURCE,3,15,GBP,1700000000000"));
    }

    #[test]
    fn test_empty_transaction_report_has_header() {
        let mut buffer = Vec::new();
        TransactionWriter::new(&mut buffer)
            .write_transactions(&[])
            .unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap().trim_end(),
            "id,idempotency_key,kind,account_id,amount,currency,timestamp_ms"
        );
    }
}
