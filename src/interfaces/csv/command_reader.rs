use super::CsvError;
use crate::domain::account::{AccountId, Currency};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
    Rename,
    Close,
}

/// One raw row of the batch input. Which columns are required depends on `type`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub account: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Option<i64>,
    pub name: Option<String>,
    pub currency: Option<Currency>,
    /// Client label for the idempotency key; rows sharing a label share a key.
    pub key: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Open {
        name: String,
        currency: Currency,
        initial_balance: i64,
    },
    Deposit {
        account: AccountId,
        amount: i64,
        key: Option<String>,
    },
    Withdraw {
        account: AccountId,
        amount: i64,
        key: Option<String>,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: i64,
        key: Option<String>,
    },
    Rename {
        account: AccountId,
        name: String,
    },
    Close {
        account: AccountId,
    },
}

fn required<T>(value: Option<T>, column: &str, kind: CommandType) -> Result<T, CsvError> {
    value.ok_or_else(|| CsvError::InvalidCommand(format!("{:?} requires `{}`", kind, column)))
}

impl TryFrom<CommandRecord> for Command {
    type Error = CsvError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        let kind = record.r#type;
        let command = match kind {
            CommandType::Open => Command::Open {
                name: required(record.name, "name", kind)?,
                currency: required(record.currency, "currency", kind)?,
                initial_balance: record.amount.unwrap_or(0),
            },
            CommandType::Deposit => Command::Deposit {
                account: required(record.account, "account", kind)?,
                amount: required(record.amount, "amount", kind)?,
                key: record.key,
            },
            CommandType::Withdraw => Command::Withdraw {
                account: required(record.account, "account", kind)?,
                amount: required(record.amount, "amount", kind)?,
                key: record.key,
            },
            CommandType::Transfer => Command::Transfer {
                from: required(record.account, "account", kind)?,
                to: required(record.to, "to", kind)?,
                amount: required(record.amount, "amount", kind)?,
                key: record.key,
            },
            CommandType::Rename => Command::Rename {
                account: required(record.account, "account", kind)?,
                name: required(record.name, "name", kind)?,
            },
            CommandType::Close => Command::Close {
                account: required(record.account, "account", kind)?,
            },
        };
        Ok(command)
    }
}

/// Reads batch commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over parsed
/// commands. It handles whitespace trimming and short rows automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command, CsvError>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(CsvError::from)
                .and_then(|record: CommandRecord| Command::try_from(record))
        })
    }
}
