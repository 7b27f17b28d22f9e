use super::csv::command_reader::Command;
use crate::application::engine::LedgerEngine;
use crate::error::Result;
use std::collections::HashMap;

/// Applies batch commands to an engine in input order.
///
/// Idempotency key labels from the input are mapped to real keys: the first
/// row with a label mints one, later rows with the same label replay it.
pub struct BatchRunner<'a> {
    engine: &'a LedgerEngine,
    keys: HashMap<String, String>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a LedgerEngine) -> Self {
        Self {
            engine,
            keys: HashMap::new(),
        }
    }

    fn resolve_key(&mut self, label: Option<String>) -> String {
        let engine = self.engine;
        match label {
            Some(label) => self
                .keys
                .entry(label)
                .or_insert_with(|| engine.generate_idempotency_key())
                .clone(),
            None => engine.generate_idempotency_key(),
        }
    }

    pub async fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Open {
                name,
                currency,
                initial_balance,
            } => {
                self.engine
                    .create_account(&name, currency, initial_balance)
                    .await?;
            }
            Command::Deposit {
                account,
                amount,
                key,
            } => {
                let key = self.resolve_key(key);
                self.engine.deposit(account, amount, &key).await?;
            }
            Command::Withdraw {
                account,
                amount,
                key,
            } => {
                let key = self.resolve_key(key);
                self.engine.withdraw(account, amount, &key).await?;
            }
            Command::Transfer {
                from,
                to,
                amount,
                key,
            } => {
                let key = self.resolve_key(key);
                self.engine.transfer(from, to, amount, &key).await?;
            }
            Command::Rename { account, name } => {
                self.engine.update_account_name(account, &name).await?;
            }
            Command::Close { account } => {
                self.engine.delete_account(account).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Balance, Currency};
    use crate::error::LedgerError;

    #[tokio::test]
    async fn test_labels_replay_the_same_key() {
        let engine = LedgerEngine::in_memory();
        let mut runner = BatchRunner::new(&engine);
        runner
            .apply(Command::Open {
                name: "xena".to_string(),
                currency: Currency::Eur,
                initial_balance: 0,
            })
            .await
            .unwrap();

        let deposit = Command::Deposit {
            account: 1,
            amount: 100,
            key: Some("pay-1".to_string()),
        };
        runner.apply(deposit.clone()).await.unwrap();
        let replay = runner.apply(deposit).await;
        assert!(matches!(replay, Err(LedgerError::InvalidIdempotencyKey(_))));

        runner
            .apply(Command::Deposit {
                account: 1,
                amount: 100,
                key: None,
            })
            .await
            .unwrap();
        assert_eq!(engine.get_account(1).await.unwrap().balance, Balance::new(200));
    }

    #[tokio::test]
    async fn test_rename_and_close() {
        let engine = LedgerEngine::in_memory();
        let mut runner = BatchRunner::new(&engine);
        runner
            .apply(Command::Open {
                name: "yuri".to_string(),
                currency: Currency::Usd,
                initial_balance: 5,
            })
            .await
            .unwrap();
        runner
            .apply(Command::Rename {
                account: 1,
                name: "yuri g".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(engine.get_account(1).await.unwrap().name, "yuri g");

        runner.apply(Command::Close { account: 1 }).await.unwrap();
        assert!(engine.list_accounts().await.unwrap().is_empty());
    }
}
