use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type AccountId = u32;

pub const MAX_NAME_LENGTH: usize = 25;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Gbp,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
        };
        f.write_str(code)
    }
}

/// An account balance in minor currency units (e.g. cents).
///
/// Unsigned by construction, so a committed balance can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub u64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(minor_units: u64) -> Self {
        Self(minor_units)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Renders the balance in major units with two decimal places.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), 2)
    }
}

impl TryFrom<i64> for Balance {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value).map(Self).map_err(|_| {
            LedgerError::Validation("Balance cannot be smaller than 0".to_string())
        })
    }
}

/// Strictly positive amount of money to move, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: i64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value as u64))
        } else {
            Err(LedgerError::Validation(
                "Amount cannot be equal or smaller than 0".to_string(),
            ))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(LedgerError::Validation(format!(
            "Name cannot be longer than {}",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Fields of an account that does not have an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub currency: Currency,
    pub balance: Balance,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, currency: Currency, initial_balance: i64) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            currency,
            balance: Balance::try_from(initial_balance)?,
        })
    }

    pub fn with_id(self, id: AccountId) -> Account {
        Account {
            id,
            name: self.name,
            currency: self.currency,
            balance: self.balance,
        }
    }
}

/// A ledger row. `currency` is fixed once the account is created.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub currency: Currency,
    pub balance: Balance,
}

impl Account {
    /// Credits the balance, refusing to wrap around.
    pub fn deposit(&mut self, amount: Amount) -> Result<()> {
        self.balance.0 = self
            .balance
            .0
            .checked_add(amount.value())
            .ok_or_else(|| LedgerError::Validation("Balance overflow".to_string()))?;
        Ok(())
    }

    /// Debits the balance if it covers `amount`.
    pub fn withdraw(&mut self, amount: Amount) -> Result<()> {
        self.ensure_covers(amount)?;
        self.balance.0 -= amount.value();
        Ok(())
    }

    pub fn ensure_covers(&self, amount: Amount) -> Result<()> {
        if self.balance.0 >= amount.value() {
            Ok(())
        } else {
            Err(LedgerError::InsufficientBalance {
                account: self.id,
                balance: self.balance.0,
                requested: amount.value(),
            })
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }
}
