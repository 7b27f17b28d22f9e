use crate::domain::account::{AccountId, Currency};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum LedgerError {
    #[error("Account cannot be found: {0}")]
    NotFound(AccountId),
    #[error("{0} is not a valid txId")]
    InvalidIdempotencyKey(String),
    #[error("Account {account} doesn't have enough balance ({balance} < {requested})")]
    InsufficientBalance {
        account: AccountId,
        balance: u64,
        requested: u64,
    },
    #[error("Source and destination account currencies are different ({from} != {to})")]
    CurrencyMismatch { from: Currency, to: Currency },
    #[error("Cannot acquire lock for {keys}")]
    LockAcquisitionTimeout { keys: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Coarse error class exposed at the system boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    NotFound,
    InvalidIdempotencyKey,
    InsufficientBalance,
    CurrencyMismatch,
    LockAcquisitionTimeout,
    Validation,
    Internal,
}

/// Structured error result handed to callers outside the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub category: ErrorCategory,
    pub status: u16,
    pub message: String,
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::NotFound(_) => ErrorCategory::NotFound,
            LedgerError::InvalidIdempotencyKey(_) => ErrorCategory::InvalidIdempotencyKey,
            LedgerError::InsufficientBalance { .. } => ErrorCategory::InsufficientBalance,
            LedgerError::CurrencyMismatch { .. } => ErrorCategory::CurrencyMismatch,
            LedgerError::LockAcquisitionTimeout { .. } => ErrorCategory::LockAcquisitionTimeout,
            LedgerError::Validation(_) => ErrorCategory::Validation,
            LedgerError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Only lock contention is worth retrying with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockAcquisitionTimeout { .. })
    }

    pub fn to_response(&self) -> ErrorResponse {
        let status = match self.category() {
            ErrorCategory::NotFound => 404,
            ErrorCategory::InvalidIdempotencyKey | ErrorCategory::Validation => 400,
            ErrorCategory::LockAcquisitionTimeout => 503,
            _ => 500,
        };
        // Lock keys and storage failures stay in the logs.
        let message = match self {
            LedgerError::LockAcquisitionTimeout { .. } => {
                "The resource is busy, please retry".to_string()
            }
            LedgerError::Internal(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            category: self.category(),
            status,
            message,
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Internal(format!("Serialization error: {}", e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        LedgerError::Internal(format!("RocksDB error: {}", e))
    }
}
