//! Application layer containing the concurrency control and workflows.
//!
//! Every money-movement operation follows the same shape: take all locks in
//! global order through the `LockManager`, admit the idempotency key, check
//! business rules, then commit balance and log changes through one unit of
//! work. `LedgerEngine` is the facade callers use.

pub mod accounts;
pub mod coordinator;
pub mod engine;
pub mod idempotency;
pub mod lock_manager;
pub mod transfers;
