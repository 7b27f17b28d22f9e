//! Domain model and the storage ports the services depend on.

pub mod account;
pub mod ports;
pub mod transaction;
pub mod unit_of_work;
