//! Outer surfaces that drive the engine. Only the CSV batch format for now.

pub mod batch;
pub mod csv;
