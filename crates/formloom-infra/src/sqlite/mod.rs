//! SQLite-backed repository implementations.

pub mod form;
pub mod message;
pub mod pool;
pub mod usage;
