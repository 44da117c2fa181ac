//! # storage-adapters
//!
//! Implementations of the `domains` repository ports.
//!
//! `memory` is always compiled and backs tests and local runs. `postgres`
//! is the production store, behind the `db-postgres` feature.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
