//! SQLite backend for the Parkade facility model.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs inside one
//! `BEGIN IMMEDIATE` transaction, so a cycle pass is committed whole or not
//! at all.

mod encode;
mod ledger;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use ledger::SqlLedger;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
