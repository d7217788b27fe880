//! SQLite backend for the Tally inventory store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-step mutation runs inside
//! an explicit transaction on that thread, which also serializes the
//! read-validate-write sequences that protect the non-negative stock
//! invariant.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
