//! SQLite backend for the Leasehold lease store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Each store operation is a
//! synchronous function over a `rusqlite::Connection`, executed in one
//! `call` so its transaction never spans an `.await`.

mod batch;
mod encode;
mod query;
mod records;
mod registry;
mod schema;
mod store;
mod tx;
mod versions;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreConfig};

#[cfg(test)]
mod tests;
