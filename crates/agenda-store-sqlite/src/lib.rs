//! SQLite backend for the agenda novelty store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every novelty mutation and its
//! appointment cascade execute inside one `IMMEDIATE` transaction.

mod cascade;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
