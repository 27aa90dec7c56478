//! SQLite backend for the Charter governance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Authorization rules from
//! `charter-core` are evaluated before every operation; row-level read
//! filtering happens in the queries themselves.

mod encode;
mod error;
mod schema;
mod store;

pub use store::SqliteStore;
