//! SQLite connection bootstrap for the relational record store.
//!
//! # Responsibility
//! - Open file or in-memory connections with the pragmas the store relies on.
//! - Apply schema migrations before any record is read or written.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A connection returned from this module is fully migrated.
//! - Failures surface as [`StorageError`](crate::storage::StorageError), the
//!   same type every record store reports.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
