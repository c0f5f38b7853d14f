//! Append-only ledger store boundary.
//!
//! This module defines the storage collaborator the writer and the valuation
//! aggregator are given, without making any storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use query::{EntryFilter, GroupSums, KeySums};
pub use r#trait::{LedgerStore, StoreError};
