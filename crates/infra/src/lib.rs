//! `stockforge-infra` — storage collaborator, ledger writer, and valuation.
//!
//! The domain crates stay pure; everything that touches a store lives here:
//! the `LedgerStore` trait with its in-memory and Postgres implementations,
//! the `LedgerWriter` that observes movement lifecycle transitions, the
//! `MovementLifecycle` that owns those transitions, and the `StockValuation`
//! aggregator that recomputes balances and rates from the raw ledger.

pub mod ledger_store;
pub mod lifecycle;
pub mod valuation;
pub mod writer;


pub use ledger_store::{
    EntryFilter, GroupSums, InMemoryLedgerStore, KeySums, LedgerStore, PostgresLedgerStore,
    StoreError,
};
pub use lifecycle::{LifecycleError, MovementLifecycle};
pub use valuation::{StockBalanceRow, StockValuation};
pub use writer::{LedgerWriter, MovementObserver, WriterError};
