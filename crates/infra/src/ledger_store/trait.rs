use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use stockforge_ledger::{LedgerEntry, StoredEntry, VoucherRef};

use super::query::{EntryFilter, GroupSums, KeySums};

/// Ledger store operation error.
///
/// These are **infrastructure errors** (storage, connectivity) as opposed to
/// domain errors (validation, invariants). The core performs no retry;
/// failure recovery belongs to the transaction boundary of the surrounding
/// document lifecycle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("connection failure: {0}")]
    Connection(String),
}

/// Append-only stock ledger store.
///
/// The storage collaborator injected into the writer and the valuation
/// aggregator. Entries are immutable once appended; the only mutation is
/// the bulk keyed delete that cancellation performs.
///
/// ## Append Semantics
///
/// `append()`:
/// - Assigns each entry an identity (`EntryId`)
/// - Persists atomically: all entries of one call commit together or not at
///   all (one movement document's entries form one call)
///
/// ## Aggregation Semantics
///
/// `sums_for_key()` and `sums_by_key()` execute date-bounded grouped sums.
/// Implementations must compute each call against a single consistent
/// snapshot so one computation never mixes partially-committed entries.
/// Both return zeros (or no group) rather than erroring when nothing
/// matches.
pub trait LedgerStore: Send + Sync {
    /// Append entries atomically, assigning identities.
    fn append(&self, entries: Vec<LedgerEntry>) -> Result<Vec<StoredEntry>, StoreError>;

    /// Delete every entry whose voucher matches. Zero matches is success;
    /// returns the number of entries removed.
    fn delete_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError>;

    /// Count entries recorded under a voucher.
    fn count_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError>;

    /// Grouped sums for one `(item, warehouse)` key under the filter.
    fn sums_for_key(&self, filter: &EntryFilter) -> Result<KeySums, StoreError>;

    /// Net quantity per `(item, warehouse)` over all keys as of a date.
    /// Zero-net groups are included; callers decide what to drop.
    fn sums_by_key(&self, as_of: NaiveDate) -> Result<Vec<GroupSums>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, entries: Vec<LedgerEntry>) -> Result<Vec<StoredEntry>, StoreError> {
        (**self).append(entries)
    }

    fn delete_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError> {
        (**self).delete_by_voucher(voucher)
    }

    fn count_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError> {
        (**self).count_by_voucher(voucher)
    }

    fn sums_for_key(&self, filter: &EntryFilter) -> Result<KeySums, StoreError> {
        (**self).sums_for_key(filter)
    }

    fn sums_by_key(&self, as_of: NaiveDate) -> Result<Vec<GroupSums>, StoreError> {
        (**self).sums_by_key(as_of)
    }
}
