use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use stockforge_core::{EntryId, ItemCode, WarehouseCode};
use stockforge_ledger::{LedgerEntry, StoredEntry, VoucherRef};

use super::query::{EntryFilter, GroupSums, KeySums};
use super::r#trait::{LedgerStore, StoreError};

/// In-memory append-only ledger store.
///
/// Intended for tests/dev. Aggregations are full scans, which matches the
/// recompute-on-read model: the entry set per key is bounded by realistic
/// transaction volume.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored entries (test helper).
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entries: Vec<LedgerEntry>) -> Result<Vec<StoredEntry>, StoreError> {
        if entries.is_empty() {
            return Ok(vec![]);
        }

        let mut store = self
            .entries
            .write()
            .map_err(|_| StoreError::InvalidAppend("lock poisoned".to_string()))?;

        // Single locked section: all entries of one call land together.
        let mut committed = Vec::with_capacity(entries.len());
        for entry in entries {
            let stored = StoredEntry {
                entry_id: EntryId::new(),
                entry,
            };
            store.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn delete_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError> {
        let mut store = self
            .entries
            .write()
            .map_err(|_| StoreError::Delete("lock poisoned".to_string()))?;

        let before = store.len();
        store.retain(|stored| stored.entry.voucher() != voucher);
        Ok((before - store.len()) as u64)
    }

    fn count_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError> {
        let store = self
            .entries
            .read()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))?;

        Ok(store
            .iter()
            .filter(|stored| stored.entry.voucher() == voucher)
            .count() as u64)
    }

    fn sums_for_key(&self, filter: &EntryFilter) -> Result<KeySums, StoreError> {
        let store = self
            .entries
            .read()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))?;

        let mut sums = KeySums::default();
        for stored in store.iter() {
            if filter.matches(&stored.entry) {
                sums.quantity += stored.entry.quantity();
                sums.value += stored.entry.stock_value_delta();
            }
        }

        Ok(sums)
    }

    fn sums_by_key(&self, as_of: NaiveDate) -> Result<Vec<GroupSums>, StoreError> {
        let store = self
            .entries
            .read()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))?;

        let mut groups: BTreeMap<(ItemCode, WarehouseCode), Decimal> = BTreeMap::new();
        for stored in store.iter() {
            if stored.entry.posting_date() > as_of {
                continue;
            }
            let key = (
                stored.entry.item_code().clone(),
                stored.entry.warehouse().clone(),
            );
            *groups.entry(key).or_default() += stored.entry.quantity();
        }

        Ok(groups
            .into_iter()
            .map(|((item_code, warehouse), quantity)| GroupSums {
                item_code,
                warehouse,
                quantity,
            })
            .collect())
    }
}
