//! Query types shared by ledger store implementations.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use stockforge_core::{ItemCode, WarehouseCode};
use stockforge_ledger::LedgerEntry;

/// Filter for single-key aggregation: one `(item, warehouse)` pair, entries
/// dated up to and including `as_of`, optionally restricted to incoming
/// (positive-quantity) entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    pub item_code: ItemCode,
    pub warehouse: WarehouseCode,
    pub as_of: NaiveDate,
    pub incoming_only: bool,
}

impl EntryFilter {
    /// Predicate form of the filter, used by scan-based implementations.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.item_code() == &self.item_code
            && entry.warehouse() == &self.warehouse
            && entry.posting_date() <= self.as_of
            && (!self.incoming_only || entry.quantity() > Decimal::ZERO)
    }
}

/// Grouped sums for one `(item, warehouse)` key.
///
/// `value` is `sum(quantity × incoming_rate)` — the weighted-average
/// numerator. Both sums are zero when no entries match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySums {
    pub quantity: Decimal,
    pub value: Decimal,
}

/// Net quantity for one `(item, warehouse)` group as of a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSums {
    pub item_code: ItemCode,
    pub warehouse: WarehouseCode,
    pub quantity: Decimal,
}
