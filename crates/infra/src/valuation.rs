//! Stateless valuation aggregator.
//!
//! Recomputes moving-average rate and on-hand balance from the raw ledger on
//! every call. No running totals are maintained anywhere: the cost of a read
//! is one grouped scan per key, and in exchange there is no cached-balance
//! invariant to keep transactionally consistent with the entry stream.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use stockforge_core::{ItemCode, WarehouseCode};

use crate::ledger_store::{EntryFilter, LedgerStore, StoreError};

/// One row of the stock balance report: plain aggregate numbers per
/// `(item, warehouse)` group with non-zero net quantity. Display names and
/// formatting belong to the reporting layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockBalanceRow {
    pub item_code: ItemCode,
    pub warehouse: WarehouseCode,
    pub balance_qty: Decimal,
    pub valuation_rate: Decimal,
    pub stock_value: Decimal,
}

/// Moving-average valuation over an injected ledger store.
#[derive(Debug)]
pub struct StockValuation<S> {
    store: S,
}

impl<S> StockValuation<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve an omitted as-of date to today (UTC). All operations share
    /// this rule, so omitting the parameter is consistent across calls in
    /// the same logical query.
    fn effective_date(as_of: Option<NaiveDate>) -> NaiveDate {
        as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl<S> StockValuation<S>
where
    S: LedgerStore,
{
    /// Cost-weighted average unit price of all incoming stock recorded up to
    /// the date: `sum(quantity × incoming_rate) / sum(quantity)` over
    /// entries with `quantity > 0`.
    ///
    /// Outgoing entries are excluded by construction — their rate is defined
    /// as 0, so including them would only dilute the average incorrectly.
    /// No incoming entries (or an empty history) yields 0, never a division
    /// error.
    pub fn moving_average_rate(
        &self,
        item_code: &ItemCode,
        warehouse: &WarehouseCode,
        as_of: Option<NaiveDate>,
    ) -> Result<Decimal, StoreError> {
        let sums = self.store.sums_for_key(&EntryFilter {
            item_code: item_code.clone(),
            warehouse: warehouse.clone(),
            as_of: Self::effective_date(as_of),
            incoming_only: true,
        })?;

        Ok(sums
            .value
            .checked_div(sums.quantity)
            .unwrap_or(Decimal::ZERO))
    }

    /// Net on-hand quantity as of the date: `sum(quantity)` over all
    /// entries, positive and negative. 0 when no entries exist.
    pub fn stock_balance(
        &self,
        item_code: &ItemCode,
        warehouse: &WarehouseCode,
        as_of: Option<NaiveDate>,
    ) -> Result<Decimal, StoreError> {
        let sums = self.store.sums_for_key(&EntryFilter {
            item_code: item_code.clone(),
            warehouse: warehouse.clone(),
            as_of: Self::effective_date(as_of),
            incoming_only: false,
        })?;

        Ok(sums.quantity)
    }

    /// Total stock value: balance × moving-average rate. Composed from the
    /// two aggregates at one shared effective date, never stored.
    pub fn stock_value(
        &self,
        item_code: &ItemCode,
        warehouse: &WarehouseCode,
        as_of: Option<NaiveDate>,
    ) -> Result<Decimal, StoreError> {
        let as_of = Self::effective_date(as_of);
        let balance = self.stock_balance(item_code, warehouse, Some(as_of))?;
        let rate = self.moving_average_rate(item_code, warehouse, Some(as_of))?;
        Ok(balance * rate)
    }

    /// Multi-key variant for reporting: every `(item, warehouse)` group with
    /// non-zero net quantity as of the date, with the single-key rate
    /// formula applied per group. Rows are ordered by item code, then
    /// warehouse.
    pub fn stock_balance_report(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<StockBalanceRow>, StoreError> {
        let as_of = Self::effective_date(as_of);

        let mut rows = Vec::new();
        for group in self.store.sums_by_key(as_of)? {
            if group.quantity.is_zero() {
                continue;
            }

            let rate = self.moving_average_rate(&group.item_code, &group.warehouse, Some(as_of))?;

            rows.push(StockBalanceRow {
                stock_value: group.quantity * rate,
                item_code: group.item_code,
                warehouse: group.warehouse,
                balance_qty: group.quantity,
                valuation_rate: rate,
            });
        }

        rows.sort_by(|a, b| {
            (&a.item_code, &a.warehouse).cmp(&(&b.item_code, &b.warehouse))
        });

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use stockforge_core::CompanyCode;
    use stockforge_ledger::{LedgerEntry, NewEntry, VoucherRef};

    use crate::ledger_store::InMemoryLedgerStore;

    fn entry(
        item: &str,
        warehouse: &str,
        qty: Decimal,
        rate: Decimal,
        date: NaiveDate,
    ) -> LedgerEntry {
        LedgerEntry::new(NewEntry {
            item_code: ItemCode::new(item).unwrap(),
            warehouse: WarehouseCode::new(warehouse).unwrap(),
            quantity: qty,
            nominal_rate: rate,
            voucher: VoucherRef::new("Stock Entry", "SE-TEST").unwrap(),
            voucher_detail_no: 1,
            posting_date: date,
            posting_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            company: CompanyCode::new("ACME").unwrap(),
            stock_uom: "Nos".to_string(),
            transaction_uom: "Nos".to_string(),
            conversion_factor: Decimal::ONE,
        })
        .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn item() -> ItemCode {
        ItemCode::new("WIDGET").unwrap()
    }

    fn warehouse() -> WarehouseCode {
        WarehouseCode::new("MAIN").unwrap()
    }

    #[test]
    fn empty_history_yields_zero_rate_and_balance() {
        let valuation = StockValuation::new(InMemoryLedgerStore::new());

        let rate = valuation
            .moving_average_rate(&item(), &warehouse(), Some(date(1)))
            .unwrap();
        let balance = valuation
            .stock_balance(&item(), &warehouse(), Some(date(1)))
            .unwrap();
        let value = valuation
            .stock_value(&item(), &warehouse(), Some(date(1)))
            .unwrap();

        assert_eq!(rate, Decimal::ZERO);
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(value, Decimal::ZERO);
    }

    #[test]
    fn only_outgoing_history_yields_zero_rate() {
        let store = InMemoryLedgerStore::new();
        store
            .append(vec![
                entry("WIDGET", "MAIN", dec!(-3), dec!(0), date(1)),
                entry("WIDGET", "MAIN", dec!(-2), dec!(0), date(2)),
            ])
            .unwrap();
        let valuation = StockValuation::new(store);

        let rate = valuation
            .moving_average_rate(&item(), &warehouse(), Some(date(5)))
            .unwrap();
        let balance = valuation
            .stock_balance(&item(), &warehouse(), Some(date(5)))
            .unwrap();

        assert_eq!(rate, Decimal::ZERO);
        assert_eq!(balance, dec!(-5));
    }

    #[test]
    fn weighted_average_over_incoming_entries() {
        let store = InMemoryLedgerStore::new();
        store
            .append(vec![
                entry("WIDGET", "MAIN", dec!(10), dec!(100), date(1)),
                entry("WIDGET", "MAIN", dec!(5), dec!(120), date(2)),
            ])
            .unwrap();
        let valuation = StockValuation::new(store);

        let rate = valuation
            .moving_average_rate(&item(), &warehouse(), Some(date(5)))
            .unwrap();
        // (10*100 + 5*120) / 15
        assert_eq!(rate.round_dp(6), dec!(106.666667));

        let balance = valuation
            .stock_balance(&item(), &warehouse(), Some(date(5)))
            .unwrap();
        assert_eq!(balance, dec!(15));

        let value = valuation
            .stock_value(&item(), &warehouse(), Some(date(5)))
            .unwrap();
        assert_eq!(value.round_dp(2), dec!(1600.00));
    }

    #[test]
    fn entries_after_as_of_are_invisible() {
        let store = InMemoryLedgerStore::new();
        store
            .append(vec![
                entry("WIDGET", "MAIN", dec!(10), dec!(100), date(1)),
                entry("WIDGET", "MAIN", dec!(90), dec!(500), date(20)),
            ])
            .unwrap();
        let valuation = StockValuation::new(store);

        let rate = valuation
            .moving_average_rate(&item(), &warehouse(), Some(date(10)))
            .unwrap();
        let balance = valuation
            .stock_balance(&item(), &warehouse(), Some(date(10)))
            .unwrap();

        assert_eq!(rate, dec!(100));
        assert_eq!(balance, dec!(10));
    }

    #[test]
    fn report_drops_zero_net_groups_and_orders_rows() {
        let store = InMemoryLedgerStore::new();
        store
            .append(vec![
                entry("WIDGET", "MAIN", dec!(10), dec!(100), date(1)),
                entry("GADGET", "MAIN", dec!(4), dec!(25), date(1)),
                entry("GADGET", "MAIN", dec!(-4), dec!(0), date(2)),
                entry("WIDGET", "OVERFLOW", dec!(2), dec!(110), date(1)),
            ])
            .unwrap();
        let valuation = StockValuation::new(store);

        let rows = valuation.stock_balance_report(Some(date(5))).unwrap();

        // GADGET nets to zero and is dropped.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item_code.as_str(), "WIDGET");
        assert_eq!(rows[0].warehouse.as_str(), "MAIN");
        assert_eq!(rows[0].balance_qty, dec!(10));
        assert_eq!(rows[0].valuation_rate, dec!(100));
        assert_eq!(rows[0].stock_value, dec!(1000));
        assert_eq!(rows[1].warehouse.as_str(), "OVERFLOW");
    }

    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        // Signed quantities with two decimal places; zero allowed.
        (-1_000_000i64..1_000_000).prop_map(|n| Decimal::new(n, 2))
    }

    fn rate_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..100_000).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        /// Property: the balance is the exact sum of all quantities,
        /// regardless of append order.
        #[test]
        fn balance_conserves_quantity_sum(quantities in prop::collection::vec(qty_strategy(), 0..40)) {
            let store = InMemoryLedgerStore::new();
            for qty in &quantities {
                store
                    .append(vec![entry("WIDGET", "MAIN", *qty, Decimal::ZERO, date(1))])
                    .unwrap();
            }
            let valuation = StockValuation::new(store);

            let balance = valuation
                .stock_balance(&item(), &warehouse(), Some(date(5)))
                .unwrap();
            let expected: Decimal = quantities.iter().copied().sum();
            prop_assert_eq!(balance, expected);
        }

        /// Property: appending an outgoing entry never changes the
        /// moving-average rate.
        #[test]
        fn consumption_leaves_rate_unchanged(
            receipts in prop::collection::vec((1i64..10_000, 0i64..100_000), 1..10),
            issued in 1i64..10_000,
        ) {
            let store = std::sync::Arc::new(InMemoryLedgerStore::new());
            for (qty, rate) in &receipts {
                store
                    .append(vec![entry(
                        "WIDGET",
                        "MAIN",
                        Decimal::new(*qty, 2),
                        Decimal::new(*rate, 2),
                        date(1),
                    )])
                    .unwrap();
            }
            let valuation = StockValuation::new(store.clone());

            let before = valuation
                .moving_average_rate(&item(), &warehouse(), Some(date(5)))
                .unwrap();

            store
                .append(vec![entry("WIDGET", "MAIN", Decimal::new(-issued, 2), Decimal::ZERO, date(2))])
                .unwrap();

            let after = valuation
                .moving_average_rate(&item(), &warehouse(), Some(date(5)))
                .unwrap();

            prop_assert_eq!(before, after);
        }

        /// Property: report rows agree with per-key recomputation through
        /// the single-key operations.
        #[test]
        fn report_matches_single_key_recomputation(
            entries in prop::collection::vec(
                (0usize..3, 0usize..2, qty_strategy(), rate_strategy()),
                0..30,
            ),
        ) {
            let items = ["ALPHA", "BRAVO", "CHARLIE"];
            let warehouses = ["MAIN", "OVERFLOW"];

            let store = InMemoryLedgerStore::new();
            for (item_idx, wh_idx, qty, rate) in &entries {
                store
                    .append(vec![entry(
                        items[*item_idx],
                        warehouses[*wh_idx],
                        *qty,
                        *rate,
                        date(1),
                    )])
                    .unwrap();
            }
            let valuation = StockValuation::new(store);

            for row in valuation.stock_balance_report(Some(date(5))).unwrap() {
                let balance = valuation
                    .stock_balance(&row.item_code, &row.warehouse, Some(date(5)))
                    .unwrap();
                let rate = valuation
                    .moving_average_rate(&row.item_code, &row.warehouse, Some(date(5)))
                    .unwrap();

                prop_assert_ne!(balance, Decimal::ZERO);
                prop_assert_eq!(row.balance_qty, balance);
                prop_assert_eq!(row.valuation_rate, rate);
                prop_assert_eq!(row.stock_value, balance * rate);
            }
        }
    }
}
