//! Postgres-backed ledger store implementation.
//!
//! Persists ledger entries in the `stock_ledger_entries` table and pushes the
//! grouped sums down to SQL, so each aggregation executes as one statement —
//! one consistent snapshot per computation, as the valuation model requires.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE stock_ledger_entries (
//!     entry_id          UUID PRIMARY KEY,
//!     item_code         TEXT NOT NULL,
//!     warehouse         TEXT NOT NULL,
//!     quantity          NUMERIC NOT NULL,
//!     incoming_rate     NUMERIC NOT NULL CHECK (incoming_rate >= 0),
//!     voucher_type      TEXT NOT NULL,
//!     voucher_no        TEXT NOT NULL,
//!     voucher_detail_no INTEGER NOT NULL,
//!     posting_date      DATE NOT NULL,
//!     posting_time      TIME NOT NULL,
//!     company           TEXT NOT NULL,
//!     stock_uom         TEXT NOT NULL,
//!     transaction_uom   TEXT NOT NULL,
//!     conversion_factor NUMERIC NOT NULL,
//!     created_at        TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE INDEX idx_sle_key ON stock_ledger_entries (item_code, warehouse, posting_date);
//! CREATE INDEX idx_sle_voucher ON stock_ledger_entries (voucher_type, voucher_no);
//! ```
//!
//! ## Thread Safety
//!
//! `PostgresLedgerStore` is `Send + Sync`; all operations go through the
//! SQLx connection pool. Appends run inside a transaction so one movement
//! document's entries commit together or not at all.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stockforge_core::{EntryId, ItemCode, WarehouseCode};
use stockforge_ledger::{LedgerEntry, StoredEntry, VoucherRef};

use super::query::{EntryFilter, GroupSums, KeySums};
use super::r#trait::StoreError;

/// Postgres-backed append-only ledger store.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Append entries atomically, assigning identities.
    #[instrument(skip(self, entries), fields(entry_count = entries.len()), err)]
    pub async fn append(&self, entries: Vec<LedgerEntry>) -> Result<Vec<StoredEntry>, StoreError> {
        if entries.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("append", e))?;

        let mut committed = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry_id = EntryId::new();

            sqlx::query(
                r#"
                INSERT INTO stock_ledger_entries (
                    entry_id, item_code, warehouse, quantity, incoming_rate,
                    voucher_type, voucher_no, voucher_detail_no,
                    posting_date, posting_time, company,
                    stock_uom, transaction_uom, conversion_factor
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(entry_id.as_uuid())
            .bind(entry.item_code().as_str())
            .bind(entry.warehouse().as_str())
            .bind(entry.quantity())
            .bind(entry.incoming_rate())
            .bind(entry.voucher().voucher_type())
            .bind(entry.voucher().voucher_no())
            .bind(entry.voucher_detail_no() as i32)
            .bind(entry.posting_date())
            .bind(entry.posting_time())
            .bind(entry.company().as_str())
            .bind(entry.stock_uom())
            .bind(entry.transaction_uom())
            .bind(entry.conversion_factor())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("append", e))?;

            committed.push(StoredEntry { entry_id, entry });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("append", e))?;

        Ok(committed)
    }

    /// Delete every entry whose voucher matches; returns the removed count.
    #[instrument(skip(self), fields(voucher = %voucher), err)]
    pub async fn delete_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM stock_ledger_entries
            WHERE voucher_type = $1 AND voucher_no = $2
            "#,
        )
        .bind(voucher.voucher_type())
        .bind(voucher.voucher_no())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_by_voucher", e))?;

        Ok(result.rows_affected())
    }

    /// Count entries recorded under a voucher.
    #[instrument(skip(self), fields(voucher = %voucher), err)]
    pub async fn count_by_voucher(&self, voucher: &VoucherRef) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS entry_count
            FROM stock_ledger_entries
            WHERE voucher_type = $1 AND voucher_no = $2
            "#,
        )
        .bind(voucher.voucher_type())
        .bind(voucher.voucher_no())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_by_voucher", e))?;

        let count: i64 = row
            .try_get("entry_count")
            .map_err(|e| map_sqlx_error("count_by_voucher", e))?;
        Ok(count as u64)
    }

    /// Grouped sums for one `(item, warehouse)` key under the filter.
    #[instrument(
        skip(self),
        fields(
            item_code = %filter.item_code,
            warehouse = %filter.warehouse,
            as_of = %filter.as_of,
            incoming_only = filter.incoming_only,
        ),
        err
    )]
    pub async fn sums_for_key(&self, filter: &EntryFilter) -> Result<KeySums, StoreError> {
        // The optional quantity predicate is the only difference between the
        // balance query and the weighted-average query.
        let sql = if filter.incoming_only {
            r#"
            SELECT
                COALESCE(SUM(quantity), 0) AS quantity,
                COALESCE(SUM(quantity * incoming_rate), 0) AS value
            FROM stock_ledger_entries
            WHERE item_code = $1 AND warehouse = $2 AND posting_date <= $3
              AND quantity > 0
            "#
        } else {
            r#"
            SELECT
                COALESCE(SUM(quantity), 0) AS quantity,
                COALESCE(SUM(quantity * incoming_rate), 0) AS value
            FROM stock_ledger_entries
            WHERE item_code = $1 AND warehouse = $2 AND posting_date <= $3
            "#
        };

        let row = sqlx::query(sql)
            .bind(filter.item_code.as_str())
            .bind(filter.warehouse.as_str())
            .bind(filter.as_of)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sums_for_key", e))?;

        let quantity: Decimal = row
            .try_get("quantity")
            .map_err(|e| map_sqlx_error("sums_for_key", e))?;
        let value: Decimal = row
            .try_get("value")
            .map_err(|e| map_sqlx_error("sums_for_key", e))?;

        Ok(KeySums { quantity, value })
    }

    /// Net quantity per `(item, warehouse)` over all keys as of a date.
    #[instrument(skip(self), fields(as_of = %as_of), err)]
    pub async fn sums_by_key(&self, as_of: NaiveDate) -> Result<Vec<GroupSums>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                item_code,
                warehouse,
                COALESCE(SUM(quantity), 0) AS quantity
            FROM stock_ledger_entries
            WHERE posting_date <= $1
            GROUP BY item_code, warehouse
            ORDER BY item_code, warehouse
            "#,
        )
        .bind(as_of)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sums_by_key", e))?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let item_code: String = row
                .try_get("item_code")
                .map_err(|e| map_sqlx_error("sums_by_key", e))?;
            let warehouse: String = row
                .try_get("warehouse")
                .map_err(|e| map_sqlx_error("sums_by_key", e))?;
            let quantity: Decimal = row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("sums_by_key", e))?;

            groups.push(GroupSums {
                item_code: ItemCode::new(item_code)
                    .map_err(|e| StoreError::Query(format!("sums_by_key: {e}")))?,
                warehouse: WarehouseCode::new(warehouse)
                    .map_err(|e| StoreError::Query(format!("sums_by_key: {e}")))?,
                quantity,
            });
        }

        Ok(groups)
    }

    /// Fetch the identities stored under a voucher (diagnostics/tests).
    #[instrument(skip(self), fields(voucher = %voucher), err)]
    pub async fn entry_ids_by_voucher(
        &self,
        voucher: &VoucherRef,
    ) -> Result<Vec<EntryId>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT entry_id
            FROM stock_ledger_entries
            WHERE voucher_type = $1 AND voucher_no = $2
            ORDER BY created_at
            "#,
        )
        .bind(voucher.voucher_type())
        .bind(voucher.voucher_no())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("entry_ids_by_voucher", e))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row
                .try_get("entry_id")
                .map_err(|e| map_sqlx_error("entry_ids_by_voucher", e))?;
            ids.push(EntryId::from_uuid(id));
        }

        Ok(ids)
    }
}

/// Map SQLx errors onto `StoreError`.
///
/// Database-reported failures keep their sqlstate context; pool/socket
/// failures surface as connectivity so callers can distinguish bad data
/// from a dead backend.
fn map_sqlx_error(op: &'static str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) => {
            let detail = format!("{op}: [{}] {}", db.code().unwrap_or_default(), db);
            match op {
                "append" => StoreError::InvalidAppend(detail),
                "delete_by_voucher" => StoreError::Delete(detail),
                _ => StoreError::Query(detail),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Connection(format!("{op}: {e}"))
        }
        _ => StoreError::Query(format!("{op}: {e}")),
    }
}
