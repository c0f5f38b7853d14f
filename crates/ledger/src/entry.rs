use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockforge_core::{CompanyCode, DomainError, DomainResult, EntryId, ItemCode, WarehouseCode};

/// Provenance link back to the movement document that produced an entry.
///
/// `(voucher_type, voucher_no)` is the bulk-deletion key on cancellation;
/// it plays no role in valuation arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherRef {
    voucher_type: String,
    voucher_no: String,
}

impl VoucherRef {
    pub fn new(voucher_type: impl Into<String>, voucher_no: impl Into<String>) -> DomainResult<Self> {
        let voucher_type = voucher_type.into().trim().to_string();
        let voucher_no = voucher_no.into().trim().to_string();

        if voucher_type.is_empty() {
            return Err(DomainError::validation("voucher_type cannot be empty"));
        }
        if voucher_no.is_empty() {
            return Err(DomainError::validation("voucher_no cannot be empty"));
        }

        Ok(Self {
            voucher_type,
            voucher_no,
        })
    }

    pub fn voucher_type(&self) -> &str {
        &self.voucher_type
    }

    pub fn voucher_no(&self) -> &str {
        &self.voucher_no
    }
}

impl core::fmt::Display for VoucherRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.voucher_type, self.voucher_no)
    }
}

/// Construction parameters for a ledger entry.
///
/// `nominal_rate` is the per-unit cost the movement line carries; whether it
/// ends up on the entry is decided by `LedgerEntry::new`, never by callers.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub item_code: ItemCode,
    pub warehouse: WarehouseCode,
    pub quantity: Decimal,
    pub nominal_rate: Decimal,
    pub voucher: VoucherRef,
    pub voucher_detail_no: u32,
    pub posting_date: NaiveDate,
    pub posting_time: NaiveTime,
    pub company: CompanyCode,
    pub stock_uom: String,
    pub transaction_uom: String,
    pub conversion_factor: Decimal,
}

/// One immutable, signed-quantity, rate-tagged record of a stock movement.
///
/// Entries are never updated; corrections happen by appending offsetting
/// entries or bulk-deleting a voucher's full set. The entry history for a
/// given `(item_code, warehouse)`, ordered by `posting_date`, fully
/// determines balance and valuation rate as of any date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    item_code: ItemCode,
    warehouse: WarehouseCode,
    quantity: Decimal,
    incoming_rate: Decimal,
    voucher: VoucherRef,
    voucher_detail_no: u32,
    posting_date: NaiveDate,
    posting_time: NaiveTime,
    company: CompanyCode,
    stock_uom: String,
    transaction_uom: String,
    conversion_factor: Decimal,
}

impl LedgerEntry {
    /// Build an entry, deciding its `incoming_rate` centrally.
    ///
    /// Invariant: the rate is only meaningful when the quantity is positive.
    /// A non-positive quantity always stores rate 0, regardless of the
    /// nominal rate the line carried. Negative nominal rates are rejected.
    pub fn new(params: NewEntry) -> DomainResult<Self> {
        if params.nominal_rate < Decimal::ZERO {
            return Err(DomainError::validation("nominal_rate cannot be negative"));
        }
        if params.conversion_factor <= Decimal::ZERO {
            return Err(DomainError::validation("conversion_factor must be positive"));
        }

        let incoming_rate = if params.quantity > Decimal::ZERO {
            params.nominal_rate
        } else {
            Decimal::ZERO
        };

        Ok(Self {
            item_code: params.item_code,
            warehouse: params.warehouse,
            quantity: params.quantity,
            incoming_rate,
            voucher: params.voucher,
            voucher_detail_no: params.voucher_detail_no,
            posting_date: params.posting_date,
            posting_time: params.posting_time,
            company: params.company,
            stock_uom: params.stock_uom,
            transaction_uom: params.transaction_uom,
            conversion_factor: params.conversion_factor,
        })
    }

    pub fn item_code(&self) -> &ItemCode {
        &self.item_code
    }

    pub fn warehouse(&self) -> &WarehouseCode {
        &self.warehouse
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn incoming_rate(&self) -> Decimal {
        self.incoming_rate
    }

    /// `quantity × incoming_rate`: this entry's contribution to the
    /// weighted-average numerator. Zero for outgoing entries.
    pub fn stock_value_delta(&self) -> Decimal {
        self.quantity * self.incoming_rate
    }

    pub fn voucher(&self) -> &VoucherRef {
        &self.voucher
    }

    pub fn voucher_detail_no(&self) -> u32 {
        self.voucher_detail_no
    }

    pub fn posting_date(&self) -> NaiveDate {
        self.posting_date
    }

    pub fn posting_time(&self) -> NaiveTime {
        self.posting_time
    }

    pub fn company(&self) -> &CompanyCode {
        &self.company
    }

    pub fn stock_uom(&self) -> &str {
        &self.stock_uom
    }

    pub fn transaction_uom(&self) -> &str {
        &self.transaction_uom
    }

    pub fn conversion_factor(&self) -> Decimal {
        self.conversion_factor
    }
}

/// A ledger entry persisted by the store, with its assigned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub entry_id: EntryId,
    pub entry: LedgerEntry,
}
