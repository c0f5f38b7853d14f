//! Posting rules: derive ledger entries from a submitted movement document.
//!
//! Pure functions only. Each line yields zero, one, or two entries depending
//! on the movement kind and which warehouse legs are assigned. The storage
//! side effect belongs to the writer in the infra crate.

use rust_decimal::Decimal;

use stockforge_core::{DomainResult, WarehouseCode};

use crate::entry::{LedgerEntry, NewEntry};
use crate::movement::{MovementDocument, MovementKind, MovementLine, MovementStatus};

/// Derive the full set of ledger entries for a movement document.
///
/// A document that is not in `Submitted` status yields no entries. Within a
/// submitted document, dispatch per line:
///
/// - `Receipt`: one `+qty` entry against the target warehouse, if assigned.
/// - `Issue`: one `-qty` entry against the source warehouse, if assigned.
/// - `Transfer`: both legs evaluated independently; a line with both
///   warehouses set produces the issue leg and the receipt leg, a line with
///   one produces only that leg.
///
/// A missing warehouse assignment skips that leg silently: a movement may
/// legitimately apply to only one side. The incoming-rate sign convention is
/// enforced by `LedgerEntry::new`, not here.
pub fn ledger_entries(doc: &MovementDocument) -> DomainResult<Vec<LedgerEntry>> {
    if doc.status() != MovementStatus::Submitted {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();

    for line in doc.lines() {
        match doc.kind() {
            MovementKind::Receipt => {
                if let Some(target) = &line.target_warehouse {
                    entries.push(receipt_leg(doc, line, target)?);
                }
            }
            MovementKind::Issue => {
                if let Some(source) = &line.source_warehouse {
                    entries.push(issue_leg(doc, line, source)?);
                }
            }
            MovementKind::Transfer => {
                if let Some(source) = &line.source_warehouse {
                    entries.push(issue_leg(doc, line, source)?);
                }
                if let Some(target) = &line.target_warehouse {
                    entries.push(receipt_leg(doc, line, target)?);
                }
            }
        }
    }

    Ok(entries)
}

fn receipt_leg(
    doc: &MovementDocument,
    line: &MovementLine,
    warehouse: &WarehouseCode,
) -> DomainResult<LedgerEntry> {
    LedgerEntry::new(entry_params(doc, line, warehouse, line.qty))
}

fn issue_leg(
    doc: &MovementDocument,
    line: &MovementLine,
    warehouse: &WarehouseCode,
) -> DomainResult<LedgerEntry> {
    LedgerEntry::new(entry_params(doc, line, warehouse, -line.qty))
}

fn entry_params(
    doc: &MovementDocument,
    line: &MovementLine,
    warehouse: &WarehouseCode,
    quantity: Decimal,
) -> NewEntry {
    NewEntry {
        item_code: line.item_code.clone(),
        warehouse: warehouse.clone(),
        quantity,
        nominal_rate: line.unit_cost,
        voucher: doc.voucher().clone(),
        voucher_detail_no: line.line_no,
        posting_date: doc.posting_date(),
        posting_time: doc.posting_time(),
        company: doc.company().clone(),
        stock_uom: line.stock_uom.clone(),
        transaction_uom: line.transaction_uom.clone(),
        conversion_factor: line.conversion_factor,
    }
}
