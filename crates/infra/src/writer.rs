//! Ledger writer: the observer that turns movement lifecycle transitions
//! into ledger entry appends and deletes.
//!
//! The writer's only externally visible effect is entry creation/deletion.
//! No balance or rate is computed or cached here; the valuation aggregator
//! recomputes everything from the stored entries on read.

use thiserror::Error;
use tracing::{debug, info};

use stockforge_core::DomainError;
use stockforge_ledger::{ledger_entries, MovementDocument, MovementStatus};

use crate::ledger_store::{LedgerStore, StoreError};

#[derive(Debug, Error)]
pub enum WriterError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Observer of movement document lifecycle transitions.
///
/// Invoked synchronously by whatever owns the transition (see
/// `MovementLifecycle`), after the document's state has changed.
pub trait MovementObserver: Send + Sync {
    fn on_submitted(&self, doc: &MovementDocument) -> Result<(), WriterError>;

    fn on_cancelled(&self, doc: &MovementDocument) -> Result<(), WriterError>;
}

/// Translates submitted/cancelled movement documents into ledger entry
/// appends and bulk deletes against the injected store.
#[derive(Debug)]
pub struct LedgerWriter<S> {
    store: S,
}

impl<S> LedgerWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> MovementObserver for LedgerWriter<S>
where
    S: LedgerStore,
{
    /// Append the entries a submitted document derives.
    ///
    /// No-op unless the document is actually in `Submitted` status, and
    /// no-op when entries for its voucher already exist — repeated calls
    /// for the same status must never double-append.
    fn on_submitted(&self, doc: &MovementDocument) -> Result<(), WriterError> {
        if doc.status() != MovementStatus::Submitted {
            debug!(
                movement_id = %doc.id_typed(),
                status = ?doc.status(),
                "skipping ledger posting for non-submitted movement"
            );
            return Ok(());
        }

        if self.store.count_by_voucher(doc.voucher())? > 0 {
            debug!(
                voucher = %doc.voucher(),
                "ledger entries already posted for voucher, skipping"
            );
            return Ok(());
        }

        let entries = ledger_entries(doc)?;
        if entries.is_empty() {
            debug!(voucher = %doc.voucher(), "movement derives no ledger entries");
            return Ok(());
        }

        // One append call per document: the store commits all-or-nothing.
        let stored = self.store.append(entries)?;
        info!(
            voucher = %doc.voucher(),
            entry_count = stored.len(),
            "posted ledger entries"
        );

        Ok(())
    }

    /// Bulk delete the document's entries by voucher.
    ///
    /// No-op unless the document is actually in `Cancelled` status. Zero
    /// matching entries is success: cancelling a document that produced no
    /// entries is legitimate.
    fn on_cancelled(&self, doc: &MovementDocument) -> Result<(), WriterError> {
        if doc.status() != MovementStatus::Cancelled {
            debug!(
                movement_id = %doc.id_typed(),
                status = ?doc.status(),
                "skipping ledger deletion for non-cancelled movement"
            );
            return Ok(());
        }

        let removed = self.store.delete_by_voucher(doc.voucher())?;
        info!(
            voucher = %doc.voucher(),
            entry_count = removed,
            "deleted ledger entries for cancelled movement"
        );

        Ok(())
    }
}
