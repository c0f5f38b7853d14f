//! Stock ledger domain module.
//!
//! This crate contains business rules for the stateless stock ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage): the immutable ledger entry record, the movement document state
//! machine, and the posting rules that derive entries from a submitted
//! movement.

pub mod entry;
pub mod movement;
pub mod posting;

pub use entry::{LedgerEntry, NewEntry, StoredEntry, VoucherRef};
pub use movement::{
    AddLine, CancelMovement, CreateMovement, MovementCancelled, MovementCommand, MovementCreated,
    MovementDocument, MovementEvent, MovementKind, MovementLine, MovementStatus, MovementSubmitted,
    LineAdded, SubmitMovement,
};
pub use posting::ledger_entries;
