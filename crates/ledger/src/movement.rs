use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockforge_core::{
    Aggregate, AggregateRoot, CompanyCode, DomainError, Event, ItemCode, MovementId, WarehouseCode,
};

use crate::entry::VoucherRef;

/// Stock movement kinds.
///
/// A closed set: a kind outside these three is unrepresentable, so malformed
/// movements fail at construction rather than silently producing no entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock arriving into a target warehouse.
    Receipt,
    /// Stock leaving a source warehouse.
    Issue,
    /// Stock moving between two warehouses (both legs optional).
    Transfer,
}

/// Movement document status lifecycle: Draft → Submitted → Cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Draft,
    Submitted,
    Cancelled,
}

/// One line of a movement document.
///
/// `qty` is unsigned in the source document (always positive); the posting
/// rules decide the sign of the resulting ledger entries. Warehouse
/// assignments are optional per leg: a line with neither set is a legitimate
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub line_no: u32,
    pub item_code: ItemCode,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub source_warehouse: Option<WarehouseCode>,
    pub target_warehouse: Option<WarehouseCode>,
    pub stock_uom: String,
    pub transaction_uom: String,
    pub conversion_factor: Decimal,
}

/// Aggregate root: MovementDocument.
///
/// Owns the Draft → Submitted → Cancelled state machine. Ledger entries are
/// derived from a submitted document by the posting rules; the document
/// itself never touches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementDocument {
    id: MovementId,
    kind: MovementKind,
    status: MovementStatus,
    voucher: Option<VoucherRef>,
    posting_date: NaiveDate,
    posting_time: NaiveTime,
    company: Option<CompanyCode>,
    lines: Vec<MovementLine>,
    version: u64,
    created: bool,
}

impl MovementDocument {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: MovementId) -> Self {
        Self {
            id,
            kind: MovementKind::Receipt,
            status: MovementStatus::Draft,
            voucher: None,
            posting_date: NaiveDate::default(),
            posting_time: NaiveTime::default(),
            company: None,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> MovementId {
        self.id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn status(&self) -> MovementStatus {
        self.status
    }

    /// Voucher reference. Panics only if the document was never created;
    /// callers observing documents through the lifecycle always see one.
    pub fn voucher(&self) -> &VoucherRef {
        self.voucher
            .as_ref()
            .unwrap_or_else(|| unreachable!("voucher is set by MovementCreated"))
    }

    pub fn posting_date(&self) -> NaiveDate {
        self.posting_date
    }

    pub fn posting_time(&self) -> NaiveTime {
        self.posting_time
    }

    pub fn company(&self) -> &CompanyCode {
        self.company
            .as_ref()
            .unwrap_or_else(|| unreachable!("company is set by MovementCreated"))
    }

    pub fn lines(&self) -> &[MovementLine] {
        &self.lines
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, MovementStatus::Draft)
    }
}

impl AggregateRoot for MovementDocument {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMovement {
    pub movement_id: MovementId,
    pub kind: MovementKind,
    pub voucher: VoucherRef,
    pub posting_date: NaiveDate,
    pub posting_time: NaiveTime,
    pub company: CompanyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub movement_id: MovementId,
    pub item_code: ItemCode,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub source_warehouse: Option<WarehouseCode>,
    pub target_warehouse: Option<WarehouseCode>,
    pub stock_uom: String,
    pub transaction_uom: String,
    pub conversion_factor: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitMovement {
    pub movement_id: MovementId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelMovement {
    pub movement_id: MovementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementCommand {
    CreateMovement(CreateMovement),
    AddLine(AddLine),
    SubmitMovement(SubmitMovement),
    CancelMovement(CancelMovement),
}

/// Event: MovementCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementCreated {
    pub movement_id: MovementId,
    pub kind: MovementKind,
    pub voucher: VoucherRef,
    pub posting_date: NaiveDate,
    pub posting_time: NaiveTime,
    pub company: CompanyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub movement_id: MovementId,
    pub line: MovementLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementSubmitted {
    pub movement_id: MovementId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementCancelled {
    pub movement_id: MovementId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementEvent {
    MovementCreated(MovementCreated),
    LineAdded(LineAdded),
    MovementSubmitted(MovementSubmitted),
    MovementCancelled(MovementCancelled),
}

impl Event for MovementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MovementEvent::MovementCreated(_) => "movement.created",
            MovementEvent::LineAdded(_) => "movement.line_added",
            MovementEvent::MovementSubmitted(_) => "movement.submitted",
            MovementEvent::MovementCancelled(_) => "movement.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MovementEvent::MovementCreated(e) => e.occurred_at,
            MovementEvent::LineAdded(e) => e.occurred_at,
            MovementEvent::MovementSubmitted(e) => e.occurred_at,
            MovementEvent::MovementCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MovementDocument {
    type Command = MovementCommand;
    type Event = MovementEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MovementEvent::MovementCreated(e) => {
                self.id = e.movement_id;
                self.kind = e.kind;
                self.status = MovementStatus::Draft;
                self.voucher = Some(e.voucher.clone());
                self.posting_date = e.posting_date;
                self.posting_time = e.posting_time;
                self.company = Some(e.company.clone());
                self.lines.clear();
                self.created = true;
            }
            MovementEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            MovementEvent::MovementSubmitted(_) => {
                self.status = MovementStatus::Submitted;
            }
            MovementEvent::MovementCancelled(_) => {
                self.status = MovementStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MovementCommand::CreateMovement(cmd) => self.handle_create(cmd),
            MovementCommand::AddLine(cmd) => self.handle_add_line(cmd),
            MovementCommand::SubmitMovement(cmd) => self.handle_submit(cmd),
            MovementCommand::CancelMovement(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl MovementDocument {
    fn ensure_movement_id(&self, movement_id: MovementId) -> Result<(), DomainError> {
        if self.id != movement_id {
            return Err(DomainError::invariant("movement_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateMovement) -> Result<Vec<MovementEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("movement already exists"));
        }

        Ok(vec![MovementEvent::MovementCreated(MovementCreated {
            movement_id: cmd.movement_id,
            kind: cmd.kind,
            voucher: cmd.voucher.clone(),
            posting_date: cmd.posting_date,
            posting_time: cmd.posting_time,
            company: cmd.company.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<MovementEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_movement_id(cmd.movement_id)?;

        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify movement once it is submitted or cancelled",
            ));
        }

        if cmd.qty <= Decimal::ZERO {
            return Err(DomainError::validation("qty must be positive"));
        }

        if cmd.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit_cost cannot be negative"));
        }

        if cmd.conversion_factor <= Decimal::ZERO {
            return Err(DomainError::validation("conversion_factor must be positive"));
        }

        let next_line_no = (self.lines.len() as u32) + 1;

        Ok(vec![MovementEvent::LineAdded(LineAdded {
            movement_id: cmd.movement_id,
            line: MovementLine {
                line_no: next_line_no,
                item_code: cmd.item_code.clone(),
                qty: cmd.qty,
                unit_cost: cmd.unit_cost,
                source_warehouse: cmd.source_warehouse.clone(),
                target_warehouse: cmd.target_warehouse.clone(),
                stock_uom: cmd.stock_uom.clone(),
                transaction_uom: cmd.transaction_uom.clone(),
                conversion_factor: cmd.conversion_factor,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitMovement) -> Result<Vec<MovementEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_movement_id(cmd.movement_id)?;

        if self.status != MovementStatus::Draft {
            return Err(DomainError::invariant(
                "only draft movements can be submitted",
            ));
        }

        Ok(vec![MovementEvent::MovementSubmitted(MovementSubmitted {
            movement_id: cmd.movement_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelMovement) -> Result<Vec<MovementEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_movement_id(cmd.movement_id)?;

        if self.status != MovementStatus::Submitted {
            return Err(DomainError::invariant(
                "only submitted movements can be cancelled",
            ));
        }

        Ok(vec![MovementEvent::MovementCancelled(MovementCancelled {
            movement_id: cmd.movement_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_movement_id() -> MovementId {
        MovementId::new()
    }

    fn test_voucher(no: &str) -> VoucherRef {
        VoucherRef::new("Stock Entry", no).unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(movement_id: MovementId, kind: MovementKind) -> CreateMovement {
        CreateMovement {
            movement_id,
            kind,
            voucher: test_voucher("SE-0001"),
            posting_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            posting_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            company: CompanyCode::new("ACME").unwrap(),
            occurred_at: test_time(),
        }
    }

    fn add_line_cmd(movement_id: MovementId) -> AddLine {
        AddLine {
            movement_id,
            item_code: ItemCode::new("WIDGET").unwrap(),
            qty: dec!(10),
            unit_cost: dec!(100),
            source_warehouse: None,
            target_warehouse: Some(WarehouseCode::new("MAIN").unwrap()),
            stock_uom: "Nos".to_string(),
            transaction_uom: "Nos".to_string(),
            conversion_factor: Decimal::ONE,
            occurred_at: test_time(),
        }
    }

    fn created(kind: MovementKind) -> MovementDocument {
        let movement_id = test_movement_id();
        let mut doc = MovementDocument::empty(movement_id);
        let events = doc
            .handle(&MovementCommand::CreateMovement(create_cmd(movement_id, kind)))
            .unwrap();
        doc.apply(&events[0]);
        doc
    }

    #[test]
    fn create_movement_emits_created_event() {
        let movement_id = test_movement_id();
        let doc = MovementDocument::empty(movement_id);
        let cmd = create_cmd(movement_id, MovementKind::Receipt);

        let events = doc
            .handle(&MovementCommand::CreateMovement(cmd))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            MovementEvent::MovementCreated(e) => {
                assert_eq!(e.movement_id, movement_id);
                assert_eq!(e.kind, MovementKind::Receipt);
                assert_eq!(e.voucher.voucher_no(), "SE-0001");
            }
            _ => panic!("expected MovementCreated event"),
        }
    }

    #[test]
    fn add_line_assigns_sequential_line_numbers() {
        let mut doc = created(MovementKind::Receipt);
        let movement_id = doc.id_typed();

        for expected_no in 1..=3u32 {
            let events = doc
                .handle(&MovementCommand::AddLine(add_line_cmd(movement_id)))
                .unwrap();
            match &events[0] {
                MovementEvent::LineAdded(e) => assert_eq!(e.line.line_no, expected_no),
                _ => panic!("expected LineAdded event"),
            }
            doc.apply(&events[0]);
        }

        assert_eq!(doc.lines().len(), 3);
    }

    #[test]
    fn non_positive_qty_is_rejected() {
        let doc = created(MovementKind::Issue);
        let mut cmd = add_line_cmd(doc.id_typed());
        cmd.qty = Decimal::ZERO;

        let err = doc.handle(&MovementCommand::AddLine(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("qty")),
            _ => panic!("expected Validation"),
        }
    }

    #[test]
    fn cannot_modify_submitted_movement() {
        let mut doc = created(MovementKind::Receipt);
        let movement_id = doc.id_typed();

        let events = doc
            .handle(&MovementCommand::SubmitMovement(SubmitMovement {
                movement_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        doc.apply(&events[0]);
        assert_eq!(doc.status(), MovementStatus::Submitted);

        let err = doc
            .handle(&MovementCommand::AddLine(add_line_cmd(movement_id)))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => {
                assert!(msg.contains("cannot modify movement"))
            }
            _ => panic!("expected InvariantViolation"),
        }
    }

    #[test]
    fn cannot_submit_twice() {
        let mut doc = created(MovementKind::Transfer);
        let movement_id = doc.id_typed();
        let submit = MovementCommand::SubmitMovement(SubmitMovement {
            movement_id,
            occurred_at: test_time(),
        });

        let events = doc.handle(&submit).unwrap();
        doc.apply(&events[0]);

        let err = doc.handle(&submit).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => {
                assert!(msg.contains("only draft movements"))
            }
            _ => panic!("expected InvariantViolation"),
        }
    }

    #[test]
    fn cannot_cancel_draft_movement() {
        let doc = created(MovementKind::Issue);

        let err = doc
            .handle(&MovementCommand::CancelMovement(CancelMovement {
                movement_id: doc.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => {
                assert!(msg.contains("only submitted movements"))
            }
            _ => panic!("expected InvariantViolation"),
        }
    }

    #[test]
    fn full_lifecycle_draft_to_submitted_to_cancelled() {
        let mut doc = created(MovementKind::Transfer);
        let movement_id = doc.id_typed();

        let events = doc
            .handle(&MovementCommand::AddLine(add_line_cmd(movement_id)))
            .unwrap();
        doc.apply(&events[0]);

        let events = doc
            .handle(&MovementCommand::SubmitMovement(SubmitMovement {
                movement_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        doc.apply(&events[0]);
        assert_eq!(doc.status(), MovementStatus::Submitted);

        let events = doc
            .handle(&MovementCommand::CancelMovement(CancelMovement {
                movement_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        doc.apply(&events[0]);
        assert_eq!(doc.status(), MovementStatus::Cancelled);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let doc = created(MovementKind::Receipt);
        let movement_id = doc.id_typed();
        let cmd = MovementCommand::AddLine(add_line_cmd(movement_id));

        let before_version = doc.version();
        let events1 = doc.handle(&cmd).unwrap();
        let events2 = doc.handle(&cmd).unwrap();

        assert_eq!(doc.version(), before_version);
        assert_eq!(doc.lines().len(), 0);
        assert_eq!(events1, events2);
    }

    #[test]
    fn version_increments_on_apply() {
        let mut doc = created(MovementKind::Receipt);
        assert_eq!(doc.version(), 1);

        let events = doc
            .handle(&MovementCommand::AddLine(add_line_cmd(doc.id_typed())))
            .unwrap();
        doc.apply(&events[0]);
        assert_eq!(doc.version(), 2);
    }
}
