//! Movement lifecycle service: owns Draft → Submitted → Cancelled
//! transitions and synchronously notifies registered observers.
//!
//! Modeled as an explicit state machine: the document aggregate decides and
//! applies its own transition events; this service orchestrates the
//! dispatch and fans the result out to observers (the ledger writer), in
//! place of framework-level status hooks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use stockforge_core::{Aggregate, DomainError, Event};
use stockforge_ledger::{
    CancelMovement, MovementCommand, MovementDocument, SubmitMovement,
};

use crate::writer::{MovementObserver, WriterError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The transition itself was rejected (deterministic domain failure).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// An observer failed after the state change; entry persistence and
    /// the document transition share the caller's transaction boundary.
    #[error(transparent)]
    Observer(#[from] WriterError),
}

/// Owns movement document transitions and their observers.
#[derive(Default)]
pub struct MovementLifecycle {
    observers: Vec<Arc<dyn MovementObserver>>,
}

impl MovementLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer to be invoked synchronously on each transition,
    /// in registration order.
    pub fn register(&mut self, observer: Arc<dyn MovementObserver>) {
        self.observers.push(observer);
    }

    /// Transition a draft document to `Submitted` and notify observers.
    pub fn submit(
        &self,
        doc: &mut MovementDocument,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let command = MovementCommand::SubmitMovement(SubmitMovement {
            movement_id: doc.id_typed(),
            occurred_at,
        });
        self.transition(doc, &command)?;

        for observer in &self.observers {
            observer.on_submitted(doc)?;
        }

        Ok(())
    }

    /// Transition a submitted document to `Cancelled` and notify observers.
    pub fn cancel(
        &self,
        doc: &mut MovementDocument,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let command = MovementCommand::CancelMovement(CancelMovement {
            movement_id: doc.id_typed(),
            occurred_at,
        });
        self.transition(doc, &command)?;

        for observer in &self.observers {
            observer.on_cancelled(doc)?;
        }

        Ok(())
    }

    fn transition(
        &self,
        doc: &mut MovementDocument,
        command: &MovementCommand,
    ) -> Result<(), DomainError> {
        let events = doc.handle(command)?;
        for event in &events {
            debug!(
                movement_id = %doc.id_typed(),
                event_type = event.event_type(),
                "applying movement event"
            );
            doc.apply(event);
        }
        Ok(())
    }
}
