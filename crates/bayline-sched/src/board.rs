//! Board move protocol — the client-side view model for optimistic
//! drag-and-drop.
//!
//! The client may render a tentative state before server confirmation,
//! but the server's accepted or rejected response is always the source
//! of truth. On rejection the exact prior placement is restored and a
//! distinguishable failure signal is recorded; the protocol never
//! retries on its own.
//!
//! At most one move per appointment may be in flight from one client;
//! a second move on the same card is rejected locally (not sent) until
//! the first resolves, so interleaved optimistic states for the same
//! card cannot occur.

use std::collections::HashMap;

use bayline_core::error::BaylineError;
use bayline_core::models::Appointment;
use bayline_core::status::AppointmentStatus;
use uuid::Uuid;

/// Client-side rejection: the request was never sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejected {
    /// A move for this card is still awaiting its server response.
    InFlight,
    /// The card is not on the board.
    UnknownCard,
}

/// Distinguishable failure signal surfaced to the user after rollback.
///
/// Per-kind recovery differs: a scheduling conflict means "pick another
/// slot", a concurrency conflict means "someone else edited this,
/// reload" — so the kinds are never merged. A stale-token rejection of
/// a caller-initiated retry also lands here as `ConcurrencyConflict`;
/// callers should re-fetch before treating it as a scheduling failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveFailure {
    SchedulingConflict,
    ConcurrencyConflict,
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    Validation,
    /// Transport or server error; the outcome is unknown and the
    /// client must re-fetch rather than re-issue the move.
    Transport,
}

impl From<&BaylineError> for MoveFailure {
    fn from(err: &BaylineError) -> Self {
        match err {
            BaylineError::SchedulingConflict { .. } => MoveFailure::SchedulingConflict,
            BaylineError::ConcurrencyConflict { .. } => MoveFailure::ConcurrencyConflict,
            BaylineError::InvalidTransition { from, to } => MoveFailure::InvalidTransition {
                from: *from,
                to: *to,
            },
            BaylineError::Validation { .. } | BaylineError::NotFound { .. } => {
                MoveFailure::Validation
            }
            BaylineError::Database(_) => MoveFailure::Transport,
        }
    }
}

/// Last known-good placement of a card, snapshotted before an
/// optimistic move so a rejection can restore it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    status: AppointmentStatus,
    index: usize,
}

/// Kanban-style grouping of appointment cards by status column,
/// ordered by position within each column.
#[derive(Debug, Default)]
pub struct BoardView {
    columns: HashMap<AppointmentStatus, Vec<Uuid>>,
    pending: HashMap<Uuid, Placement>,
    failures: HashMap<Uuid, MoveFailure>,
}

impl BoardView {
    pub fn from_appointments(appointments: &[Appointment]) -> Self {
        let mut view = Self::default();
        for status in AppointmentStatus::ALL {
            let mut cards: Vec<&Appointment> =
                appointments.iter().filter(|a| a.status == status).collect();
            cards.sort_by_key(|a| a.position);
            view.columns
                .insert(status, cards.into_iter().map(|a| a.id).collect());
        }
        view
    }

    /// Card ids in one column, in board order.
    pub fn column(&self, status: AppointmentStatus) -> &[Uuid] {
        self.columns.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Current placement of a card.
    pub fn locate(&self, id: Uuid) -> Option<(AppointmentStatus, usize)> {
        for status in AppointmentStatus::ALL {
            if let Some(index) = self.column(status).iter().position(|c| *c == id) {
                return Some((status, index));
            }
        }
        None
    }

    pub fn in_flight(&self, id: Uuid) -> bool {
        self.pending.contains_key(&id)
    }

    /// Failure signal recorded by the last rejected move of this card.
    pub fn last_failure(&self, id: Uuid) -> Option<MoveFailure> {
        self.failures.get(&id).copied()
    }

    /// Apply a move optimistically, before any network round trip.
    ///
    /// Snapshots the prior placement for rollback. Rejected locally if
    /// a move for the same card is already awaiting its response.
    pub fn begin_move(
        &mut self,
        id: Uuid,
        target_status: AppointmentStatus,
        target_index: usize,
    ) -> Result<(), MoveRejected> {
        if self.in_flight(id) {
            return Err(MoveRejected::InFlight);
        }
        let (status, index) = self.locate(id).ok_or(MoveRejected::UnknownCard)?;

        self.remove_card(id);
        let column = self.columns.entry(target_status).or_default();
        let target_index = target_index.min(column.len());
        column.insert(target_index, id);

        self.pending.insert(id, Placement { status, index });
        self.failures.remove(&id);
        Ok(())
    }

    /// Reconcile with the server's authoritative response.
    ///
    /// The returned siblings replace the whole target column; their
    /// positions may have shifted server-side.
    pub fn confirm(&mut self, appointment: &Appointment, siblings: &[Appointment]) {
        self.pending.remove(&appointment.id);
        self.failures.remove(&appointment.id);

        let mut ordered: Vec<&Appointment> = siblings.iter().collect();
        ordered.sort_by_key(|a| a.position);
        for sibling in &ordered {
            self.remove_card(sibling.id);
        }
        self.remove_card(appointment.id);

        let column = self.columns.entry(appointment.status).or_default();
        *column = ordered.into_iter().map(|a| a.id).collect();
        if !column.contains(&appointment.id) {
            column.push(appointment.id);
        }
    }

    /// Roll back a rejected or failed move: the card returns to its
    /// exact prior column and position, and the failure kind is kept
    /// for the UI to surface. The move is not retried.
    pub fn reject(&mut self, id: Uuid, failure: MoveFailure) {
        let Some(placement) = self.pending.remove(&id) else {
            return;
        };
        self.remove_card(id);
        let column = self.columns.entry(placement.status).or_default();
        let index = placement.index.min(column.len());
        column.insert(index, id);
        self.failures.insert(id, failure);
    }

    fn remove_card(&mut self, id: Uuid) {
        for column in self.columns.values_mut() {
            column.retain(|c| *c != id);
        }
    }
}
