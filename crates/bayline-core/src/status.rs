//! Appointment status state machine.
//!
//! The transition table below is the single source of truth for which
//! status changes are legal. Every consumer (services, storage guards,
//! the board protocol, tests) derives allowed next-states from this
//! table rather than re-encoding the rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BaylineError, BaylineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Ready,
    Completed,
    NoShow,
    Canceled,
}

impl AppointmentStatus {
    /// All statuses, in board column order.
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::InProgress,
        AppointmentStatus::Ready,
        AppointmentStatus::Completed,
        AppointmentStatus::NoShow,
        AppointmentStatus::Canceled,
    ];

    /// Legal destination statuses from `self`.
    pub fn allowed_transitions(self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[InProgress, Ready, NoShow, Canceled],
            InProgress => &[Ready, Completed],
            Ready => &[Completed],
            Completed | NoShow | Canceled => &[],
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Whether an appointment in this status occupies its time slot for
    /// double-booking purposes. Completed, canceled and no-show bookings
    /// do not block new ones.
    pub fn blocks_schedule(self) -> bool {
        !matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::NoShow | AppointmentStatus::Canceled
        )
    }

    /// Statuses that occupy their time slot, for storage-side filters.
    pub fn blocking() -> impl Iterator<Item = AppointmentStatus> {
        Self::ALL.into_iter().filter(|s| s.blocks_schedule())
    }

    /// Validate a requested transition.
    ///
    /// Requesting the current status is an idempotent no-op success.
    /// Anything not in the table fails with
    /// [`BaylineError::InvalidTransition`] and must not mutate state.
    pub fn transition(self, requested: AppointmentStatus) -> BaylineResult<AppointmentStatus> {
        if requested == self || self.allowed_transitions().contains(&requested) {
            Ok(requested)
        } else {
            Err(BaylineError::InvalidTransition {
                from: self,
                to: requested,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::InProgress => "InProgress",
            AppointmentStatus::Ready => "Ready",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::NoShow => "NoShow",
            AppointmentStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
