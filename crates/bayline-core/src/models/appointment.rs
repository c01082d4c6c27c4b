//! Appointment domain model.
//!
//! Appointments are never physically deleted — `Canceled` is the
//! terminal soft delete. The `position` field orders cards within a
//! status column on the board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::AppointmentStatus;
use crate::timerange::TimeRange;
use crate::version::Versioned;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    /// Technician or bay the booking occupies; conflict checks are
    /// scoped per resource. Appointments without a resource never
    /// conflict.
    pub resource_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    /// Always concrete after normalization; `end_at > start_at` holds.
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    /// Board ordering within the status column.
    pub position: i64,
    /// Monetary amounts in integer cents.
    pub total_cents: i64,
    pub paid_cents: i64,
    pub notes: Option<String>,
    /// Monotonic write counter backing the version token.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn range(&self) -> TimeRange {
        // Invariant `end_at > start_at` is enforced at every write.
        TimeRange::new(self.start_at, self.end_at).expect("stored appointment has a valid interval")
    }
}

impl Versioned for Appointment {
    const KIND: &'static str = "appointment";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Booking request. Status is always `Scheduled` and the position is
/// assigned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    /// Defaults to `start_at` plus the configured standard duration.
    pub end_at: Option<DateTime<Utc>>,
    pub total_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Fields that can be patched on an existing appointment.
///
/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change
/// for clearable fields. Status and position changes go through the
/// dedicated change-status and move operations instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointment {
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Option<Uuid>>,
    pub resource_id: Option<Option<Uuid>>,
    pub start_at: Option<DateTime<Utc>>,
    /// `Some(None)` resets the end to the standard duration.
    pub end_at: Option<Option<DateTime<Utc>>>,
    pub total_cents: Option<i64>,
    pub paid_cents: Option<i64>,
    pub notes: Option<Option<String>>,
}

impl UpdateAppointment {
    /// Whether the patch touches the fields that scope conflict checks.
    pub fn changes_slot(&self) -> bool {
        self.start_at.is_some() || self.end_at.is_some() || self.resource_id.is_some()
    }
}

/// Normalized insert record handed to the repository. The interval is
/// already concrete and validated.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub position: i64,
    pub total_cents: i64,
    pub notes: Option<String>,
}

/// Full merged state for a compare-and-swap write. The service merges
/// the current record with the requested changes and the repository
/// applies everything in one statement guarded by the expected
/// revision.
#[derive(Debug, Clone)]
pub struct AppointmentWrite {
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub position: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub notes: Option<String>,
}

impl AppointmentWrite {
    /// Start from the current record, changing nothing.
    pub fn from_current(current: &Appointment) -> Self {
        Self {
            customer_id: current.customer_id,
            vehicle_id: current.vehicle_id,
            resource_id: current.resource_id,
            start_at: current.start_at,
            end_at: current.end_at,
            status: current.status,
            position: current.position,
            total_cents: current.total_cents,
            paid_cents: current.paid_cents,
            notes: current.notes.clone(),
        }
    }
}
