//! Appointment service — lifecycle orchestration.
//!
//! Every operation follows the same shape: read the current record,
//! validate the supplied version token, run the pure checks (conflict
//! detector, state machine), then hand the storage layer a full merged
//! write guarded by the expected revision. The storage compare-and-swap
//! is the authoritative concurrency check; the early validation exists
//! to produce precise errors before any work is done.

use bayline_core::conflict;
use bayline_core::error::{BaylineError, BaylineResult};
use bayline_core::models::{Appointment, AppointmentWrite, CreateAppointment, NewAppointment, UpdateAppointment};
use bayline_core::repository::AppointmentRepository;
use bayline_core::status::AppointmentStatus;
use bayline_core::timerange::TimeRange;
use bayline_core::version::{self, Versioned};
use uuid::Uuid;

use crate::config::SchedConfig;
use crate::hook::CompletionHook;

/// Result of a board move: the authoritative updated record plus the
/// full target column, whose sibling positions (and tokens) may have
/// shifted.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub appointment: Appointment,
    pub siblings: Vec<Appointment>,
}

/// Appointment lifecycle service.
///
/// Generic over the repository and completion hook so that this layer
/// has no dependency on the database or invoicing crates.
pub struct AppointmentService<A: AppointmentRepository, H: CompletionHook> {
    appointments: A,
    hook: H,
    config: SchedConfig,
}

impl<A: AppointmentRepository, H: CompletionHook> AppointmentService<A, H> {
    pub fn new(appointments: A, hook: H, config: SchedConfig) -> Self {
        Self {
            appointments,
            hook,
            config,
        }
    }

    /// Book a new appointment.
    ///
    /// Normalizes the interval, runs the conflict detector over the
    /// resource's blocking bookings, and persists with status
    /// `Scheduled` at the end of the Scheduled column.
    pub async fn create(&self, input: CreateAppointment) -> BaylineResult<Appointment> {
        let range = TimeRange::normalize(
            input.start_at,
            input.end_at,
            self.config.default_duration(),
        )?;
        let total_cents = input.total_cents.unwrap_or(0);
        if total_cents < 0 {
            return Err(BaylineError::validation("total amount must not be negative"));
        }

        if let Some(resource_id) = input.resource_id {
            let existing = self
                .appointments
                .list_blocking_for_resource(input.tenant_id, resource_id, None)
                .await?;
            if conflict::has_conflict(&range, &existing, None) {
                return Err(BaylineError::SchedulingConflict {
                    resource_id,
                    start: range.start(),
                    end: range.end(),
                });
            }
        }

        let position = self
            .appointments
            .next_position(input.tenant_id, AppointmentStatus::Scheduled)
            .await?;

        let created = self
            .appointments
            .create(NewAppointment {
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                vehicle_id: input.vehicle_id,
                resource_id: input.resource_id,
                start_at: range.start(),
                end_at: range.end(),
                status: AppointmentStatus::Scheduled,
                position,
                total_cents,
                notes: input.notes,
            })
            .await?;

        tracing::info!(
            appointment_id = %created.id,
            tenant_id = %created.tenant_id,
            start = %created.start_at,
            "appointment created"
        );
        Ok(created)
    }

    /// Patch appointment fields under optimistic concurrency.
    ///
    /// The conflict detector re-runs (excluding this appointment) only
    /// when the patch touches start, end or resource; pure field edits
    /// cannot create a time overlap.
    pub async fn update_fields(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        token: &str,
        patch: UpdateAppointment,
    ) -> BaylineResult<Appointment> {
        let current = self.appointments.get(tenant_id, id).await?;
        version::validate(Appointment::KIND, id, current.revision, token)?;

        // Decided up front: merging below consumes the patch.
        let slot_changed = patch.changes_slot();

        let mut write = AppointmentWrite::from_current(&current);
        if let Some(customer_id) = patch.customer_id {
            write.customer_id = customer_id;
        }
        if let Some(vehicle_id) = patch.vehicle_id {
            write.vehicle_id = vehicle_id;
        }
        if let Some(resource_id) = patch.resource_id {
            write.resource_id = resource_id;
        }
        if let Some(total_cents) = patch.total_cents {
            if total_cents < 0 {
                return Err(BaylineError::validation("total amount must not be negative"));
            }
            write.total_cents = total_cents;
        }
        if let Some(paid_cents) = patch.paid_cents {
            if paid_cents < 0 {
                return Err(BaylineError::validation("paid amount must not be negative"));
            }
            write.paid_cents = paid_cents;
        }
        if let Some(notes) = patch.notes {
            write.notes = notes;
        }

        let start = patch.start_at.unwrap_or(current.start_at);
        let end = match patch.end_at {
            Some(end) => end,
            None => Some(current.end_at),
        };
        let range = TimeRange::normalize(start, end, self.config.default_duration())?;
        write.start_at = range.start();
        write.end_at = range.end();

        let mut verify_slot = false;
        if slot_changed {
            if let Some(resource_id) = write.resource_id {
                let existing = self
                    .appointments
                    .list_blocking_for_resource(tenant_id, resource_id, Some(id))
                    .await?;
                if conflict::has_conflict(&range, &existing, Some(id)) {
                    return Err(BaylineError::SchedulingConflict {
                        resource_id,
                        start: range.start(),
                        end: range.end(),
                    });
                }
                verify_slot = true;
            }
        }

        self.appointments
            .update_checked(tenant_id, id, current.revision, write, verify_slot)
            .await
    }

    /// Run the status state machine and persist the transition.
    ///
    /// A request for the current status is an idempotent no-op: the
    /// unchanged record is returned, nothing is written, and the
    /// completion hook does not refire.
    pub async fn change_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        token: &str,
        requested: AppointmentStatus,
    ) -> BaylineResult<Appointment> {
        let current = self.appointments.get(tenant_id, id).await?;
        version::validate(Appointment::KIND, id, current.revision, token)?;

        let next = current.status.transition(requested)?;
        if next == current.status {
            return Ok(current);
        }

        let mut write = AppointmentWrite::from_current(&current);
        write.status = next;
        // The card enters the end of its new column.
        write.position = self.appointments.next_position(tenant_id, next).await?;

        let updated = self
            .appointments
            .update_checked(tenant_id, id, current.revision, write, false)
            .await?;

        tracing::info!(
            appointment_id = %updated.id,
            from = %current.status,
            to = %updated.status,
            "appointment status changed"
        );
        self.fire_completion_hook(current.status, &updated).await;
        Ok(updated)
    }

    /// Composite board move: optional status transition plus
    /// re-sequencing within the target column.
    ///
    /// The card's own revision-guarded write commits first; only then
    /// do siblings at or after the landing slot shift down one place
    /// (rotating their version tokens). A move that loses the
    /// compare-and-swap therefore touches nothing. Pure reordering
    /// never re-runs the conflict detector — position and status
    /// changes cannot create a time overlap.
    pub async fn move_card(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        token: &str,
        new_status: AppointmentStatus,
        new_position: i64,
    ) -> BaylineResult<MoveOutcome> {
        if new_position < 0 {
            return Err(BaylineError::validation("board position must not be negative"));
        }
        let current = self.appointments.get(tenant_id, id).await?;
        version::validate(Appointment::KIND, id, current.revision, token)?;

        let next = current.status.transition(new_status)?;

        // The requested index addresses the column as the client sees
        // it after lifting the card, so within its own column the last
        // slot is one earlier, and dropping the card after its old
        // place means landing past the sibling occupying that index.
        let column_end = self.appointments.next_position(tenant_id, next).await?;
        let same_column = next == current.status;
        let max_index = if same_column { column_end - 1 } else { column_end };
        let index = new_position.min(max_index);
        let position = if same_column && index > current.position {
            index + 1
        } else {
            index
        };

        let mut write = AppointmentWrite::from_current(&current);
        write.status = next;
        write.position = position;

        let updated = self
            .appointments
            .update_checked(tenant_id, id, current.revision, write, false)
            .await?;

        self.appointments
            .shift_column_positions(tenant_id, next, position, id)
            .await?;

        tracing::debug!(
            appointment_id = %updated.id,
            status = %updated.status,
            position = updated.position,
            "appointment moved"
        );
        self.fire_completion_hook(current.status, &updated).await;

        let siblings = self.appointments.list_column(tenant_id, next).await?;
        Ok(MoveOutcome {
            appointment: updated,
            siblings,
        })
    }

    /// Fire the completion hook exactly once per appointment: only a
    /// transition into `Completed` from a different prior status
    /// qualifies, and no-op re-requests never reach this point.
    ///
    /// The completing write is already committed, so a hook failure is
    /// logged rather than rolled back; the invoicing collaborator is
    /// expected to reconcile.
    async fn fire_completion_hook(&self, previous: AppointmentStatus, updated: &Appointment) {
        if previous == AppointmentStatus::Completed
            || updated.status != AppointmentStatus::Completed
        {
            return;
        }
        match self.hook.on_completed(updated).await {
            Ok(invoice_id) => {
                tracing::info!(
                    appointment_id = %updated.id,
                    %invoice_id,
                    "completion hook fired"
                );
            }
            Err(err) => {
                tracing::warn!(
                    appointment_id = %updated.id,
                    error = %err,
                    "completion hook failed; status change remains committed"
                );
            }
        }
    }
}
