//! Completion hook contract.
//!
//! Fired by the appointment service exactly once per appointment, when
//! a status change lands in `Completed` from a non-completed prior
//! status. The invoicing collaborator owns invoice construction; the
//! engine only records the returned reference.

use bayline_core::error::BaylineResult;
use bayline_core::models::Appointment;
use uuid::Uuid;

pub trait CompletionHook: Send + Sync {
    /// Called after the completing write has committed. Returns the id
    /// of the invoice (or equivalent downstream artifact).
    fn on_completed(
        &self,
        appointment: &Appointment,
    ) -> impl Future<Output = BaylineResult<Uuid>> + Send;
}

/// Hook that does nothing, for deployments without invoicing wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl CompletionHook for NoopHook {
    async fn on_completed(&self, appointment: &Appointment) -> BaylineResult<Uuid> {
        tracing::debug!(appointment_id = %appointment.id, "completion hook disabled");
        Ok(appointment.id)
    }
}
