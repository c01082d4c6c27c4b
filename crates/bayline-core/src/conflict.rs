//! Double-booking conflict detector.
//!
//! Pure and read-only: callers fetch the candidate bookings for a
//! resource and the detector decides overlap. The storage layer runs
//! the same predicate inside the write transaction so that two
//! near-simultaneous writers cannot both pass the check and commit
//! overlapping bookings.

use uuid::Uuid;

use crate::models::Appointment;
use crate::timerange::TimeRange;

/// Find an existing booking that overlaps the proposed interval.
///
/// Appointments in non-blocking statuses (completed, canceled,
/// no-show) are skipped, as is the `exclude` id — used when checking a
/// move or update against the record's own prior booking. Returns the
/// first conflicting appointment id.
pub fn find_conflict(
    proposed: &TimeRange,
    existing: &[Appointment],
    exclude: Option<Uuid>,
) -> Option<Uuid> {
    existing
        .iter()
        .filter(|a| Some(a.id) != exclude)
        .filter(|a| a.status.blocks_schedule())
        .find(|a| proposed.overlaps(&a.range()))
        .map(|a| a.id)
}

/// Convenience predicate over [`find_conflict`].
pub fn has_conflict(proposed: &TimeRange, existing: &[Appointment], exclude: Option<Uuid>) -> bool {
    find_conflict(proposed, existing, exclude).is_some()
}
