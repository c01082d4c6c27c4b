//! Database-specific error types and conversions.

use bayline_core::error::BaylineError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The write transaction found an overlapping blocking booking.
    #[error("Slot taken on resource {resource_id} between {start} and {end}")]
    SlotTaken {
        resource_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A compare-and-swap write found a different stored revision.
    #[error("Stale revision for {entity} {id}")]
    StaleRevision { entity: String, id: String },

    #[error("An invoice already exists for appointment {appointment_id}")]
    DuplicateInvoice { appointment_id: Uuid },
}

impl From<DbError> for BaylineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BaylineError::NotFound { entity, id },
            DbError::SlotTaken {
                resource_id,
                start,
                end,
            } => BaylineError::SchedulingConflict {
                resource_id,
                start,
                end,
            },
            DbError::StaleRevision { entity, id } => {
                BaylineError::ConcurrencyConflict { entity, id }
            }
            DbError::DuplicateInvoice { appointment_id } => BaylineError::Validation {
                message: format!("an invoice already exists for appointment {appointment_id}"),
            },
            other => BaylineError::Database(other.to_string()),
        }
    }
}
