//! Error types for the Bayline system.
//!
//! The conflict/validation kinds are deliberately distinct variants:
//! callers (the board move protocol in particular) choose different
//! recovery behavior per kind, so they are never collapsed into a
//! generic failure. `Database` is the only kind a caller may retry.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::status::AppointmentStatus;

#[derive(Debug, Error)]
pub enum BaylineError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The proposed interval overlaps an existing non-terminal booking on
    /// the same resource. Recoverable by choosing another time/resource.
    #[error("Scheduling conflict: resource {resource_id} is booked between {start} and {end}")]
    SchedulingConflict {
        resource_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The supplied version token no longer matches the stored record.
    /// Recoverable by re-fetching; never retried with the same token.
    #[error("Concurrency conflict: {entity} {id} was modified by another writer")]
    ConcurrencyConflict { entity: String, id: String },

    /// The requested status is not reachable from the current status.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl BaylineError {
    /// Shorthand for a [`BaylineError::Validation`] with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type BaylineResult<T> = Result<T, BaylineError>;
