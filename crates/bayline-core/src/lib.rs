//! Bayline Core — domain models and the pure pieces of the appointment
//! lifecycle engine.
//!
//! This crate has no storage or transport dependencies. It provides:
//! - Domain models and input structs ([`models`])
//! - The appointment status state machine ([`status`])
//! - Half-open time intervals and overlap checks ([`timerange`])
//! - The double-booking conflict detector ([`conflict`])
//! - Opaque version tokens for optimistic concurrency ([`version`])
//! - Repository trait definitions ([`repository`])
//! - The shared error taxonomy ([`error`])

pub mod conflict;
pub mod error;
pub mod models;
pub mod repository;
pub mod status;
pub mod timerange;
pub mod version;

pub use error::{BaylineError, BaylineResult};
pub use status::AppointmentStatus;
pub use timerange::TimeRange;
pub use version::Versioned;
