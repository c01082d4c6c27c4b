//! Bayline Sched — appointment lifecycle orchestration.
//!
//! Combines the conflict detector, status state machine and version
//! tokens from `bayline-core` into the create/update/move/status-change
//! operations, plus the board move protocol consumed by the drag-and-
//! drop UI and the invoice trigger fired on completion.
//!
//! Generic over repository implementations so that this layer has no
//! dependency on the database crate.

pub mod board;
pub mod config;
pub mod hook;
pub mod invoice;
pub mod records;
pub mod service;

pub use board::{BoardView, MoveFailure, MoveRejected};
pub use config::SchedConfig;
pub use hook::{CompletionHook, NoopHook};
pub use invoice::InvoiceService;
pub use records::RecordsService;
pub use service::{AppointmentService, MoveOutcome};
