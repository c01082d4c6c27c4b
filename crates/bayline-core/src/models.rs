//! Domain models for Bayline.
//!
//! These are the core types shared across all crates. Every mutable
//! record carries a `revision` counter backing its version token.

pub mod appointment;
pub mod customer;
pub mod invoice;
pub mod vehicle;

pub use appointment::{
    Appointment, AppointmentWrite, CreateAppointment, NewAppointment, UpdateAppointment,
};
pub use customer::{Customer, CreateCustomer, UpdateCustomer};
pub use invoice::{Invoice, InvoiceStatus, InvoiceWrite, NewInvoice};
pub use vehicle::{CreateVehicle, UpdateVehicle, Vehicle};
