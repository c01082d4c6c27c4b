//! SurrealDB repository implementations.

mod appointment;
mod customer;
mod invoice;
mod vehicle;

pub use appointment::SurrealAppointmentRepository;
pub use customer::SurrealCustomerRepository;
pub use invoice::SurrealInvoiceRepository;
pub use vehicle::SurrealVehicleRepository;
