//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and tenant-scoped. Writes that
//! take an `expected_revision` are compare-and-swap: the implementation
//! must verify the stored revision and apply the write atomically,
//! failing with [`BaylineError::ConcurrencyConflict`] (and applying
//! nothing) when another writer got there first.
//!
//! [`BaylineError::ConcurrencyConflict`]: crate::error::BaylineError

use uuid::Uuid;

use crate::error::BaylineResult;
use crate::models::{
    Appointment, AppointmentWrite, CreateCustomer, CreateVehicle, Customer, Invoice, InvoiceWrite,
    NewAppointment, NewInvoice, UpdateCustomer, UpdateVehicle, Vehicle,
};
use crate::status::AppointmentStatus;

pub trait AppointmentRepository: Send + Sync {
    /// Persist a new appointment.
    ///
    /// When the record carries a resource, the implementation must
    /// re-verify the slot against blocking bookings inside the same
    /// transaction as the insert, failing with
    /// `BaylineError::SchedulingConflict` on overlap.
    fn create(
        &self,
        input: NewAppointment,
    ) -> impl Future<Output = BaylineResult<Appointment>> + Send;

    fn get(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BaylineResult<Appointment>> + Send;

    /// All appointments for a resource whose status blocks the
    /// schedule, excluding `exclude` if given. Input to the conflict
    /// detector.
    fn list_blocking_for_resource(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = BaylineResult<Vec<Appointment>>> + Send;

    /// One board column: appointments in `status`, ordered by position.
    fn list_column(
        &self,
        tenant_id: Uuid,
        status: AppointmentStatus,
    ) -> impl Future<Output = BaylineResult<Vec<Appointment>>> + Send;

    /// Next free position at the end of a status column.
    fn next_position(
        &self,
        tenant_id: Uuid,
        status: AppointmentStatus,
    ) -> impl Future<Output = BaylineResult<i64>> + Send;

    /// Shift every appointment in the column at `position >=
    /// from_position` (except `exclude`) one slot down to make room for
    /// an insertion. Shifted records get a new revision, rotating their
    /// version tokens.
    fn shift_column_positions(
        &self,
        tenant_id: Uuid,
        status: AppointmentStatus,
        from_position: i64,
        exclude: Uuid,
    ) -> impl Future<Output = BaylineResult<()>> + Send;

    /// Compare-and-swap write of the full merged state. With
    /// `verify_slot` the implementation must additionally re-verify the
    /// booking slot inside the same atomic write.
    fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        write: AppointmentWrite,
        verify_slot: bool,
    ) -> impl Future<Output = BaylineResult<Appointment>> + Send;
}

pub trait CustomerRepository: Send + Sync {
    fn create(
        &self,
        input: CreateCustomer,
    ) -> impl Future<Output = BaylineResult<Customer>> + Send;

    fn get(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BaylineResult<Customer>> + Send;

    fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        input: UpdateCustomer,
    ) -> impl Future<Output = BaylineResult<Customer>> + Send;
}

pub trait VehicleRepository: Send + Sync {
    fn create(&self, input: CreateVehicle) -> impl Future<Output = BaylineResult<Vehicle>> + Send;

    fn get(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BaylineResult<Vehicle>> + Send;

    fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        input: UpdateVehicle,
    ) -> impl Future<Output = BaylineResult<Vehicle>> + Send;
}

pub trait InvoiceRepository: Send + Sync {
    /// Create a draft invoice. At most one invoice may exist per
    /// appointment; a duplicate is a validation error.
    fn create(&self, input: NewInvoice) -> impl Future<Output = BaylineResult<Invoice>> + Send;

    fn get(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BaylineResult<Invoice>> + Send;

    fn get_by_appointment(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
    ) -> impl Future<Output = BaylineResult<Invoice>> + Send;

    fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        write: InvoiceWrite,
    ) -> impl Future<Output = BaylineResult<Invoice>> + Send;
}
