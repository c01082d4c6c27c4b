//! Optimistic-concurrency edits for shared records.
//!
//! Customers and vehicles are thin CRUD elsewhere, but their edits go
//! through the same token precondition as appointments so two staff
//! members cannot silently overwrite each other.

use bayline_core::error::BaylineResult;
use bayline_core::models::{Customer, UpdateCustomer, UpdateVehicle, Vehicle};
use bayline_core::repository::{CustomerRepository, VehicleRepository};
use bayline_core::version::{self, Versioned};
use uuid::Uuid;

pub struct RecordsService<C: CustomerRepository, V: VehicleRepository> {
    customers: C,
    vehicles: V,
}

impl<C: CustomerRepository, V: VehicleRepository> RecordsService<C, V> {
    pub fn new(customers: C, vehicles: V) -> Self {
        Self { customers, vehicles }
    }

    pub async fn update_customer(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        token: &str,
        patch: UpdateCustomer,
    ) -> BaylineResult<Customer> {
        let current = self.customers.get(tenant_id, id).await?;
        version::validate(Customer::KIND, id, current.revision, token)?;
        self.customers
            .update_checked(tenant_id, id, current.revision, patch)
            .await
    }

    pub async fn update_vehicle(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        token: &str,
        patch: UpdateVehicle,
    ) -> BaylineResult<Vehicle> {
        let current = self.vehicles.get(tenant_id, id).await?;
        version::validate(Vehicle::KIND, id, current.revision, token)?;
        self.vehicles
            .update_checked(tenant_id, id, current.revision, patch)
            .await
    }
}
