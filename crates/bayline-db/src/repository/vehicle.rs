//! SurrealDB implementation of [`VehicleRepository`].

use bayline_core::error::BaylineResult;
use bayline_core::models::{CreateVehicle, UpdateVehicle, Vehicle};
use bayline_core::repository::VehicleRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct VehicleRow {
    tenant_id: String,
    customer_id: String,
    label: String,
    plate: Option<String>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VehicleRow {
    fn into_vehicle(self, id: Uuid) -> Result<Vehicle, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let customer_id = Uuid::parse_str(&self.customer_id)
            .map_err(|e| DbError::Migration(format!("invalid customer UUID: {e}")))?;
        Ok(Vehicle {
            id,
            tenant_id,
            customer_id,
            label: self.label,
            plate: self.plate,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Vehicle repository.
#[derive(Clone)]
pub struct SurrealVehicleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVehicleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, tenant_id: Uuid, id: Uuid) -> Result<Vehicle, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('vehicle', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<VehicleRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "vehicle".into(),
            id: id_str,
        })?;

        row.into_vehicle(id)
    }
}

impl<C: Connection> VehicleRepository for SurrealVehicleRepository<C> {
    async fn create(&self, input: CreateVehicle) -> BaylineResult<Vehicle> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('vehicle', $id) SET \
                 tenant_id = $tenant_id, customer_id = $customer_id, \
                 label = $label, plate = $plate",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("customer_id", input.customer_id.to_string()))
            .bind(("label", input.label))
            .bind(("plate", input.plate))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<VehicleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "vehicle".into(),
            id: id_str,
        })?;

        Ok(row.into_vehicle(id)?)
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> BaylineResult<Vehicle> {
        Ok(self.fetch(tenant_id, id).await?)
    }

    async fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        input: UpdateVehicle,
    ) -> BaylineResult<Vehicle> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.label.is_some() {
            sets.push("label = $label");
        }
        match &input.plate {
            Some(Some(_)) => sets.push("plate = $plate"),
            Some(None) => sets.push("plate = NONE"),
            None => {}
        }
        sets.push("revision += 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('vehicle', $id) SET {} \
             WHERE tenant_id = $tenant_id AND revision = $revision",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("revision", expected_revision));

        if let Some(label) = input.label {
            builder = builder.bind(("label", label));
        }
        if let Some(Some(plate)) = input.plate {
            builder = builder.bind(("plate", plate));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<VehicleRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_vehicle(id)?),
            None => {
                self.fetch(tenant_id, id).await?;
                Err(DbError::StaleRevision {
                    entity: "vehicle".into(),
                    id: id_str,
                }
                .into())
            }
        }
    }
}
