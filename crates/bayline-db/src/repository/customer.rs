//! SurrealDB implementation of [`CustomerRepository`].

use bayline_core::error::BaylineResult;
use bayline_core::models::{CreateCustomer, Customer, UpdateCustomer};
use bayline_core::repository::CustomerRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CustomerRow {
    tenant_id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_customer(self, id: Uuid) -> Result<Customer, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        Ok(Customer {
            id,
            tenant_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Customer repository.
#[derive(Clone)]
pub struct SurrealCustomerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCustomerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, tenant_id: Uuid, id: Uuid) -> Result<Customer, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('customer', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<CustomerRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "customer".into(),
            id: id_str,
        })?;

        row.into_customer(id)
    }
}

impl<C: Connection> CustomerRepository for SurrealCustomerRepository<C> {
    async fn create(&self, input: CreateCustomer) -> BaylineResult<Customer> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('customer', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 email = $email, phone = $phone",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("phone", input.phone))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "customer".into(),
            id: id_str,
        })?;

        Ok(row.into_customer(id)?)
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> BaylineResult<Customer> {
        Ok(self.fetch(tenant_id, id).await?)
    }

    async fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        input: UpdateCustomer,
    ) -> BaylineResult<Customer> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        match &input.email {
            Some(Some(_)) => sets.push("email = $email"),
            Some(None) => sets.push("email = NONE"),
            None => {}
        }
        match &input.phone {
            Some(Some(_)) => sets.push("phone = $phone"),
            Some(None) => sets.push("phone = NONE"),
            None => {}
        }
        sets.push("revision += 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('customer', $id) SET {} \
             WHERE tenant_id = $tenant_id AND revision = $revision",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("revision", expected_revision));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(Some(email)) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(Some(phone)) = input.phone {
            builder = builder.bind(("phone", phone));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_customer(id)?),
            None => {
                // Distinguish a missing record from a lost race.
                self.fetch(tenant_id, id).await?;
                Err(DbError::StaleRevision {
                    entity: "customer".into(),
                    id: id_str,
                }
                .into())
            }
        }
    }
}
