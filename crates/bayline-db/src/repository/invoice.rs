//! SurrealDB implementation of [`InvoiceRepository`].
//!
//! The unique index on `(tenant_id, appointment_id)` backs the
//! one-invoice-per-appointment invariant even if the completion hook
//! is ever invoked twice.

use bayline_core::error::BaylineResult;
use bayline_core::models::{Invoice, InvoiceStatus, InvoiceWrite, NewInvoice};
use bayline_core::repository::InvoiceRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Index name checked when classifying a duplicate-invoice write.
const APPOINTMENT_UNIQUE_INDEX: &str = "idx_invoice_tenant_appointment";

#[derive(Debug, SurrealValue)]
struct InvoiceRow {
    tenant_id: String,
    appointment_id: String,
    status: String,
    amount_due_cents: i64,
    amount_paid_cents: i64,
    paid_at: Option<DateTime<Utc>>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct InvoiceRowWithId {
    record_id: String,
    tenant_id: String,
    appointment_id: String,
    status: String,
    amount_due_cents: i64,
    amount_paid_cents: i64,
    paid_at: Option<DateTime<Utc>>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<InvoiceStatus, DbError> {
    match s {
        "Draft" => Ok(InvoiceStatus::Draft),
        "Paid" => Ok(InvoiceStatus::Paid),
        other => Err(DbError::Migration(format!("unknown invoice status: {other}"))),
    }
}

impl InvoiceRow {
    fn into_invoice(self, id: Uuid) -> Result<Invoice, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let appointment_id = Uuid::parse_str(&self.appointment_id)
            .map_err(|e| DbError::Migration(format!("invalid appointment UUID: {e}")))?;
        Ok(Invoice {
            id,
            tenant_id,
            appointment_id,
            status: parse_status(&self.status)?,
            amount_due_cents: self.amount_due_cents,
            amount_paid_cents: self.amount_paid_cents,
            paid_at: self.paid_at,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl InvoiceRowWithId {
    fn try_into_invoice(self) -> Result<Invoice, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let appointment_id = Uuid::parse_str(&self.appointment_id)
            .map_err(|e| DbError::Migration(format!("invalid appointment UUID: {e}")))?;
        Ok(Invoice {
            id,
            tenant_id,
            appointment_id,
            status: parse_status(&self.status)?,
            amount_due_cents: self.amount_due_cents,
            amount_paid_cents: self.amount_paid_cents,
            paid_at: self.paid_at,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Invoice repository.
#[derive(Clone)]
pub struct SurrealInvoiceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInvoiceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, tenant_id: Uuid, id: Uuid) -> Result<Invoice, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('invoice', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<InvoiceRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invoice".into(),
            id: id_str,
        })?;

        row.into_invoice(id)
    }
}

impl<C: Connection> InvoiceRepository for SurrealInvoiceRepository<C> {
    async fn create(&self, input: NewInvoice) -> BaylineResult<Invoice> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let appointment_id = input.appointment_id;

        let classify = |e: surrealdb::Error| {
            if e.to_string().contains(APPOINTMENT_UNIQUE_INDEX) {
                DbError::DuplicateInvoice { appointment_id }
            } else {
                DbError::Surreal(e)
            }
        };

        let result = self
            .db
            .query(
                "CREATE type::record('invoice', $id) SET \
                 tenant_id = $tenant_id, appointment_id = $appointment_id, \
                 status = 'Draft', amount_due_cents = $amount_due_cents",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("appointment_id", input.appointment_id.to_string()))
            .bind(("amount_due_cents", input.amount_due_cents))
            .await
            .map_err(classify)?;

        let mut result = result.check().map_err(classify)?;

        let rows: Vec<InvoiceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invoice".into(),
            id: id_str,
        })?;

        Ok(row.into_invoice(id)?)
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> BaylineResult<Invoice> {
        Ok(self.fetch(tenant_id, id).await?)
    }

    async fn get_by_appointment(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
    ) -> BaylineResult<Invoice> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invoice \
                 WHERE tenant_id = $tenant_id \
                 AND appointment_id = $appointment_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("appointment_id", appointment_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvoiceRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invoice".into(),
            id: format!("appointment={appointment_id}"),
        })?;

        Ok(row.try_into_invoice()?)
    }

    async fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        write: InvoiceWrite,
    ) -> BaylineResult<Invoice> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('invoice', $id) SET \
                 status = $status, amount_paid_cents = $amount_paid_cents, \
                 paid_at = $paid_at, revision += 1, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id AND revision = $revision",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("revision", expected_revision))
            .bind(("status", write.status.as_str()))
            .bind(("amount_paid_cents", write.amount_paid_cents))
            .bind(("paid_at", write.paid_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<InvoiceRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_invoice(id)?),
            None => {
                self.fetch(tenant_id, id).await?;
                Err(DbError::StaleRevision {
                    entity: "invoice".into(),
                    id: id_str,
                }
                .into())
            }
        }
    }
}
