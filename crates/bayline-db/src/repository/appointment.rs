//! SurrealDB implementation of [`AppointmentRepository`].
//!
//! Writes are compare-and-swap on the record's `revision`. Slot
//! verification (the double-booking guard) runs inside the same
//! statement/transaction as the write, so the conflict detector's view
//! and the write are serialized — two near-simultaneous bookings can
//! never both commit overlapping intervals.

use bayline_core::error::BaylineResult;
use bayline_core::models::{Appointment, AppointmentWrite, NewAppointment};
use bayline_core::repository::AppointmentRepository;
use bayline_core::status::AppointmentStatus;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Marker thrown by the in-transaction slot guard.
const SLOT_GUARD: &str = "slot-taken";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AppointmentRow {
    tenant_id: String,
    customer_id: String,
    vehicle_id: Option<String>,
    resource_id: Option<String>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    position: i64,
    total_cents: i64,
    paid_cents: i64,
    notes: Option<String>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AppointmentRowWithId {
    record_id: String,
    tenant_id: String,
    customer_id: String,
    vehicle_id: Option<String>,
    resource_id: Option<String>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    position: i64,
    total_cents: i64,
    paid_cents: i64,
    notes: Option<String>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<AppointmentStatus, DbError> {
    AppointmentStatus::ALL
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| DbError::Migration(format!("unknown appointment status: {s}")))
}

fn parse_uuid(s: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Migration(format!("invalid {field} UUID: {e}")))
}

fn parse_opt_uuid(s: Option<&str>, field: &str) -> Result<Option<Uuid>, DbError> {
    s.map(|v| parse_uuid(v, field)).transpose()
}

impl AppointmentRow {
    fn into_appointment(self, id: Uuid) -> Result<Appointment, DbError> {
        Ok(Appointment {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            customer_id: parse_uuid(&self.customer_id, "customer")?,
            vehicle_id: parse_opt_uuid(self.vehicle_id.as_deref(), "vehicle")?,
            resource_id: parse_opt_uuid(self.resource_id.as_deref(), "resource")?,
            start_at: self.start_at,
            end_at: self.end_at,
            status: parse_status(&self.status)?,
            position: self.position,
            total_cents: self.total_cents,
            paid_cents: self.paid_cents,
            notes: self.notes,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AppointmentRowWithId {
    fn try_into_appointment(self) -> Result<Appointment, DbError> {
        let id = parse_uuid(&self.record_id, "record")?;
        Ok(Appointment {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            customer_id: parse_uuid(&self.customer_id, "customer")?,
            vehicle_id: parse_opt_uuid(self.vehicle_id.as_deref(), "vehicle")?,
            resource_id: parse_opt_uuid(self.resource_id.as_deref(), "resource")?,
            start_at: self.start_at,
            end_at: self.end_at,
            status: parse_status(&self.status)?,
            position: self.position,
            total_cents: self.total_cents,
            paid_cents: self.paid_cents,
            notes: self.notes,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `status IN [...]` fragment for the blocking statuses, derived from
/// the state machine table.
fn blocking_status_filter() -> String {
    AppointmentStatus::blocking()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a THROWn slot-guard marker back into a typed error.
fn classify_write_error(
    err: surrealdb::Error,
    resource_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DbError {
    match resource_id {
        Some(resource_id) if err.to_string().contains(SLOT_GUARD) => DbError::SlotTaken {
            resource_id,
            start,
            end,
        },
        _ => DbError::Surreal(err),
    }
}

/// SurrealDB implementation of the Appointment repository.
#[derive(Clone)]
pub struct SurrealAppointmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAppointmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, tenant_id: Uuid, id: Uuid) -> Result<Appointment, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('appointment', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<AppointmentRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "appointment".into(),
            id: id_str,
        })?;

        row.into_appointment(id)
    }
}

impl<C: Connection> AppointmentRepository for SurrealAppointmentRepository<C> {
    async fn create(&self, input: NewAppointment) -> BaylineResult<Appointment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // With a resource the insert runs behind an in-transaction
        // overlap guard; without one there is nothing to conflict with.
        let query = if input.resource_id.is_some() {
            let blocking = blocking_status_filter();
            format!(
                "BEGIN TRANSACTION; \
                 LET $clash = (SELECT VALUE meta::id(id) FROM appointment \
                     WHERE tenant_id = $tenant_id \
                     AND resource_id = $resource_id \
                     AND status IN [{blocking}] \
                     AND start_at < $end_at AND end_at > $start_at); \
                 IF array::len($clash) > 0 {{ THROW '{SLOT_GUARD}' }}; \
                 CREATE type::record('appointment', $id) SET \
                     tenant_id = $tenant_id, customer_id = $customer_id, \
                     vehicle_id = $vehicle_id, resource_id = $resource_id, \
                     start_at = $start_at, end_at = $end_at, \
                     status = $status, position = $position, \
                     total_cents = $total_cents, notes = $notes; \
                 COMMIT TRANSACTION;"
            )
        } else {
            "CREATE type::record('appointment', $id) SET \
             tenant_id = $tenant_id, customer_id = $customer_id, \
             vehicle_id = $vehicle_id, resource_id = $resource_id, \
             start_at = $start_at, end_at = $end_at, \
             status = $status, position = $position, \
             total_cents = $total_cents, notes = $notes"
                .to_string()
        };

        let mut result = self
            .db
            .query(query)
            .bind(("id", id_str))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("customer_id", input.customer_id.to_string()))
            .bind(("vehicle_id", input.vehicle_id.map(|v| v.to_string())))
            .bind(("resource_id", input.resource_id.map(|r| r.to_string())))
            .bind(("start_at", input.start_at))
            .bind(("end_at", input.end_at))
            .bind(("status", input.status.as_str()))
            .bind(("position", input.position))
            .bind(("total_cents", input.total_cents))
            .bind(("notes", input.notes))
            .await
            .map_err(|e| {
                classify_write_error(e, input.resource_id, input.start_at, input.end_at)
            })?;

        // When the transaction aborts, every statement carries an error
        // and `check()` would surface the first one (a generic "failed
        // transaction"). Pick the THROWn slot-guard error if present so
        // classification sees the marker.
        let errors = result.take_errors();
        if let Some(err) = errors
            .into_iter()
            .min_by_key(|(idx, err)| (!err.to_string().contains(SLOT_GUARD), *idx))
            .map(|(_, err)| err)
        {
            return Err(classify_write_error(
                err,
                input.resource_id,
                input.start_at,
                input.end_at,
            )
            .into());
        }

        Ok(self.fetch(input.tenant_id, id).await?)
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> BaylineResult<Appointment> {
        Ok(self.fetch(tenant_id, id).await?)
    }

    async fn list_blocking_for_resource(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        exclude: Option<Uuid>,
    ) -> BaylineResult<Vec<Appointment>> {
        let blocking = blocking_status_filter();
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM appointment \
             WHERE tenant_id = $tenant_id AND resource_id = $resource_id \
             AND status IN [{blocking}] \
             AND meta::id(id) != $exclude"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("resource_id", resource_id.to_string()))
            // An empty string never matches a record id.
            .bind(("exclude", exclude.map(|e| e.to_string()).unwrap_or_default()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_appointment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn list_column(
        &self,
        tenant_id: Uuid,
        status: AppointmentStatus,
    ) -> BaylineResult<Vec<Appointment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM appointment \
                 WHERE tenant_id = $tenant_id AND status = $status \
                 ORDER BY position ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_appointment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn next_position(
        &self,
        tenant_id: Uuid,
        status: AppointmentStatus,
    ) -> BaylineResult<i64> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE position FROM appointment \
                 WHERE tenant_id = $tenant_id AND status = $status \
                 ORDER BY position DESC LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        let positions: Vec<i64> = result.take(0).map_err(DbError::from)?;
        Ok(positions.first().map(|p| p + 1).unwrap_or(0))
    }

    async fn shift_column_positions(
        &self,
        tenant_id: Uuid,
        status: AppointmentStatus,
        from_position: i64,
        exclude: Uuid,
    ) -> BaylineResult<()> {
        // Shifted siblings get a new revision so their stale tokens
        // are refused on subsequent writes.
        let result = self
            .db
            .query(
                "UPDATE appointment SET position += 1, revision += 1, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id AND status = $status \
                 AND position >= $from_position \
                 AND meta::id(id) != $exclude",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status.as_str()))
            .bind(("from_position", from_position))
            .bind(("exclude", exclude.to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;
        Ok(())
    }

    async fn update_checked(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_revision: u64,
        write: AppointmentWrite,
        verify_slot: bool,
    ) -> BaylineResult<Appointment> {
        let id_str = id.to_string();
        let verify_slot = verify_slot && write.resource_id.is_some();

        const SET_FIELDS: &str = "customer_id = $customer_id, \
             vehicle_id = $vehicle_id, resource_id = $resource_id, \
             start_at = $start_at, end_at = $end_at, status = $status, \
             position = $position, total_cents = $total_cents, \
             paid_cents = $paid_cents, notes = $notes, \
             revision += 1, updated_at = time::now()";

        // The revision check and (optionally) the slot re-check run in
        // the same statement as the write: the loser of a race sees an
        // empty result instead of silently overwriting.
        let query = if verify_slot {
            let blocking = blocking_status_filter();
            format!(
                "UPDATE type::record('appointment', $id) SET {SET_FIELDS} \
                 WHERE tenant_id = $tenant_id AND revision = $revision \
                 AND array::len((SELECT VALUE meta::id(id) FROM appointment \
                     WHERE tenant_id = $tenant_id \
                     AND resource_id = $resource_id \
                     AND status IN [{blocking}] \
                     AND start_at < $end_at AND end_at > $start_at \
                     AND meta::id(id) != $id)) = 0"
            )
        } else {
            format!(
                "UPDATE type::record('appointment', $id) SET {SET_FIELDS} \
                 WHERE tenant_id = $tenant_id AND revision = $revision"
            )
        };

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("revision", expected_revision))
            .bind(("customer_id", write.customer_id.to_string()))
            .bind(("vehicle_id", write.vehicle_id.map(|v| v.to_string())))
            .bind(("resource_id", write.resource_id.map(|r| r.to_string())))
            .bind(("start_at", write.start_at))
            .bind(("end_at", write.end_at))
            .bind(("status", write.status.as_str()))
            .bind(("position", write.position))
            .bind(("total_cents", write.total_cents))
            .bind(("paid_cents", write.paid_cents))
            .bind(("notes", write.notes.clone()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;
        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;

        match rows.into_iter().next() {
            Some(row) => Ok(row.into_appointment(id)?),
            None => {
                // Nothing matched: either the revision is stale or the
                // slot re-check found an overlap. Re-read to tell the
                // two apart (NotFound propagates as-is).
                let current = self.fetch(tenant_id, id).await?;
                if current.revision != expected_revision {
                    Err(DbError::StaleRevision {
                        entity: "appointment".into(),
                        id: id_str,
                    }
                    .into())
                } else {
                    match write.resource_id {
                        Some(resource_id) if verify_slot => Err(DbError::SlotTaken {
                            resource_id,
                            start: write.start_at,
                            end: write.end_at,
                        }
                        .into()),
                        _ => Err(DbError::StaleRevision {
                            entity: "appointment".into(),
                            id: id_str,
                        }
                        .into()),
                    }
                }
            }
        }
    }
}
