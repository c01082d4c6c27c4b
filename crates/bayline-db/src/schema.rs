//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Every mutable table carries a
//! `revision` counter backing the optimistic-concurrency token.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Appointments (tenant scope)
-- =======================================================================
DEFINE TABLE appointment SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE appointment TYPE string;
DEFINE FIELD customer_id ON TABLE appointment TYPE string;
DEFINE FIELD vehicle_id ON TABLE appointment TYPE option<string>;
DEFINE FIELD resource_id ON TABLE appointment TYPE option<string>;
DEFINE FIELD start_at ON TABLE appointment TYPE datetime;
DEFINE FIELD end_at ON TABLE appointment TYPE datetime;
DEFINE FIELD status ON TABLE appointment TYPE string \
    ASSERT $value IN ['Scheduled', 'InProgress', 'Ready', 'Completed', \
    'NoShow', 'Canceled'];
DEFINE FIELD position ON TABLE appointment TYPE int;
DEFINE FIELD total_cents ON TABLE appointment TYPE int DEFAULT 0;
DEFINE FIELD paid_cents ON TABLE appointment TYPE int DEFAULT 0;
DEFINE FIELD notes ON TABLE appointment TYPE option<string>;
DEFINE FIELD revision ON TABLE appointment TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_appointment_tenant_resource ON TABLE appointment \
    COLUMNS tenant_id, resource_id;
DEFINE INDEX idx_appointment_tenant_status ON TABLE appointment \
    COLUMNS tenant_id, status;

-- =======================================================================
-- Customers (tenant scope)
-- =======================================================================
DEFINE TABLE customer SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE customer TYPE string;
DEFINE FIELD name ON TABLE customer TYPE string;
DEFINE FIELD email ON TABLE customer TYPE option<string>;
DEFINE FIELD phone ON TABLE customer TYPE option<string>;
DEFINE FIELD revision ON TABLE customer TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_customer_tenant ON TABLE customer COLUMNS tenant_id;

-- =======================================================================
-- Vehicles (tenant scope)
-- =======================================================================
DEFINE TABLE vehicle SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE vehicle TYPE string;
DEFINE FIELD customer_id ON TABLE vehicle TYPE string;
DEFINE FIELD label ON TABLE vehicle TYPE string;
DEFINE FIELD plate ON TABLE vehicle TYPE option<string>;
DEFINE FIELD revision ON TABLE vehicle TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE vehicle TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE vehicle TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_vehicle_tenant_customer ON TABLE vehicle \
    COLUMNS tenant_id, customer_id;

-- =======================================================================
-- Invoices (tenant scope, one per appointment)
-- =======================================================================
DEFINE TABLE invoice SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE invoice TYPE string;
DEFINE FIELD appointment_id ON TABLE invoice TYPE string;
DEFINE FIELD status ON TABLE invoice TYPE string \
    ASSERT $value IN ['Draft', 'Paid'];
DEFINE FIELD amount_due_cents ON TABLE invoice TYPE int;
DEFINE FIELD amount_paid_cents ON TABLE invoice TYPE int DEFAULT 0;
DEFINE FIELD paid_at ON TABLE invoice TYPE option<datetime>;
DEFINE FIELD revision ON TABLE invoice TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE invoice TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE invoice TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invoice_tenant_appointment ON TABLE invoice \
    COLUMNS tenant_id, appointment_id UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
