//! Vehicle domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::version::Versioned;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    /// Human-readable description, e.g. `2019 Honda Civic`.
    pub label: String,
    pub plate: Option<String>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for Vehicle {
    const KIND: &'static str = "vehicle";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVehicle {
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub label: String,
    pub plate: Option<String>,
}

/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub label: Option<String>,
    pub plate: Option<Option<String>>,
}
