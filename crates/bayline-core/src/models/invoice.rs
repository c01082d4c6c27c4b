//! Invoice domain model.
//!
//! One invoice per appointment, created in `Draft` when the source
//! appointment completes. Line-item pricing is owned by an external
//! collaborator; this model only tracks the payable totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::version::Versioned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// The single appointment this invoice bills.
    pub appointment_id: Uuid,
    pub status: InvoiceStatus,
    pub amount_due_cents: i64,
    pub amount_paid_cents: i64,
    /// Set exactly when the invoice flips to `Paid`.
    pub paid_at: Option<DateTime<Utc>>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for Invoice {
    const KIND: &'static str = "invoice";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub tenant_id: Uuid,
    pub appointment_id: Uuid,
    pub amount_due_cents: i64,
}

/// Payment fields for a compare-and-swap write.
#[derive(Debug, Clone)]
pub struct InvoiceWrite {
    pub status: InvoiceStatus,
    pub amount_paid_cents: i64,
    pub paid_at: Option<DateTime<Utc>>,
}
