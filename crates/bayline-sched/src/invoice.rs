//! Invoice trigger and payment recording.
//!
//! [`InvoiceService`] implements the [`CompletionHook`] contract: when
//! an appointment completes, a draft invoice is created with the
//! appointment's accumulated total as the amount due. Payment flips the
//! invoice to `Paid` exactly when the amount due is fully covered;
//! overpayment is rejected, never clamped.

use bayline_core::error::{BaylineError, BaylineResult};
use bayline_core::models::{Appointment, Invoice, InvoiceStatus, InvoiceWrite, NewInvoice};
use bayline_core::repository::InvoiceRepository;
use bayline_core::version::Versioned;
use chrono::Utc;
use uuid::Uuid;

use crate::hook::CompletionHook;

pub struct InvoiceService<I: InvoiceRepository> {
    invoices: I,
}

impl<I: InvoiceRepository> InvoiceService<I> {
    pub fn new(invoices: I) -> Self {
        Self { invoices }
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> BaylineResult<Invoice> {
        self.invoices.get(tenant_id, id).await
    }

    pub async fn get_by_appointment(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
    ) -> BaylineResult<Invoice> {
        self.invoices.get_by_appointment(tenant_id, appointment_id).await
    }

    /// Record a payment against a draft invoice.
    ///
    /// Rejects non-positive amounts, payments against an already-paid
    /// invoice, and any amount that would push `amount_paid` past
    /// `amount_due` — all without mutating the invoice. The write is
    /// revision-guarded so two concurrent payments cannot both apply.
    pub async fn record_payment(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        amount_cents: i64,
    ) -> BaylineResult<Invoice> {
        if amount_cents <= 0 {
            return Err(BaylineError::validation("payment amount must be positive"));
        }

        let current = self.invoices.get(tenant_id, invoice_id).await?;
        if current.status == InvoiceStatus::Paid {
            return Err(BaylineError::validation(format!(
                "invoice {invoice_id} is already paid"
            )));
        }

        let amount_paid_cents = current.amount_paid_cents + amount_cents;
        if amount_paid_cents > current.amount_due_cents {
            return Err(BaylineError::validation(format!(
                "payment of {amount_cents} cents would exceed the amount due ({} of {} cents already paid)",
                current.amount_paid_cents, current.amount_due_cents
            )));
        }

        let fully_paid = amount_paid_cents == current.amount_due_cents;
        let write = InvoiceWrite {
            status: if fully_paid {
                InvoiceStatus::Paid
            } else {
                InvoiceStatus::Draft
            },
            amount_paid_cents,
            paid_at: fully_paid.then(Utc::now),
        };

        let updated = self
            .invoices
            .update_checked(tenant_id, invoice_id, current.revision, write)
            .await?;
        tracing::info!(
            invoice_id = %updated.id,
            amount_cents,
            status = ?updated.status,
            "payment recorded"
        );
        Ok(updated)
    }
}

impl<I: InvoiceRepository> CompletionHook for InvoiceService<I> {
    async fn on_completed(&self, appointment: &Appointment) -> BaylineResult<Uuid> {
        let invoice = self
            .invoices
            .create(NewInvoice {
                tenant_id: appointment.tenant_id,
                appointment_id: appointment.id,
                amount_due_cents: appointment.total_cents,
            })
            .await?;
        tracing::info!(
            invoice_id = %invoice.id,
            appointment_id = %appointment.id,
            amount_due_cents = invoice.amount_due_cents,
            "draft invoice created"
        );
        Ok(invoice.record_id())
    }
}
