//! Invoice lifecycle state machine.
//!
//! User actions are validated against an explicit transition table before
//! anything is written, so a rejected action leaves the invoice untouched.
//! Overdue is never stored: [`effective_status`] and
//! [`effective_payment_status`] derive it from the due date on read.

use crate::error::EngineError;
use crate::models::{Invoice, InvoiceStatus, LifecycleAction, PaymentStatus};
use crate::services::metrics::TRANSITIONS_TOTAL;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Resolve the status an action moves an invoice to.
pub fn validate_transition(
    status: InvoiceStatus,
    action: LifecycleAction,
) -> Result<InvoiceStatus, EngineError> {
    use InvoiceStatus::*;

    let next = match (action, status) {
        (LifecycleAction::Send, Draft) => Some(Sent),
        (LifecycleAction::MarkViewed, Sent | Overdue) => Some(Viewed),
        (LifecycleAction::MarkPaid, Draft | Sent | Viewed | Overdue | Paid) => Some(Paid),
        (LifecycleAction::Cancel, Draft | Sent | Viewed | Overdue) => Some(Cancelled),
        (LifecycleAction::RecordPayment, Draft | Sent | Viewed | Overdue) => Some(status),
        (LifecycleAction::Edit, s) if s != Cancelled => Some(s),
        _ => None,
    };

    next.ok_or(EngineError::InvalidTransition {
        from: status,
        action,
    })
}

/// Check a move along the payment axis: unpaid -> partial -> paid.
pub fn validate_payment_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), EngineError> {
    use PaymentStatus::*;

    match (from, to) {
        (Unpaid | Partial | Overdue, Partial | Paid) => Ok(()),
        _ => Err(EngineError::InvalidInput(format!(
            "Cannot move payment status from '{}' to '{}'",
            from, to
        ))),
    }
}

fn record_outcome(invoice: &Invoice, action: LifecycleAction, result: &Result<(), EngineError>) {
    match result {
        Ok(()) => {
            TRANSITIONS_TOTAL
                .with_label_values(&[action.as_str(), "applied"])
                .inc();
            info!(
                invoice_id = %invoice.id,
                invoice_number = %invoice.invoice_number,
                action = %action,
                status = %invoice.status,
                payment_status = %invoice.payment_status,
                "Invoice transition applied"
            );
        }
        Err(e) => {
            TRANSITIONS_TOTAL
                .with_label_values(&[action.as_str(), "rejected"])
                .inc();
            warn!(
                invoice_id = %invoice.id,
                invoice_number = %invoice.invoice_number,
                action = %action,
                error = %e,
                "Invoice transition rejected"
            );
        }
    }
}

/// Mark a draft invoice as sent.
pub fn send_invoice(invoice: &mut Invoice, now: DateTime<Utc>) -> Result<(), EngineError> {
    let result = validate_transition(invoice.status, LifecycleAction::Send).map(|next| {
        invoice.status = next;
        invoice.sent_at = Some(now);
        invoice.updated_at = now;
    });
    record_outcome(invoice, LifecycleAction::Send, &result);
    result
}

/// Record that the recipient opened the invoice.
pub fn mark_viewed(invoice: &mut Invoice, now: DateTime<Utc>) -> Result<(), EngineError> {
    let result = validate_transition(invoice.status, LifecycleAction::MarkViewed).map(|next| {
        invoice.status = next;
        invoice.viewed_at = Some(now);
        invoice.updated_at = now;
    });
    record_outcome(invoice, LifecycleAction::MarkViewed, &result);
    result
}

/// Settle the invoice in full. Marking a paid invoice paid again is a no-op.
pub fn mark_paid(invoice: &mut Invoice, now: DateTime<Utc>) -> Result<(), EngineError> {
    let already_paid = invoice.status == InvoiceStatus::Paid;
    let result = validate_transition(invoice.status, LifecycleAction::MarkPaid).map(|next| {
        if !already_paid {
            settle(invoice, next, now);
        }
    });
    record_outcome(invoice, LifecycleAction::MarkPaid, &result);
    result
}

/// Cancel the invoice. Cancelled is terminal.
pub fn cancel_invoice(invoice: &mut Invoice, now: DateTime<Utc>) -> Result<(), EngineError> {
    let result = validate_transition(invoice.status, LifecycleAction::Cancel).map(|next| {
        invoice.status = next;
        invoice.cancelled_at = Some(now);
        invoice.updated_at = now;
    });
    record_outcome(invoice, LifecycleAction::Cancel, &result);
    result
}

/// Apply a payment of `amount`.
///
/// Payments accumulate in `amount_paid`. Once the total is covered the
/// invoice is settled exactly as by [`mark_paid`].
pub fn record_payment(
    invoice: &mut Invoice,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let result = apply_payment(invoice, amount, now);
    record_outcome(invoice, LifecycleAction::RecordPayment, &result);
    result
}

fn apply_payment(invoice: &mut Invoice, amount: Decimal, now: DateTime<Utc>) -> Result<(), EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidInput(format!(
            "Payment amount must be positive, got {}",
            amount
        )));
    }

    let status = validate_transition(invoice.status, LifecycleAction::RecordPayment)?;
    let amount_paid = invoice.amount_paid + amount;

    if amount_paid >= invoice.total {
        validate_payment_transition(invoice.payment_status, PaymentStatus::Paid)?;
        settle(invoice, InvoiceStatus::Paid, now);
        invoice.amount_paid = amount_paid;
    } else {
        validate_payment_transition(invoice.payment_status, PaymentStatus::Partial)?;
        invoice.status = status;
        invoice.payment_status = PaymentStatus::Partial;
        invoice.amount_paid = amount_paid;
        invoice.updated_at = now;
    }

    Ok(())
}

fn settle(invoice: &mut Invoice, status: InvoiceStatus, now: DateTime<Utc>) {
    invoice.status = status;
    invoice.payment_status = PaymentStatus::Paid;
    invoice.amount_paid = invoice.total;
    invoice.paid_at = Some(now);
    invoice.updated_at = now;
}

fn is_past_due(invoice: &Invoice, today: NaiveDate) -> bool {
    invoice.due_date < today
}

/// Workflow status as it should be displayed on `today`.
pub fn effective_status(invoice: &Invoice, today: NaiveDate) -> InvoiceStatus {
    match invoice.status {
        InvoiceStatus::Paid | InvoiceStatus::Cancelled => invoice.status,
        InvoiceStatus::Overdue if invoice.payment_status == PaymentStatus::Paid => {
            InvoiceStatus::Paid
        }
        _ if invoice.payment_status == PaymentStatus::Paid => invoice.status,
        _ if is_past_due(invoice, today) => InvoiceStatus::Overdue,
        InvoiceStatus::Overdue => InvoiceStatus::Sent,
        status => status,
    }
}

/// Payment status as it should be displayed on `today`.
pub fn effective_payment_status(invoice: &Invoice, today: NaiveDate) -> PaymentStatus {
    match invoice.payment_status {
        PaymentStatus::Paid => PaymentStatus::Paid,
        _ if invoice.status == InvoiceStatus::Cancelled => invoice.payment_status,
        PaymentStatus::Unpaid | PaymentStatus::Partial if is_past_due(invoice, today) => {
            PaymentStatus::Overdue
        }
        PaymentStatus::Overdue if !is_past_due(invoice, today) => {
            if invoice.amount_paid > Decimal::ZERO {
                PaymentStatus::Partial
            } else {
                PaymentStatus::Unpaid
            }
        }
        status => status,
    }
}
