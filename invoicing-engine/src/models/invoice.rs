//! Invoice model for invoicing-engine.

use crate::error::EngineError;
use crate::models::{
    AllocatedNumber, DiscountPolicy, DiscountType, InvoiceStatus, LifecycleAction, LineItem,
    NumberSource, PaymentStatus,
};
use crate::services::calculator::{compute_totals, InvoiceTotals};
use crate::services::lifecycle::validate_transition;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Party details copied onto the invoice at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PartySnapshot {
    #[validate(length(min = 1, message = "Party name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

/// Invoice document.
///
/// `sub_total`, `tax_amount`, `discount_amount` and `total` are derived from
/// `items`, `tax_rate` and the discount fields. The editing methods keep them
/// in sync; callers that mutate fields directly must call
/// [`Invoice::recompute_totals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_number: String,
    pub number_source: NumberSource,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub from: PartySnapshot,
    pub to: PartySnapshot,
    pub items: Vec<LineItem>,
    pub tax_rate: Decimal,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone, Validate)]
pub struct CreateInvoice {
    pub tenant_id: Uuid,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub from: PartySnapshot,
    pub to: PartySnapshot,
    pub items: Vec<LineItem>,
    pub tax_rate: Decimal,
    pub discount: DiscountPolicy,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter ISO code"))]
    pub currency: String,
    pub notes: Option<String>,
}

impl Invoice {
    /// Build a new `draft`/`unpaid` invoice with freshly computed totals.
    pub fn new(input: CreateInvoice, number: AllocatedNumber, now: DateTime<Utc>) -> Self {
        let mut invoice = Self {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            invoice_number: number.invoice_number,
            number_source: number.source,
            date: input.date,
            due_date: input.due_date,
            from: input.from,
            to: input.to,
            items: input.items,
            tax_rate: input.tax_rate,
            discount_type: input.discount.kind,
            discount_value: input.discount.value,
            sub_total: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            currency: input.currency,
            notes: input.notes,
            status: InvoiceStatus::Draft,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
            sent_at: None,
            viewed_at: None,
            paid_at: None,
            cancelled_at: None,
        };
        invoice.recompute_totals();
        invoice
    }

    pub fn discount_policy(&self) -> DiscountPolicy {
        DiscountPolicy {
            kind: self.discount_type,
            value: self.discount_value,
        }
    }

    /// The derived totals as currently stored on the invoice.
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            sub_total: self.sub_total,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            total: self.total,
        }
    }

    /// Recompute the derived monetary fields from items, tax and discount.
    pub fn recompute_totals(&mut self) {
        let totals = compute_totals(&self.items, self.tax_rate, &self.discount_policy());
        self.sub_total = totals.sub_total;
        self.tax_amount = totals.tax_amount;
        self.discount_amount = totals.discount_amount;
        self.total = totals.total;
    }

    /// Outstanding balance (may be negative when over-discounted or overpaid).
    pub fn amount_due(&self) -> Decimal {
        self.total - self.amount_paid
    }

    pub fn set_items(&mut self, items: Vec<LineItem>, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.items = items;
        self.touch(now);
        Ok(())
    }

    pub fn add_item(&mut self, item: LineItem, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.ensure_editable()?;
        if self.items.iter().any(|existing| existing.id == item.id) {
            return Err(EngineError::InvalidInput(format!(
                "Line item '{}' already exists on this invoice",
                item.id
            )));
        }
        self.items.push(item);
        self.touch(now);
        Ok(())
    }

    /// Remove a line item by id. Returns `false` when no item matched.
    pub fn remove_item(&mut self, item_id: &str, now: DateTime<Utc>) -> Result<bool, EngineError> {
        self.ensure_editable()?;
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch(now);
        }
        Ok(removed)
    }

    pub fn set_tax_rate(&mut self, tax_rate: Decimal, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.tax_rate = tax_rate;
        self.touch(now);
        Ok(())
    }

    pub fn set_discount(
        &mut self,
        discount: DiscountPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.ensure_editable()?;
        self.discount_type = discount.kind;
        self.discount_value = discount.value;
        self.touch(now);
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), EngineError> {
        validate_transition(self.status, LifecycleAction::Edit).map(|_| ())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.recompute_totals();
        self.updated_at = now;
    }
}
