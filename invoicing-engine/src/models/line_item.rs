//! Line item and discount policy models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// One billable row on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[validate(length(min = 1, message = "Line item id is required"))]
    pub id: String,
    pub description: String,
    #[validate(custom(function = "validate_non_negative"))]
    pub quantity: Decimal,
    #[validate(custom(function = "validate_non_negative"))]
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// Line total (`quantity * unit_price`).
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Value must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Discount type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Value is a percentage (0-100) of the subtotal.
    Percentage,
    /// Value is a flat currency amount.
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

/// Per-invoice discount configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    #[serde(rename = "type")]
    pub kind: DiscountType,
    pub value: Decimal,
}

impl DiscountPolicy {
    pub fn percentage(value: Decimal) -> Self {
        Self {
            kind: DiscountType::Percentage,
            value,
        }
    }

    pub fn fixed(value: Decimal) -> Self {
        Self {
            kind: DiscountType::Fixed,
            value,
        }
    }

    /// No discount (a zero fixed amount).
    pub fn none() -> Self {
        Self::fixed(Decimal::ZERO)
    }
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self::none()
    }
}
