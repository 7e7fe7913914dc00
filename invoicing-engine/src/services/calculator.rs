//! Invoice totals calculation.
//!
//! `compute_totals` is pure and performs no validation: negative inputs flow
//! straight through. Callers that accept untrusted input run
//! [`validate_inputs`] first.

use crate::error::EngineError;
use crate::models::{DiscountPolicy, DiscountType, LineItem};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// Decimal places used when presenting money.
pub const DISPLAY_SCALE: u32 = 2;

/// The four derived monetary fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Totals rounded for display. Stored values are never rounded.
    pub fn rounded(&self) -> Self {
        Self {
            sub_total: round_money(self.sub_total),
            tax_amount: round_money(self.tax_amount),
            discount_amount: round_money(self.discount_amount),
            total: round_money(self.total),
        }
    }
}

/// Round to [`DISPLAY_SCALE`] places, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Derive subtotal, tax, discount and total.
///
/// Tax is charged on the undiscounted subtotal. A fixed discount is applied
/// verbatim and may exceed the subtotal, giving a negative total.
pub fn compute_totals(
    items: &[LineItem],
    tax_rate: Decimal,
    discount: &DiscountPolicy,
) -> InvoiceTotals {
    let sub_total: Decimal = items.iter().map(LineItem::total).sum();

    let discount_amount = match discount.kind {
        DiscountType::Percentage => sub_total * discount.value / Decimal::ONE_HUNDRED,
        DiscountType::Fixed => discount.value,
    };

    let tax_amount = sub_total * tax_rate / Decimal::ONE_HUNDRED;
    let total = sub_total + tax_amount - discount_amount;

    InvoiceTotals {
        sub_total,
        tax_amount,
        discount_amount,
        total,
    }
}

/// Reject inputs `compute_totals` would accept but no invoice should carry.
pub fn validate_inputs(
    items: &[LineItem],
    tax_rate: Decimal,
    discount: &DiscountPolicy,
) -> Result<(), EngineError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        item.validate()?;
        if !seen.insert(item.id.as_str()) {
            return Err(EngineError::InvalidInput(format!(
                "Duplicate line item id '{}'",
                item.id
            )));
        }
    }

    if tax_rate < Decimal::ZERO {
        return Err(EngineError::InvalidInput(
            "Tax rate must not be negative".to_string(),
        ));
    }

    if discount.value < Decimal::ZERO {
        return Err(EngineError::InvalidInput(
            "Discount value must not be negative".to_string(),
        ));
    }

    if discount.kind == DiscountType::Percentage && discount.value > Decimal::ONE_HUNDRED {
        return Err(EngineError::InvalidInput(
            "Percentage discount must be between 0 and 100".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(id: &str, quantity: Decimal, unit_price: Decimal) -> LineItem {
        LineItem::new(id, format!("Item {}", id), quantity, unit_price)
    }

    #[test]
    fn test_empty_items_yield_zero_subtotal() {
        let totals = compute_totals(&[], dec!(20), &DiscountPolicy::none());
        assert_eq!(totals.sub_total, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_end_to_end_example() {
        let items = vec![item("1", dec!(10), dec!(50)), item("2", dec!(5), dec!(100))];
        let totals = compute_totals(&items, Decimal::ZERO, &DiscountPolicy::fixed(Decimal::ZERO));

        assert_eq!(totals.sub_total, dec!(1000));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.discount_amount, Decimal::ZERO);
        assert_eq!(totals.total, dec!(1000));
    }

    #[test]
    fn test_percentage_discount() {
        let items = vec![item("1", dec!(1), dec!(100))];
        let totals = compute_totals(&items, Decimal::ZERO, &DiscountPolicy::percentage(dec!(10)));
        assert_eq!(totals.discount_amount, dec!(10));
        assert_eq!(totals.total, dec!(90));
    }

    #[test]
    fn test_fixed_discount_not_capped() {
        let items = vec![item("1", dec!(1), dec!(10))];
        let totals = compute_totals(&items, Decimal::ZERO, &DiscountPolicy::fixed(dec!(15)));
        assert_eq!(totals.discount_amount, dec!(15));
        assert_eq!(totals.total, dec!(-5));
    }

    #[test]
    fn test_tax_on_pre_discount_subtotal() {
        let items = vec![item("1", dec!(2), dec!(100))];
        let without = compute_totals(&items, dec!(20), &DiscountPolicy::none());
        let with = compute_totals(&items, dec!(20), &DiscountPolicy::percentage(dec!(50)));

        assert_eq!(without.tax_amount, dec!(40));
        assert_eq!(with.tax_amount, dec!(40));
        assert_eq!(with.total, dec!(140));
    }

    #[test]
    fn test_fractional_amounts_are_exact() {
        let items = vec![
            item("1", dec!(3), dec!(0.1)),
            item("2", dec!(1), dec!(0.2)),
        ];
        let totals = compute_totals(&items, Decimal::ZERO, &DiscountPolicy::none());
        assert_eq!(totals.sub_total, dec!(0.5));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let items = vec![item("1", dec!(7), dec!(13.37)), item("2", dec!(0.5), dec!(99.99))];
        let discount = DiscountPolicy::percentage(dec!(12.5));
        let first = compute_totals(&items, dec!(19), &discount);
        let second = compute_totals(&items, dec!(19), &discount);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_zero_quantity_item_does_not_change_subtotal() {
        let mut items = vec![item("1", dec!(4), dec!(25))];
        let before = compute_totals(&items, dec!(10), &DiscountPolicy::none());
        items.push(item("2", Decimal::ZERO, dec!(500)));
        let after = compute_totals(&items, dec!(10), &DiscountPolicy::none());

        assert_eq!(before.sub_total, after.sub_total);
        assert_eq!(before, after);
    }

    #[test]
    fn test_rounded_for_display() {
        let items = vec![item("1", dec!(1), dec!(10.005))];
        let totals = compute_totals(&items, Decimal::ZERO, &DiscountPolicy::none());
        assert_eq!(totals.sub_total, dec!(10.005));
        assert_eq!(totals.rounded().sub_total, dec!(10.01));
    }

    #[test]
    fn test_validate_rejects_negative_values() {
        let items = vec![item("1", dec!(1), dec!(10))];
        assert!(validate_inputs(&items, dec!(-1), &DiscountPolicy::none()).is_err());
        assert!(validate_inputs(&items, dec!(5), &DiscountPolicy::fixed(dec!(-3))).is_err());
        assert!(validate_inputs(&[item("1", dec!(-2), dec!(10))], dec!(5), &DiscountPolicy::none()).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids_and_large_percentage() {
        let items = vec![item("1", dec!(1), dec!(10)), item("1", dec!(2), dec!(5))];
        assert!(matches!(
            validate_inputs(&items, Decimal::ZERO, &DiscountPolicy::none()),
            Err(EngineError::InvalidInput(_))
        ));

        let single = vec![item("1", dec!(1), dec!(10))];
        assert!(validate_inputs(&single, Decimal::ZERO, &DiscountPolicy::percentage(dec!(120))).is_err());
        assert!(validate_inputs(&single, Decimal::ZERO, &DiscountPolicy::fixed(dec!(120))).is_ok());
    }
}
