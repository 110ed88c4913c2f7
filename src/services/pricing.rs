use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::CheckoutPolicy;

/// Server-computed money breakdown for one order. Client-sent totals are
/// advisory only; every creation and coupon application recomputes this.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// One priced line of the draft payload.
#[derive(Clone, Debug)]
pub struct PricedItem {
    pub unit_price: Decimal,
    pub quantity: i32,
}

pub fn subtotal_of(items: &[PricedItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum()
}

/// Deterministic, no I/O. Shipping is decided on the pre-discount subtotal;
/// tax applies to the discounted base, floored at zero.
pub fn compute_totals(items: &[PricedItem], policy: &CheckoutPolicy, discount: Decimal) -> OrderTotals {
    let subtotal = subtotal_of(items);

    let shipping = if subtotal >= policy.free_shipping_threshold {
        Decimal::ZERO
    } else {
        policy.shipping_fee
    };

    let discount = discount.max(Decimal::ZERO);
    let taxable_base = (subtotal + shipping - discount).max(Decimal::ZERO);
    let tax = (taxable_base * policy.tax_rate).round_dp(2);

    OrderTotals {
        subtotal,
        shipping,
        tax,
        discount,
        total: taxable_base + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn policy() -> CheckoutPolicy {
        CheckoutPolicy::default()
    }

    fn items(lines: &[(Decimal, i32)]) -> Vec<PricedItem> {
        lines
            .iter()
            .map(|&(unit_price, quantity)| PricedItem {
                unit_price,
                quantity,
            })
            .collect()
    }

    #[test]
    fn charges_flat_fee_below_threshold() {
        let totals = compute_totals(&items(&[(dec!(299.00), 1)]), &policy(), Decimal::ZERO);

        assert_eq!(totals.subtotal, dec!(299.00));
        assert_eq!(totals.shipping, dec!(49));
        assert_eq!(totals.tax, dec!(17.40));
        assert_eq!(totals.total, dec!(365.40));
    }

    #[test]
    fn free_shipping_at_threshold_exactly() {
        let totals = compute_totals(&items(&[(dec!(599.00), 1)]), &policy(), Decimal::ZERO);

        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, dec!(29.95));
        assert_eq!(totals.total, dec!(628.95));
    }

    #[test]
    fn shipping_decision_ignores_discount() {
        // Subtotal clears the threshold; the discount pulling the payable
        // amount back under it must not reintroduce the fee.
        let totals = compute_totals(&items(&[(dec!(650.00), 1)]), &policy(), dec!(100.00));

        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, dec!(27.50));
        assert_eq!(totals.total, dec!(577.50));
    }

    #[test]
    fn multi_line_subtotal_sums_quantities() {
        let totals = compute_totals(
            &items(&[(dec!(499.00), 2), (dec!(149.50), 1)]),
            &policy(),
            Decimal::ZERO,
        );

        assert_eq!(totals.subtotal, dec!(1147.50));
        assert_eq!(totals.shipping, Decimal::ZERO);
    }

    #[test]
    fn oversized_discount_floors_base_at_zero() {
        let totals = compute_totals(&items(&[(dec!(100.00), 1)]), &policy(), dec!(500.00));

        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn tax_rounds_to_paise() {
        // 333.33 + 49 = 382.33, 5% = 19.1165 -> 19.12 (banker's rounding).
        let totals = compute_totals(&items(&[(dec!(333.33), 1)]), &policy(), Decimal::ZERO);

        assert_eq!(totals.tax, dec!(19.12));
        assert_eq!(totals.total, dec!(401.45));
    }

    #[test]
    fn empty_cart_still_prices() {
        let totals = compute_totals(&[], &policy(), Decimal::ZERO);

        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.shipping, dec!(49));
    }

    #[test]
    fn negative_discount_is_clamped() {
        let clean = compute_totals(&items(&[(dec!(200.00), 1)]), &policy(), Decimal::ZERO);
        let clamped = compute_totals(&items(&[(dec!(200.00), 1)]), &policy(), dec!(-50.00));

        assert_eq!(clamped, clean);
    }
}
