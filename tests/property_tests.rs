//! Property-based tests for the pricing engine.
//!
//! These use proptest to pin the money invariants across a wide range of
//! carts, catching edge cases the unit tests miss.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use threadline_api::{
    config::CheckoutPolicy,
    services::pricing::{compute_totals, subtotal_of, PricedItem},
};

fn unit_price_strategy() -> impl Strategy<Value = Decimal> {
    // Paise-denominated prices up to 5000.00.
    (0i64..500_000).prop_map(|paise| Decimal::new(paise, 2))
}

fn line_strategy() -> impl Strategy<Value = PricedItem> {
    (unit_price_strategy(), 1i32..6).prop_map(|(unit_price, quantity)| PricedItem {
        unit_price,
        quantity,
    })
}

fn cart_strategy() -> impl Strategy<Value = Vec<PricedItem>> {
    proptest::collection::vec(line_strategy(), 0..6)
}

fn discount_strategy() -> impl Strategy<Value = Decimal> {
    (-100_000i64..1_000_000).prop_map(|paise| Decimal::new(paise, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn total_is_the_sum_of_its_parts(cart in cart_strategy(), discount in discount_strategy()) {
        let policy = CheckoutPolicy::default();
        let totals = compute_totals(&cart, &policy, discount);

        let payable_base =
            (totals.subtotal + totals.shipping - totals.discount).max(Decimal::ZERO);
        prop_assert_eq!(totals.total, payable_base + totals.tax);
    }

    #[test]
    fn shipping_is_free_exactly_at_the_threshold(cart in cart_strategy()) {
        let policy = CheckoutPolicy::default();
        let totals = compute_totals(&cart, &policy, Decimal::ZERO);

        if totals.subtotal >= policy.free_shipping_threshold {
            prop_assert_eq!(totals.shipping, Decimal::ZERO);
        } else {
            prop_assert_eq!(totals.shipping, policy.shipping_fee);
        }
    }

    #[test]
    fn tax_is_the_rate_applied_to_the_discounted_base(
        cart in cart_strategy(),
        discount in discount_strategy(),
    ) {
        let policy = CheckoutPolicy::default();
        let totals = compute_totals(&cart, &policy, discount);

        let payable_base =
            (totals.subtotal + totals.shipping - totals.discount).max(Decimal::ZERO);
        prop_assert_eq!(totals.tax, (payable_base * policy.tax_rate).round_dp(2));
    }

    #[test]
    fn no_money_field_goes_negative(cart in cart_strategy(), discount in discount_strategy()) {
        let totals = compute_totals(&cart, &CheckoutPolicy::default(), discount);

        prop_assert!(totals.subtotal >= Decimal::ZERO);
        prop_assert!(totals.shipping >= Decimal::ZERO);
        prop_assert!(totals.tax >= Decimal::ZERO);
        prop_assert!(totals.discount >= Decimal::ZERO);
        prop_assert!(totals.total >= Decimal::ZERO);
    }

    #[test]
    fn a_discount_never_raises_the_total(cart in cart_strategy(), discount in discount_strategy()) {
        let policy = CheckoutPolicy::default();
        let with_discount = compute_totals(&cart, &policy, discount);
        let without = compute_totals(&cart, &policy, Decimal::ZERO);

        prop_assert!(with_discount.total <= without.total);
    }

    #[test]
    fn subtotal_matches_the_line_sum(cart in cart_strategy()) {
        let expected: Decimal = cart
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();

        prop_assert_eq!(subtotal_of(&cart), expected);
    }

    #[test]
    fn adding_a_line_never_lowers_the_subtotal(
        cart in cart_strategy(),
        extra in line_strategy(),
    ) {
        let before = subtotal_of(&cart);
        let mut grown = cart;
        grown.push(extra);

        prop_assert!(subtotal_of(&grown) >= before);
    }
}

#[test]
fn a_flat_discount_moves_the_total_by_itself_plus_tax() {
    // Mid-range cart clear of both the zero floor and the free shipping
    // threshold, so the relationship is exact.
    let policy = CheckoutPolicy::default();
    let cart = [PricedItem {
        unit_price: dec!(800.00),
        quantity: 1,
    }];

    let clean = compute_totals(&cart, &policy, Decimal::ZERO);
    let discounted = compute_totals(&cart, &policy, dec!(100.00));

    // 100 off the base plus the 5 of tax that base carried.
    assert_eq!(clean.total - discounted.total, dec!(105.00));
}
