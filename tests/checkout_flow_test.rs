//! COD checkout settlement: server-side pricing, coupon commitment, and
//! validation failures.

mod common;

use std::str::FromStr;

use axum::http::Method;
use common::{order_payload, response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use threadline_api::entities::DiscountKind;

fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("money fields serialize as strings"))
        .expect("money fields parse as decimals")
}

#[tokio::test]
async fn cod_checkout_prices_below_free_shipping_threshold() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(&[("Indigo Tee", "250.00", 2)], "cod", None)),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    let order = &body["data"]["order"];

    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_method"], "cod");
    assert_eq!(order["is_paid"], false);
    assert_eq!(money(&order["subtotal"]), dec!(500));
    assert_eq!(money(&order["shipping_fee"]), dec!(49));
    assert_eq!(money(&order["tax_amount"]), dec!(25));
    assert_eq!(money(&order["discount_amount"]), dec!(0));
    assert_eq!(money(&order["total_price"]), dec!(574));
    assert!(order["order_number"]
        .as_str()
        .expect("order number present")
        .starts_with("TL-"));

    let items = body["data"]["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
}

#[tokio::test]
async fn subtotal_at_threshold_ships_free() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(&[("Linen Shirt", "599.00", 1)], "cod", None)),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    let order = &body["data"]["order"];
    assert_eq!(money(&order["shipping_fee"]), dec!(0));
    assert_eq!(money(&order["tax_amount"]), dec!(29.95));
    assert_eq!(money(&order["total_price"]), dec!(628.95));
}

#[tokio::test]
async fn coupon_is_committed_at_settlement() {
    let app = TestApp::new().await;
    app.seed_coupon(
        "WELCOME100",
        DiscountKind::Flat,
        dec!(100),
        dec!(500),
        30,
        None,
    )
    .await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(
                &[("Denim Jacket", "700.00", 1)],
                "cod",
                Some("WELCOME100"),
            )),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    let order = &body["data"]["order"];
    assert_eq!(order["coupon_code"], "WELCOME100");
    assert_eq!(money(&order["discount_amount"]), dec!(100));
    // Tax applies to the discounted base: (700 - 100) * 5%.
    assert_eq!(money(&order["tax_amount"]), dec!(30));
    assert_eq!(money(&order["total_price"]), dec!(630));

    // The same code cannot settle a second order.
    let replay = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(
                &[("Denim Jacket", "700.00", 1)],
                "cod",
                Some("WELCOME100"),
            )),
        )
        .await;
    assert_eq!(replay.status(), 422);
    let replay_body = response_json(replay).await;
    assert_eq!(replay_body["code"], "coupon_already_used");
}

#[tokio::test]
async fn coupon_below_minimum_rejects_settlement() {
    let app = TestApp::new().await;
    app.seed_coupon(
        "BIGSPEND",
        DiscountKind::Percentage,
        dec!(10),
        dec!(2000),
        30,
        None,
    )
    .await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(
                &[("Indigo Tee", "250.00", 1)],
                "cod",
                Some("BIGSPEND"),
            )),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    assert_eq!(body["code"], "coupon_min_order_not_met");
}

#[tokio::test]
async fn online_payment_method_is_rejected_on_the_cod_path() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(&[("Indigo Tee", "250.00", 1)], "online", None)),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(&[], "cod", None)),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn checkout_requires_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(&[("Indigo Tee", "250.00", 1)], "cod", None)),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn coupon_preview_does_not_consume_the_code() {
    let app = TestApp::new().await;
    app.seed_coupon(
        "PREVIEW10",
        DiscountKind::Percentage,
        dec!(10),
        dec!(0),
        30,
        None,
    )
    .await;

    for _ in 0..2 {
        let response = app
            .as_customer(
                Method::POST,
                "/api/v1/coupons/apply",
                Some(serde_json::json!({ "code": "PREVIEW10", "order_total": "1000.00" })),
            )
            .await;
        assert_eq!(response.status(), 200);
        let body = response_json(response).await;
        assert_eq!(money(&body["data"]["discount"]), dec!(100));
        assert_eq!(money(&body["data"]["new_total"]), dec!(900));
    }
}
