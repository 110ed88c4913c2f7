//! Online payment verification: intent creation, signature checks, and
//! idempotent settlement on verify replays.

mod common;

use axum::http::Method;
use common::{order_payload, response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_intent_returns_gateway_order() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/payment/create-intent",
            Some(json!({ "amount": "574.00" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["data"]["gateway_order_id"]
        .as_str()
        .expect("gateway order id")
        .starts_with("order_local_"));
    assert_eq!(body["data"]["currency"], "INR");
}

#[tokio::test]
async fn create_intent_rejects_non_positive_amounts() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/payment/create-intent",
            Some(json!({ "amount": "0" })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn verified_payment_settles_a_paid_processing_order() {
    let app = TestApp::new().await;

    let intent = response_json(
        app.as_customer(
            Method::POST,
            "/api/v1/payment/create-intent",
            Some(json!({ "amount": "574.00" })),
        )
        .await,
    )
    .await;
    let gateway_order_id = intent["data"]["gateway_order_id"]
        .as_str()
        .expect("gateway order id")
        .to_string();

    let signature = app
        .state
        .services
        .payments
        .signature_for(&gateway_order_id, "pay_0001")
        .expect("signature");

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/payment/verify",
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "gateway_payment_id": "pay_0001",
                "gateway_signature": signature,
                "order": order_payload(&[("Indigo Tee", "250.00", 2)], "online", None),
            })),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    let order = &body["data"]["order"];
    assert_eq!(order["status"], "processing");
    assert_eq!(order["is_paid"], true);
    assert_eq!(order["payment_method"], "online");
    assert_eq!(order["gateway_order_id"], gateway_order_id.as_str());
}

#[tokio::test]
async fn verify_replay_returns_the_settled_order_unchanged() {
    let app = TestApp::new().await;

    let signature = app
        .state
        .services
        .payments
        .signature_for("order_replay_1", "pay_0002")
        .expect("signature");
    let payload = json!({
        "gateway_order_id": "order_replay_1",
        "gateway_payment_id": "pay_0002",
        "gateway_signature": signature,
        "order": order_payload(&[("Linen Shirt", "599.00", 1)], "online", None),
    });

    let first = response_json(
        app.as_customer(Method::POST, "/api/v1/payment/verify", Some(payload.clone()))
            .await,
    )
    .await;
    let second = response_json(
        app.as_customer(Method::POST, "/api/v1/payment/verify", Some(payload))
            .await,
    )
    .await;

    assert_eq!(first["data"]["order"]["id"], second["data"]["order"]["id"]);

    // Only one order exists for the receipt.
    let orders = response_json(app.as_customer(Method::GET, "/api/v1/orders", None).await).await;
    assert_eq!(orders["data"]["total"], 1);
}

#[tokio::test]
async fn tampered_signature_is_rejected_and_nothing_settles() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/payment/verify",
            Some(json!({
                "gateway_order_id": "order_tampered",
                "gateway_payment_id": "pay_0003",
                "gateway_signature": "deadbeef",
                "order": order_payload(&[("Indigo Tee", "250.00", 1)], "online", None),
            })),
        )
        .await;
    assert_eq!(response.status(), 409);
    let body = response_json(response).await;
    assert_eq!(body["code"], "payment_verification_failed");

    let orders = response_json(app.as_customer(Method::GET, "/api/v1/orders", None).await).await;
    assert_eq!(orders["data"]["total"], 0);
}

#[tokio::test]
async fn verify_rejects_cod_payloads() {
    let app = TestApp::new().await;

    let signature = app
        .state
        .services
        .payments
        .signature_for("order_cod_mix", "pay_0004")
        .expect("signature");

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/payment/verify",
            Some(json!({
                "gateway_order_id": "order_cod_mix",
                "gateway_payment_id": "pay_0004",
                "gateway_signature": signature,
                "order": order_payload(&[("Indigo Tee", "250.00", 1)], "cod", None),
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}
