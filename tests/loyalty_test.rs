//! Loyalty card: stamp accrual on settlement, full-card claims, and the
//! user binding on minted surprise coupons.

mod common;

use axum::http::Method;
use common::{order_payload, response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn fresh_accounts_report_an_empty_card() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(Method::GET, "/api/v1/loyalty/status", None)
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["data"]["stamps"], 0);
    assert_eq!(body["data"]["cycles_completed"], 0);
    assert_eq!(body["data"]["loyalty_level"], "bronze");
    assert_eq!(body["data"]["claimed_coupons"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn settlement_accrues_a_stamp() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(&[("Indigo Tee", "250.00", 1)], "cod", None)),
        )
        .await;
    assert_eq!(response.status(), 201);

    let status = response_json(
        app.as_customer(Method::GET, "/api/v1/loyalty/status", None)
            .await,
    )
    .await;
    assert_eq!(status["data"]["stamps"], 1);
}

#[tokio::test]
async fn full_card_claims_a_surprise_coupon() {
    let app = TestApp::new().await;
    app.seed_surprise_template().await;
    app.seed_loyalty_account(app.customer_id, 10).await;

    let response = app
        .as_customer(Method::POST, "/api/v1/loyalty/claim", None)
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["data"]["coupon"]["code"]
        .as_str()
        .expect("minted coupon code")
        .starts_with("SURPRISE-"));
    assert_eq!(body["data"]["cycles_completed"], 1);
    assert_eq!(body["data"]["loyalty_level"], "silver");

    // The card resets and the minted coupon shows up on the status view.
    let status = response_json(
        app.as_customer(Method::GET, "/api/v1/loyalty/status", None)
            .await,
    )
    .await;
    assert_eq!(status["data"]["stamps"], 0);
    assert_eq!(status["data"]["claimed_coupons"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn partial_card_cannot_claim() {
    let app = TestApp::new().await;
    app.seed_surprise_template().await;
    app.seed_loyalty_account(app.customer_id, 7).await;

    let response = app
        .as_customer(Method::POST, "/api/v1/loyalty/claim", None)
        .await;
    assert_eq!(response.status(), 422);
    let body = response_json(response).await;
    assert_eq!(body["code"], "insufficient_stamps");
}

#[tokio::test]
async fn claim_is_single_shot_per_cycle() {
    let app = TestApp::new().await;
    app.seed_surprise_template().await;
    app.seed_loyalty_account(app.customer_id, 10).await;

    let first = app
        .as_customer(Method::POST, "/api/v1/loyalty/claim", None)
        .await;
    assert_eq!(first.status(), 200);

    let second = app
        .as_customer(Method::POST, "/api/v1/loyalty/claim", None)
        .await;
    assert_eq!(second.status(), 422);
}

#[tokio::test]
async fn concurrent_claims_mint_exactly_one_coupon() {
    let app = TestApp::new().await;
    app.seed_surprise_template().await;
    app.seed_loyalty_account(app.customer_id, 10).await;

    let (left, right) = tokio::join!(
        app.as_customer(Method::POST, "/api/v1/loyalty/claim", None),
        app.as_customer(Method::POST, "/api/v1/loyalty/claim", None),
    );

    let mut statuses = [left.status().as_u16(), right.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 422]);

    let status = response_json(
        app.as_customer(Method::GET, "/api/v1/loyalty/status", None)
            .await,
    )
    .await;
    assert_eq!(status["data"]["claimed_coupons"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn surprise_coupons_are_bound_to_the_claimant() {
    let app = TestApp::new().await;
    app.seed_surprise_template().await;
    app.seed_loyalty_account(app.customer_id, 10).await;

    let claim = response_json(
        app.as_customer(Method::POST, "/api/v1/loyalty/claim", None)
            .await,
    )
    .await;
    let code = claim["data"]["coupon"]["code"]
        .as_str()
        .expect("minted coupon code")
        .to_string();

    // The owner can quote it.
    let mine = app
        .as_customer(
            Method::POST,
            "/api/v1/coupons/apply",
            Some(json!({ "code": code, "order_total": "1000.00" })),
        )
        .await;
    assert_eq!(mine.status(), 200);

    // Anyone else sees it as nonexistent.
    let stranger = app.token_for_user(uuid::Uuid::new_v4());
    let theirs = app
        .request(
            Method::POST,
            "/api/v1/coupons/apply",
            Some(json!({ "code": code, "order_total": "1000.00" })),
            Some(&stranger),
        )
        .await;
    assert_eq!(theirs.status(), 422);
    let body = response_json(theirs).await;
    assert_eq!(body["code"], "coupon_not_found");
}
