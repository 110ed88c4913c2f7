use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use threadline_api::{
    auth::{Claims, JwtVerifier},
    config::{AppConfig, CheckoutPolicy, GatewayConfig},
    db,
    entities::{coupon, loyalty_account, surprise_template, DiscountKind, LoyaltyLevel},
    events,
    handlers::AppServices,
    services::{
        inventory::InMemoryInventoryClient, notifications::LoggingNotificationClient,
        payments::LocalGatewayClient,
    },
    AppState,
};

const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_definitely_at_least_64_characters_long";

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub customer_id: Uuid,
    pub admin_id: Uuid,
    customer_token: String,
    admin_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = test_config();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(
            event_rx,
            Arc::new(LoggingNotificationClient::default()),
        ));
        let event_sender = Arc::new(event_sender);

        let services = AppServices::new(
            pool.clone(),
            &cfg,
            Arc::new(InMemoryInventoryClient::default()),
            Arc::new(LocalGatewayClient::default()),
            Some(event_sender.clone()),
        );

        let state = AppState {
            db: pool,
            jwt: JwtVerifier::new(&cfg.jwt_secret),
            event_sender: Some(event_sender),
            services,
            config: cfg.clone(),
        };

        let router = Router::new()
            .nest("/api/v1", threadline_api::api_v1_routes())
            .with_state(state.clone());

        let customer_id = Uuid::new_v4();
        let admin_id = Uuid::new_v4();

        Self {
            router,
            state,
            customer_id,
            admin_id,
            customer_token: token_for(customer_id, &[]),
            admin_token: token_for(admin_id, &["admin"]),
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn as_customer(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(&self.customer_token))
            .await
    }

    pub async fn as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(&self.admin_token))
            .await
    }

    /// Mint a bearer token for an arbitrary second customer.
    #[allow(dead_code)]
    pub fn token_for_user(&self, user_id: Uuid) -> String {
        token_for(user_id, &[])
    }

    /// Insert a campaign coupon directly, bypassing the API.
    #[allow(dead_code)]
    pub async fn seed_coupon(
        &self,
        code: &str,
        kind: DiscountKind,
        value: Decimal,
        min_order: Decimal,
        expires_in_days: i64,
        user_id: Option<Uuid>,
    ) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            description: Set(None),
            discount_kind: Set(kind),
            discount_value: Set(value),
            min_order: Set(min_order),
            expires_at: Set(Utc::now() + Duration::days(expires_in_days)),
            user_id: Set(user_id),
            used_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.state.db)
        .await
        .expect("seed coupon for tests")
    }

    /// Insert an active surprise template so loyalty claims can mint.
    #[allow(dead_code)]
    pub async fn seed_surprise_template(&self) -> surprise_template::Model {
        surprise_template::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Festive 15% off".to_string()),
            discount_kind: Set(DiscountKind::Percentage),
            discount_value: Set(Decimal::from(15)),
            min_order: Set(Decimal::from(499)),
            validity_days: Set(30),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&self.state.db)
        .await
        .expect("seed surprise template for tests")
    }

    /// Seed a loyalty account at an arbitrary stamp count.
    #[allow(dead_code)]
    pub async fn seed_loyalty_account(&self, user_id: Uuid, stamps: i32) -> loyalty_account::Model {
        loyalty_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            stamps: Set(stamps),
            cycles_completed: Set(0),
            loyalty_level: Set(LoyaltyLevel::Bronze),
            updated_at: Set(Utc::now()),
        }
        .insert(&self.state.db)
        .await
        .expect("seed loyalty account for tests")
    }

    /// Walk an order through the admin fulfilment chain to `delivered`.
    #[allow(dead_code)]
    pub async fn deliver_order(&self, order_id: &str) {
        for status in ["processing", "shipped", "delivered"] {
            let response = self
                .as_admin(
                    Method::PUT,
                    &format!("/api/v1/admin/orders/{}/status", order_id),
                    Some(json!({ "status": status })),
                )
                .await;
            assert_eq!(
                response.status(),
                200,
                "advancing order to {} should succeed",
                status
            );
        }
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 300,
        db_acquire_timeout_secs: 5,
        event_channel_capacity: 64,
        policy: CheckoutPolicy::default(),
        gateway: GatewayConfig::default(),
        inventory_service_url: None,
        notification_service_url: None,
    }
}

fn token_for(user_id: Uuid, roles: &[&str]) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        roles: roles.iter().map(|role| role.to_string()).collect(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("encode test token")
}

/// Decode a JSON response body.
#[allow(dead_code)]
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Standard checkout payload; `items` is a list of (name, unit_price, quantity).
#[allow(dead_code)]
pub fn order_payload(
    items: &[(&str, &str, i32)],
    payment_method: &str,
    coupon_code: Option<&str>,
) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(name, price, qty)| {
            json!({
                "product_id": Uuid::new_v4(),
                "name": name,
                "size": "M",
                "color": "indigo",
                "quantity": qty,
                "unit_price": price,
                "image_url": null,
            })
        })
        .collect();

    json!({
        "items": items,
        "shipping_address": {
            "name": "Asha Verma",
            "phone": "+91-9000000001",
            "line1": "14 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "postal_code": "560001",
        },
        "payment_method": payment_method,
        "coupon_code": coupon_code,
    })
}
