//! Threadline API Library
//!
//! Order settlement and post-sale lifecycle engine for the Threadline
//! storefront: pricing, coupons, payment verification, order and return
//! state machines, and the loyalty ledger.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod telemetry;

use axum::{
    extract::{FromRef, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

pub use handlers::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: config::AppConfig,
    pub jwt: auth::JwtVerifier,
    pub event_sender: Option<Arc<events::EventSender>>,
    pub services: AppServices,
}

impl FromRef<AppState> for auth::JwtVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

pub(crate) fn default_page() -> u64 {
    1
}
pub(crate) fn default_per_page() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: telemetry::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API routes mounted under /api/v1
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Payments
        .route(
            "/payment/create-intent",
            post(handlers::payments::create_intent),
        )
        .route("/payment/verify", post(handlers::payments::verify_payment))
        // Orders
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_my_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/cancel", put(handlers::orders::cancel_order))
        .route("/orders/:id/return", put(handlers::orders::request_return))
        // Coupons
        .route("/coupons/apply", post(handlers::coupons::apply_coupon))
        // Loyalty
        .route("/loyalty/status", get(handlers::loyalty::loyalty_status))
        .route("/loyalty/claim", post(handlers::loyalty::claim_reward))
        // Admin
        .route("/admin/orders", get(handlers::admin::list_orders))
        .route(
            "/admin/orders/:id/status",
            put(handlers::admin::update_order_status),
        )
        .route(
            "/admin/orders/:id/confirm-paid",
            put(handlers::admin::confirm_paid),
        )
        .route(
            "/admin/orders/:id/return-status",
            put(handlers::admin::update_return_status),
        )
        .route(
            "/admin/orders/:id/process-refund",
            put(handlers::admin::process_refund),
        )
        .route(
            "/admin/orders/:id/complete-refund",
            put(handlers::admin::complete_refund),
        )
}

async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "threadline-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
