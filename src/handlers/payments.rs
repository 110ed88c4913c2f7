use axum::{extract::State, http::StatusCode, response::Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    metrics,
    services::orders::{CreateOrderRequest, GatewayReceipt, OrderDetails},
    services::payments::PaymentIntent,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateIntentRequest {
    /// Amount in currency units (INR); the server converts to minor units
    /// for the gateway.
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    /// Order draft to settle once the signature checks out. Totals are
    /// recomputed server-side; client-sent amounts are advisory.
    pub order: CreateOrderRequest,
}

/// Create a payment intent with the gateway
#[utoipa::path(
    post,
    path = "/api/v1/payment/create-intent",
    summary = "Create payment intent",
    description = "Obtain a gateway order for the storefront checkout widget. No Order row exists yet.",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = ApiResponse<PaymentIntent>),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments",
    security(("Bearer" = []))
)]
pub async fn create_intent(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<ApiResponse<PaymentIntent>>, ServiceError> {
    let intent = state
        .services
        .payments
        .create_intent(request.amount, auth_user.id)
        .await?;
    Ok(Json(ApiResponse::success(intent)))
}

/// Verify a gateway payment receipt and settle the order
#[utoipa::path(
    post,
    path = "/api/v1/payment/verify",
    summary = "Verify payment",
    description = "Verify the gateway signature and settle the order draft as paid. Repeat calls with the same receipt return the already-settled order.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 201, description = "Order settled", body = ApiResponse<OrderDetails>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Signature verification failed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Coupon rejected or out of stock", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments",
    security(("Bearer" = []))
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetails>>), ServiceError> {
    if let Err(err) = state.services.payments.verify_signature(
        &request.gateway_order_id,
        &request.gateway_payment_id,
        &request.gateway_signature,
    ) {
        metrics::PAYMENT_VERIFICATION_FAILURES.inc();
        return Err(err);
    }

    let receipt = GatewayReceipt {
        gateway_order_id: request.gateway_order_id,
        gateway_payment_id: request.gateway_payment_id,
        gateway_signature: request.gateway_signature,
    };
    let details = state
        .services
        .orders
        .settle_verified(auth_user.id, request.order, receipt)
        .await?;

    metrics::PAYMENTS_VERIFIED.inc();
    Ok((StatusCode::CREATED, Json(ApiResponse::success(details))))
}
