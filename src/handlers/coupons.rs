use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser, errors::ServiceError, services::coupons::CouponQuote, ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApplyCouponRequest {
    pub code: String,
    /// Cart total the storefront computed. Advisory at preview time; once an
    /// order draft exists the server recomputes and re-validates.
    pub order_total: Decimal,
}

/// Preview a coupon against a cart total
#[utoipa::path(
    post,
    path = "/api/v1/coupons/apply",
    summary = "Apply coupon",
    description = "Read-only validation; the coupon is only consumed when an order settles with it.",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Coupon accepted", body = ApiResponse<CouponQuote>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Coupon rejected", body = crate::errors::ErrorResponse),
    ),
    tag = "Coupons",
    security(("Bearer" = []))
)]
pub async fn apply_coupon(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<ApiResponse<CouponQuote>>, ServiceError> {
    if request.order_total <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "order_total must be positive".to_string(),
        ));
    }
    let quote = state
        .services
        .coupons
        .validate(&request.code, request.order_total, auth_user.id)
        .await?;
    Ok(Json(ApiResponse::success(quote)))
}
