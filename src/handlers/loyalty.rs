use axum::{extract::State, response::Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::loyalty::{ClaimOutcome, LoyaltyStatus},
    ApiResponse, AppState,
};

/// Loyalty card status for the caller
#[utoipa::path(
    get,
    path = "/api/v1/loyalty/status",
    summary = "Loyalty status",
    responses(
        (status = 200, description = "Status retrieved", body = ApiResponse<LoyaltyStatus>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    tag = "Loyalty",
    security(("Bearer" = []))
)]
pub async fn loyalty_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<LoyaltyStatus>>, ServiceError> {
    let status = state.services.loyalty.status(auth_user.id).await?;
    Ok(Json(ApiResponse::success(status)))
}

/// Claim a full loyalty card for a surprise coupon
#[utoipa::path(
    post,
    path = "/api/v1/loyalty/claim",
    summary = "Claim loyalty reward",
    description = "Requires a full card. Resets stamps, completes a cycle, and mints a user-bound surprise coupon. Of two concurrent claims exactly one succeeds.",
    responses(
        (status = 200, description = "Reward claimed", body = ApiResponse<ClaimOutcome>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Card is not full", body = crate::errors::ErrorResponse),
    ),
    tag = "Loyalty",
    security(("Bearer" = []))
)]
pub async fn claim_reward(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<ClaimOutcome>>, ServiceError> {
    let outcome = state.services.loyalty.claim(auth_user.id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
