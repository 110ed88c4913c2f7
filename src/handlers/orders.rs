use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::order::{self, ReturnReason},
    errors::ServiceError,
    services::orders::{CreateOrderRequest, OrderDetails, OrderListPage},
    ApiResponse, AppState, ListQuery,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CancelOrderRequest {
    #[validate(length(min = 1, message = "A cancellation reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RequestReturnRequest {
    pub reason: ReturnReason,
    pub details: Option<String>,
}

/// Create a new order (cash on delivery)
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Settle a COD checkout. Totals are recomputed server-side; online payments settle through /payment/verify instead.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderDetails>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Coupon rejected or out of stock", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders",
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetails>>), ServiceError> {
    let details = state
        .services
        .orders
        .create_order(auth_user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(details))))
}

/// List the caller's orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List my orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderListPage>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders",
    security(("Bearer" = []))
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderListPage>>, ServiceError> {
    let page = state
        .services
        .orders
        .list_orders_for_user(auth_user.id, query.page, query.per_page)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Get a single order
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Owner or admin only; everyone else gets 404.",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetails>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders",
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderDetails>>, ServiceError> {
    let details = state
        .services
        .orders
        .get_order(id, auth_user.id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Cancel an order inside the policy window
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Cancel order",
    description = "Allowed while pending/processing and inside the window: 1 hour after creation when paid, 24 hours when unpaid.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<order::Model>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Outside the cancellation window", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders",
    security(("Bearer" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    request.validate()?;
    let order = state
        .services
        .orders
        .cancel_order(id, auth_user.id, auth_user.is_admin(), request.reason)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Open a return on a delivered order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/return",
    summary = "Request return",
    description = "Delivered orders only, within the return window after delivery.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RequestReturnRequest,
    responses(
        (status = 200, description = "Return requested", body = ApiResponse<order::Model>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not returnable", body = crate::errors::ErrorResponse),
    ),
    tag = "Returns",
    security(("Bearer" = []))
)]
pub async fn request_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<RequestReturnRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .returns
        .request_return(id, auth_user.id, request.reason, request.details)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
