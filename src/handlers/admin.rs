use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    entities::order::{self, OrderStatus, RefundMethod, ReturnStatus},
    errors::ServiceError,
    services::orders::OrderListPage,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AdminNoteRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateReturnStatusRequest {
    pub status: ReturnStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ProcessRefundRequest {
    pub amount: Decimal,
    pub method: RefundMethod,
    pub transaction_id: Option<String>,
    pub note: Option<String>,
}

/// List all orders, optionally filtered by status
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    summary = "List all orders",
    params(
        ("status" = Option<OrderStatus>, Query, description = "Filter by order status"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderListPage>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin",
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<OrderListPage>>, ServiceError> {
    let page = state
        .services
        .orders
        .list_all_orders(query.status, query.page, query.per_page)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Advance an order through fulfilment
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    summary = "Update order status",
    description = "pending→processing→shipped→delivered; illegal jumps are rejected. Entering delivered starts the return window.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<order::Model>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin",
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    admin: AdminUser,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .orders
        .advance_status(id, request.status, admin.0.id, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Confirm payment for a cash-on-delivery order
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/confirm-paid",
    summary = "Confirm COD payment",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AdminNoteRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = ApiResponse<order::Model>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already paid or not COD", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin",
    security(("Bearer" = []))
)]
pub async fn confirm_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    admin: AdminUser,
    Json(request): Json<AdminNoteRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .orders
        .confirm_paid(id, admin.0.id, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Move a return along its forward-only chain
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/return-status",
    summary = "Update return status",
    description = "approved, rejected, pickup_scheduled, picked_up. Refund stages have their own endpoints.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateReturnStatusRequest,
    responses(
        (status = 200, description = "Return status updated", body = ApiResponse<order::Model>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin",
    security(("Bearer" = []))
)]
pub async fn update_return_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    admin: AdminUser,
    Json(request): Json<UpdateReturnStatusRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .returns
        .update_return_status(id, request.status, admin.0.id, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Start refund bookkeeping for a picked-up return
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/process-refund",
    summary = "Process refund",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ProcessRefundRequest,
    responses(
        (status = 200, description = "Refund processing", body = ApiResponse<order::Model>),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 409, description = "Return is not picked up", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin",
    security(("Bearer" = []))
)]
pub async fn process_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    admin: AdminUser,
    Json(request): Json<ProcessRefundRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .returns
        .process_refund(
            id,
            request.amount,
            request.method,
            request.transaction_id,
            admin.0.id,
            request.note,
        )
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Finalize a refund; fields are immutable afterwards
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/complete-refund",
    summary = "Complete refund",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AdminNoteRequest,
    responses(
        (status = 200, description = "Refund completed", body = ApiResponse<order::Model>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
        (status = 409, description = "No refund is processing", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin",
    security(("Bearer" = []))
)]
pub async fn complete_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    admin: AdminUser,
    Json(request): Json<AdminNoteRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let order = state
        .services
        .returns
        .complete_refund(id, admin.0.id, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
