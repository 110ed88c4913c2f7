use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Threadline API",
        version = "1.0.0",
        description = r#"
# Threadline Order Settlement API

Order settlement and post-sale lifecycle engine for the Threadline apparel
storefront. All amounts are INR with two decimal places.

## Features

- **Checkout Settlement**: Server-side pricing, shipping and tax for COD and online payments
- **Payment Verification**: Gateway signature verification with idempotent settlement
- **Coupons**: Read-only validation plus atomic redemption at settlement
- **Order Lifecycle**: Forward-only fulfilment with customer cancellation windows
- **Returns & Refunds**: Delivered-order returns through pickup and refund completion
- **Loyalty**: Stamp card with concurrency-safe reward claims

## Authentication

All endpoints except status and health require a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Admin endpoints additionally require the `admin` role in the token.

## Pagination

List endpoints accept `page` (default: 1) and `per_page` (default: 20, max: 100).
        "#,
        contact(
            name = "Threadline Engineering",
            email = "engineering@threadline.in"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "https://api.threadline.in", description = "Production server"),
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order creation and lifecycle endpoints"),
        (name = "Payments", description = "Payment intent and verification endpoints"),
        (name = "Coupons", description = "Coupon validation endpoints"),
        (name = "Loyalty", description = "Loyalty card endpoints"),
        (name = "Returns", description = "Return request endpoints"),
        (name = "Admin", description = "Administrative order and return management"),
    ),
    paths(
        // Payments
        crate::handlers::payments::create_intent,
        crate::handlers::payments::verify_payment,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::request_return,

        // Coupons
        crate::handlers::coupons::apply_coupon,

        // Loyalty
        crate::handlers::loyalty::loyalty_status,
        crate::handlers::loyalty::claim_reward,

        // Admin
        crate::handlers::admin::list_orders,
        crate::handlers::admin::update_order_status,
        crate::handlers::admin::confirm_paid,
        crate::handlers::admin::update_return_status,
        crate::handlers::admin::process_refund,
        crate::handlers::admin::complete_refund,

        // Status & health intentionally omitted from OpenAPI paths
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ListQuery,

            // Entities
            crate::entities::order::Model,
            crate::entities::order_item::Model,
            crate::entities::coupon::Model,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentMethod,
            crate::entities::order::ReturnStatus,
            crate::entities::order::ReturnReason,
            crate::entities::order::RefundStatus,
            crate::entities::order::RefundMethod,
            crate::entities::order::ShippingAddress,
            crate::entities::coupon::DiscountKind,

            // Service types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::NewOrderItem,
            crate::services::orders::OrderDetails,
            crate::services::orders::OrderListPage,
            crate::services::pricing::OrderTotals,
            crate::services::payments::PaymentIntent,
            crate::services::coupons::CouponQuote,
            crate::services::loyalty::LoyaltyStatus,
            crate::services::loyalty::ClaimOutcome,

            // Request types
            crate::handlers::payments::CreateIntentRequest,
            crate::handlers::payments::VerifyPaymentRequest,
            crate::handlers::orders::CancelOrderRequest,
            crate::handlers::orders::RequestReturnRequest,
            crate::handlers::coupons::ApplyCouponRequest,
            crate::handlers::admin::UpdateOrderStatusRequest,
            crate::handlers::admin::AdminNoteRequest,
            crate::handlers::admin::UpdateReturnStatusRequest,
            crate::handlers::admin::ProcessRefundRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
