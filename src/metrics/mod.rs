use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter, TextEncoder};

use crate::errors::ServiceError;

lazy_static! {
    pub static ref ORDERS_PLACED: IntCounter = register_int_counter!(
        "orders_placed_total",
        "Total number of orders settled (COD creation plus verified online payments)"
    )
    .expect("metric can be created");
    pub static ref PAYMENTS_VERIFIED: IntCounter = register_int_counter!(
        "payments_verified_total",
        "Total number of successful payment signature verifications"
    )
    .expect("metric can be created");
    pub static ref PAYMENT_VERIFICATION_FAILURES: IntCounter = register_int_counter!(
        "payment_verification_failures_total",
        "Total number of rejected payment signatures"
    )
    .expect("metric can be created");
    pub static ref ORDERS_CANCELLED: IntCounter = register_int_counter!(
        "orders_cancelled_total",
        "Total number of cancelled orders"
    )
    .expect("metric can be created");
    pub static ref RETURNS_REQUESTED: IntCounter = register_int_counter!(
        "returns_requested_total",
        "Total number of return requests"
    )
    .expect("metric can be created");
    pub static ref REFUNDS_COMPLETED: IntCounter = register_int_counter!(
        "refunds_completed_total",
        "Total number of completed refunds"
    )
    .expect("metric can be created");
    pub static ref LOYALTY_CLAIMS: IntCounter = register_int_counter!(
        "loyalty_claims_total",
        "Total number of successful loyalty cycle claims"
    )
    .expect("metric can be created");
}

/// Prometheus text exposition of the default registry.
pub fn render() -> Result<String, ServiceError> {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_counters() {
        ORDERS_PLACED.inc();

        let body = render().unwrap();
        assert!(body.contains("orders_placed_total"));
    }
}
