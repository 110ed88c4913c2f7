use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::GatewayConfig, errors::ServiceError};

type HmacSha256 = Hmac<Sha256>;

/// Order handle minted by the payment gateway before any money moves.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
}

/// Everything the storefront needs to open the gateway's payment sheet.
/// No Order row exists yet at this point.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PaymentIntent {
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub public_key: String,
}

/// Outbound port to the payment gateway. The HTTP implementation talks to
/// the real thing; the local one backs tests and keyless dev setups.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn create_gateway_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError>;
}

pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpGatewayClient {
    pub fn new(base_url: String, config: &GatewayConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build gateway http client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn create_gateway_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        #[derive(Serialize)]
        struct CreateOrderBody<'a> {
            amount: i64,
            currency: &'a str,
            receipt: &'a str,
        }

        let url = format!("{}/orders", self.base_url.trim_end_matches('/'));
        let body = CreateOrderBody {
            amount: to_minor_units(amount)?,
            currency,
            receipt,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("gateway order create failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "gateway order create returned {}",
                response.status()
            )));
        }

        response.json::<GatewayOrder>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("gateway order response malformed: {}", e))
        })
    }
}

/// Deterministic in-process stand-in. Mints sequential order ids and never
/// leaves the process.
#[derive(Default)]
pub struct LocalGatewayClient {
    sequence: AtomicU64,
}

#[async_trait]
impl GatewayClient for LocalGatewayClient {
    async fn create_gateway_order(
        &self,
        _amount: Decimal,
        _currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(GatewayOrder {
            id: format!("order_local_{:08}", n),
        })
    }
}

/// Intent creation and receipt verification. Settlement of the verified
/// draft belongs to the order state machine, not here.
pub struct PaymentService {
    gateway: std::sync::Arc<dyn GatewayClient>,
    key_id: String,
    key_secret: String,
    currency: String,
}

impl PaymentService {
    pub fn new(
        gateway: std::sync::Arc<dyn GatewayClient>,
        config: &GatewayConfig,
        currency: String,
    ) -> Self {
        Self {
            gateway,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            currency,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_intent(
        &self,
        amount: Decimal,
        customer_id: Uuid,
    ) -> Result<PaymentIntent, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "payment amount must be positive".to_string(),
            ));
        }

        let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
        let gateway_order = self
            .gateway
            .create_gateway_order(amount, &self.currency, &receipt)
            .await?;

        info!(gateway_order_id = %gateway_order.id, %amount, "payment intent created");

        Ok(PaymentIntent {
            gateway_order_id: gateway_order.id,
            amount,
            currency: self.currency.clone(),
            public_key: self.key_id.clone(),
        })
    }

    /// Recomputes the receipt signature server-side and compares in constant
    /// time. A mismatch is fatal to the attempt; nothing is persisted.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), ServiceError> {
        let expected = self.signature_for(gateway_order_id, payment_id)?;

        if !constant_time_eq(&expected, signature) {
            warn!(gateway_order_id, payment_id, "payment signature mismatch");
            return Err(ServiceError::PaymentVerification(
                "payment signature verification failed".to_string(),
            ));
        }

        Ok(())
    }

    /// Hex HMAC-SHA256 over `"{gateway_order_id}|{payment_id}"` with the
    /// server-held key secret.
    pub fn signature_for(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> Result<String, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("hmac init failed: {}", e)))?;
        mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .round_dp(0)
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("payment amount out of range".to_string()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
