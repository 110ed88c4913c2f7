use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// One variant's worth of stock movement, keyed `product_id:size:color`.
#[derive(Clone, Debug, Serialize)]
pub struct ReservationLine {
    pub variant_key: String,
    pub quantity: i32,
}

/// Outbound port to the inventory collaborator. Reservations happen before
/// the order row is written and are released if the write fails.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    async fn reserve(&self, lines: &[ReservationLine]) -> Result<(), ServiceError>;
    async fn release(&self, lines: &[ReservationLine]) -> Result<(), ServiceError>;
}

pub struct HttpInventoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(base_url: String) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build inventory http client: {}", e))
            })?;

        Ok(Self { client, base_url })
    }

    async fn post_lines(&self, path: &str, lines: &[ReservationLine]) -> Result<(), ServiceError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .json(&lines)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("inventory {} failed: {}", path, e))
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::CONFLICT | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ServiceError::InventoryError(
                    "insufficient stock for one or more items".to_string(),
                ))
            }
            status => Err(ServiceError::ExternalServiceError(format!(
                "inventory service returned {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn reserve(&self, lines: &[ReservationLine]) -> Result<(), ServiceError> {
        self.post_lines("reserve", lines).await
    }

    async fn release(&self, lines: &[ReservationLine]) -> Result<(), ServiceError> {
        self.post_lines("release", lines).await
    }
}

/// In-process stock ledger. Variants without a seeded level are treated as
/// unlimited, which keeps keyless dev setups working.
#[derive(Default)]
pub struct InMemoryInventoryClient {
    available: DashMap<String, i32>,
}

impl InMemoryInventoryClient {
    pub fn set_stock(&self, variant_key: &str, quantity: i32) {
        self.available.insert(variant_key.to_string(), quantity);
    }

    pub fn stock_of(&self, variant_key: &str) -> Option<i32> {
        self.available.get(variant_key).map(|entry| *entry)
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventoryClient {
    async fn reserve(&self, lines: &[ReservationLine]) -> Result<(), ServiceError> {
        let mut taken: Vec<&ReservationLine> = Vec::with_capacity(lines.len());

        for line in lines {
            if let Some(mut entry) = self.available.get_mut(&line.variant_key) {
                if *entry < line.quantity {
                    warn!(variant_key = %line.variant_key, requested = line.quantity, available = *entry, "reservation short");
                    drop(entry);
                    // Undo the lines already taken so a failed reserve is a no-op.
                    for undone in taken {
                        if let Some(mut slot) = self.available.get_mut(&undone.variant_key) {
                            *slot += undone.quantity;
                        }
                    }
                    return Err(ServiceError::InventoryError(format!(
                        "insufficient stock for {}",
                        line.variant_key
                    )));
                }
                *entry -= line.quantity;
            }
            taken.push(line);
        }

        debug!(count = lines.len(), "reserved");
        Ok(())
    }

    async fn release(&self, lines: &[ReservationLine]) -> Result<(), ServiceError> {
        for line in lines {
            if let Some(mut entry) = self.available.get_mut(&line.variant_key) {
                *entry += line.quantity;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(key: &str, quantity: i32) -> ReservationLine {
        ReservationLine {
            variant_key: key.to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn reserve_and_release_roundtrip() {
        let client = InMemoryInventoryClient::default();
        client.set_stock("tee:M:black", 5);

        client.reserve(&[line("tee:M:black", 3)]).await.unwrap();
        assert_eq!(client.stock_of("tee:M:black"), Some(2));

        client.release(&[line("tee:M:black", 3)]).await.unwrap();
        assert_eq!(client.stock_of("tee:M:black"), Some(5));
    }

    #[tokio::test]
    async fn short_stock_rejects_and_rolls_back() {
        let client = InMemoryInventoryClient::default();
        client.set_stock("tee:M:black", 5);
        client.set_stock("tee:L:white", 1);

        let err = client
            .reserve(&[line("tee:M:black", 2), line("tee:L:white", 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InventoryError(_)));
        // First line must have been restored.
        assert_eq!(client.stock_of("tee:M:black"), Some(5));
        assert_eq!(client.stock_of("tee:L:white"), Some(1));
    }

    #[tokio::test]
    async fn unseeded_variant_is_unlimited() {
        let client = InMemoryInventoryClient::default();

        client.reserve(&[line("anything:S:red", 99)]).await.unwrap();
    }
}
