use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{OrderStatus, ReturnStatus};
use crate::services::notifications::NotificationClient;

/// Everything the system announces after a state change has committed.
/// Emission happens after the transaction; consumers must tolerate loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
    },
    OrderPaymentConfirmed {
        order_id: Uuid,
        user_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled {
        order_id: Uuid,
        user_id: Uuid,
        refund_due: bool,
    },
    ReturnRequested {
        order_id: Uuid,
        user_id: Uuid,
    },
    ReturnStatusChanged {
        order_id: Uuid,
        user_id: Uuid,
        old_status: ReturnStatus,
        new_status: ReturnStatus,
    },
    RefundCompleted {
        order_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
    },
    LoyaltyStampEarned {
        user_id: Uuid,
        stamps: i32,
    },
    SurpriseCouponMinted {
        user_id: Uuid,
        coupon_code: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {}", e))
    }
}

pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel and drives outbound notifications. Runs until
/// every sender is dropped; notification failures are logged and dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifier: Arc<dyn NotificationClient>) {
    info!("event worker started");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPlaced {
                order_id,
                user_id,
                total,
            } => {
                notify(
                    &notifier,
                    *user_id,
                    "Order confirmed",
                    &format!("Your order {} for {} is confirmed.", order_id, total),
                )
                .await;
            }
            Event::OrderCancelled {
                order_id,
                user_id,
                refund_due,
            } => {
                let body = if *refund_due {
                    format!("Order {} cancelled. Your refund is on its way.", order_id)
                } else {
                    format!("Order {} cancelled.", order_id)
                };
                notify(&notifier, *user_id, "Order cancelled", &body).await;
            }
            Event::ReturnStatusChanged {
                order_id,
                user_id,
                new_status,
                ..
            } if *new_status == ReturnStatus::Approved => {
                notify(
                    &notifier,
                    *user_id,
                    "Return approved",
                    &format!("Return for order {} was approved.", order_id),
                )
                .await;
            }
            Event::RefundCompleted {
                order_id,
                user_id,
                amount,
            } => {
                notify(
                    &notifier,
                    *user_id,
                    "Refund completed",
                    &format!("Refund of {} for order {} has been completed.", amount, order_id),
                )
                .await;
            }
            other => {
                info!(event = ?other, "event observed");
            }
        }
    }

    info!("event worker stopped");
}

async fn notify(notifier: &Arc<dyn NotificationClient>, user_id: Uuid, subject: &str, body: &str) {
    if let Err(e) = notifier.notify(user_id, subject, body).await {
        warn!(%user_id, subject, error = %e, "notification dispatch failed");
    }
}
