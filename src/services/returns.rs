use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::CheckoutPolicy,
    entities::order::{
        self, Model as OrderModel, OrderStatus, RefundMethod, RefundStatus, ReturnReason,
        ReturnStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::orders::{apply_order_mutation, NoteSpec},
};

/// Forward-only return workflow layered over the orders table. Transitions
/// ride the same versioned conditional UPDATE as order mutations, so a
/// racing approve/reject pair cannot both land.
#[derive(Clone)]
pub struct ReturnService {
    db: DatabaseConnection,
    policy: CheckoutPolicy,
    event_sender: Option<Arc<EventSender>>,
}

impl ReturnService {
    pub fn new(
        db: DatabaseConnection,
        policy: CheckoutPolicy,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            policy,
            event_sender,
        }
    }

    /// Customer opens a return inside the delivery window.
    #[instrument(skip(self, details), fields(order_id = %order_id))]
    pub async fn request_return(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        reason: ReturnReason,
        details: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let return_window = Duration::days(i64::from(self.policy.return_window_days));

        let order = apply_order_mutation(&self.db, order_id, |order| {
            if order.user_id != user_id {
                return Err(ServiceError::NotFound("Order not found".to_string()));
            }
            if !order.is_delivered || order.status != OrderStatus::Delivered {
                return Err(ServiceError::StateConflict(
                    "only delivered orders can be returned".to_string(),
                ));
            }
            let delivered_at = order.delivered_at.ok_or_else(|| {
                ServiceError::StateConflict("delivery timestamp is missing".to_string())
            })?;
            if Utc::now() > delivered_at + return_window {
                return Err(ServiceError::StateConflict(
                    "the return window for this order has closed".to_string(),
                ));
            }
            if order.has_active_return() {
                return Err(ServiceError::StateConflict(
                    "a return is already in progress for this order".to_string(),
                ));
            }

            let mut update: order::ActiveModel = order.clone().into();
            update.return_status = Set(Some(ReturnStatus::Requested));
            update.return_reason = Set(Some(reason));
            update.return_details = Set(details.clone());
            update.return_requested_at = Set(Some(Utc::now()));
            Ok((
                update,
                NoteSpec {
                    actor_id: user_id,
                    actor_role: "customer",
                    kind: "return_requested",
                    note: details.clone(),
                },
            ))
        })
        .await?;

        metrics::RETURNS_REQUESTED.inc();
        info!(order_id = %order_id, reason = %reason, "return requested");

        self.emit(Event::ReturnRequested {
            order_id,
            user_id: order.user_id,
        })
        .await;

        Ok(order)
    }

    /// Admin moves the return along: approve, reject, schedule pickup,
    /// mark picked up. Refund stages have dedicated operations.
    #[instrument(skip(self, note), fields(order_id = %order_id, target = %target))]
    pub async fn update_return_status(
        &self,
        order_id: Uuid,
        target: ReturnStatus,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        if matches!(
            target,
            ReturnStatus::Requested | ReturnStatus::RefundProcessing | ReturnStatus::RefundCompleted
        ) {
            return Err(ServiceError::ValidationError(format!(
                "return status {} cannot be set directly",
                target
            )));
        }

        let mut previous = ReturnStatus::Requested;
        let order = apply_order_mutation(&self.db, order_id, |order| {
            let current = order.return_status.ok_or_else(|| {
                ServiceError::StateConflict("no return is open on this order".to_string())
            })?;
            if !current.precedes(target) {
                return Err(ServiceError::StateConflict(format!(
                    "cannot move return from {} to {}",
                    current, target
                )));
            }
            previous = current;

            let mut update: order::ActiveModel = order.clone().into();
            update.return_status = Set(Some(target));
            Ok((
                update,
                NoteSpec {
                    actor_id,
                    actor_role: "admin",
                    kind: return_note_kind(target),
                    note: note.clone(),
                },
            ))
        })
        .await?;

        info!(order_id = %order_id, from = %previous, to = %target, "return status updated");

        self.emit(Event::ReturnStatusChanged {
            order_id,
            user_id: order.user_id,
            old_status: previous,
            new_status: target,
        })
        .await;

        Ok(order)
    }

    /// Refund bookkeeping entry point, only from `picked_up`.
    #[instrument(skip(self, note), fields(order_id = %order_id))]
    pub async fn process_refund(
        &self,
        order_id: Uuid,
        amount: Decimal,
        method: RefundMethod,
        transaction_id: Option<String>,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "refund amount must be positive".to_string(),
            ));
        }

        let order = apply_order_mutation(&self.db, order_id, |order| {
            if order.refund_is_finalized() {
                return Err(ServiceError::StateConflict(
                    "refund is already completed and cannot change".to_string(),
                ));
            }
            if order.return_status != Some(ReturnStatus::PickedUp) {
                return Err(ServiceError::StateConflict(
                    "refunds start after the return is picked up".to_string(),
                ));
            }
            if amount > order.total_price {
                return Err(ServiceError::ValidationError(format!(
                    "refund amount {} exceeds the order total {}",
                    amount, order.total_price
                )));
            }

            let mut update: order::ActiveModel = order.clone().into();
            update.refund_amount = Set(Some(amount));
            update.refund_method = Set(Some(method));
            update.refund_transaction_id = Set(transaction_id.clone());
            update.refund_status = Set(Some(RefundStatus::Processing));
            update.return_status = Set(Some(ReturnStatus::RefundProcessing));
            Ok((
                update,
                NoteSpec {
                    actor_id,
                    actor_role: "admin",
                    kind: "refund_processing",
                    note: note.clone(),
                },
            ))
        })
        .await?;

        info!(order_id = %order_id, %amount, method = %method, "refund processing");

        self.emit(Event::ReturnStatusChanged {
            order_id,
            user_id: order.user_id,
            old_status: ReturnStatus::PickedUp,
            new_status: ReturnStatus::RefundProcessing,
        })
        .await;

        Ok(order)
    }

    /// Terminal step. Afterwards every refund field is frozen.
    #[instrument(skip(self, note), fields(order_id = %order_id))]
    pub async fn complete_refund(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order = apply_order_mutation(&self.db, order_id, |order| {
            if order.refund_is_finalized() {
                return Err(ServiceError::StateConflict(
                    "refund is already completed and cannot change".to_string(),
                ));
            }
            if order.return_status != Some(ReturnStatus::RefundProcessing) {
                return Err(ServiceError::StateConflict(
                    "no refund is processing on this order".to_string(),
                ));
            }

            let mut update: order::ActiveModel = order.clone().into();
            update.refund_status = Set(Some(RefundStatus::Completed));
            update.refund_completed_at = Set(Some(Utc::now()));
            update.return_status = Set(Some(ReturnStatus::RefundCompleted));
            Ok((
                update,
                NoteSpec {
                    actor_id,
                    actor_role: "admin",
                    kind: "refund_completed",
                    note: note.clone(),
                },
            ))
        })
        .await?;

        metrics::REFUNDS_COMPLETED.inc();
        let amount = order.refund_amount.unwrap_or(order.total_price);
        info!(order_id = %order_id, %amount, "refund completed");

        self.emit(Event::RefundCompleted {
            order_id,
            user_id: order.user_id,
            amount,
        })
        .await;

        Ok(order)
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "failed to send return event");
            }
        }
    }
}

fn return_note_kind(status: ReturnStatus) -> &'static str {
    match status {
        ReturnStatus::Requested => "return_requested",
        ReturnStatus::Approved => "return_approved",
        ReturnStatus::Rejected => "return_rejected",
        ReturnStatus::PickupScheduled => "return_pickup_scheduled",
        ReturnStatus::PickedUp => "return_picked_up",
        ReturnStatus::RefundProcessing => "refund_processing",
        ReturnStatus::RefundCompleted => "refund_completed",
    }
}
