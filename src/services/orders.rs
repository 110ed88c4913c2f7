use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::CheckoutPolicy,
    entities::order::{
        self, Entity as OrderEntity, Model as OrderModel, OrderStatus, PaymentMethod, RefundMethod,
        RefundStatus, ShippingAddress,
    },
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::order_note,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::{
        coupons::CouponService,
        inventory::{InventoryClient, ReservationLine},
        loyalty::LoyaltyService,
        pricing::{self, PricedItem},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Size is required"))]
    pub size: String,
    #[validate(length(min = 1, message = "Color is required"))]
    pub color: String,
    #[validate(range(min = 1, max = 50, message = "Quantity must be between 1 and 50"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// Gateway receipt attached to an online settlement after the signature
/// has already been verified.
#[derive(Debug, Clone)]
pub struct GatewayReceipt {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetails {
    pub order: OrderModel,
    pub items: Vec<order_item::Model>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListPage {
    pub orders: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Order lifecycle writes. Every mutation is an optimistic-versioned
/// conditional UPDATE plus an audit note in the same transaction; on a
/// version race the guards are re-checked once before giving up.
#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
    policy: CheckoutPolicy,
    coupons: CouponService,
    loyalty: LoyaltyService,
    inventory: Arc<dyn InventoryClient>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db: DatabaseConnection,
        policy: CheckoutPolicy,
        coupons: CouponService,
        loyalty: LoyaltyService,
        inventory: Arc<dyn InventoryClient>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            policy,
            coupons,
            loyalty,
            inventory,
            event_sender,
        }
    }

    /// COD checkout: the order settles immediately as `pending`, unpaid.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        if request.payment_method != PaymentMethod::Cod {
            return Err(ServiceError::ValidationError(
                "online orders settle through payment verification".to_string(),
            ));
        }
        self.settle(user_id, request, None).await
    }

    /// Online checkout: called by the payment handler once the gateway
    /// signature has checked out. Repeat calls with the same receipt find
    /// the already-settled row and return it unchanged.
    #[instrument(skip(self, request, receipt), fields(user_id = %user_id, gateway_order_id = %receipt.gateway_order_id))]
    pub async fn settle_verified(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
        receipt: GatewayReceipt,
    ) -> Result<OrderDetails, ServiceError> {
        if request.payment_method != PaymentMethod::Online {
            return Err(ServiceError::ValidationError(
                "verified settlement requires an online payment method".to_string(),
            ));
        }

        if let Some(existing) = self
            .find_by_gateway_order_id(&receipt.gateway_order_id)
            .await?
        {
            info!(order_id = %existing.id, "verify replay, returning settled order");
            return self.details_of(existing).await;
        }

        self.settle(user_id, request, Some(receipt)).await
    }

    async fn settle(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
        receipt: Option<GatewayReceipt>,
    ) -> Result<OrderDetails, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for item in &request.items {
            item.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
            if item.unit_price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "unit price for {} must be positive",
                    item.name
                )));
            }
        }

        let priced: Vec<PricedItem> = request
            .items
            .iter()
            .map(|item| PricedItem {
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect();

        // Quote without discount first; the coupon gate reads this total.
        let undiscounted = pricing::compute_totals(&priced, &self.policy, Decimal::ZERO);

        let quote = match &request.coupon_code {
            Some(code) => Some(
                self.coupons
                    .validate(code, undiscounted.total, user_id)
                    .await?,
            ),
            None => None,
        };
        let discount = quote.as_ref().map(|q| q.discount).unwrap_or(Decimal::ZERO);
        let totals = pricing::compute_totals(&priced, &self.policy, discount);

        let lines = reservation_lines(&request.items);
        self.inventory.reserve(&lines).await?;

        let result = self
            .settle_in_txn(user_id, &request, &totals, receipt.as_ref())
            .await;

        let (order, stamps) = match result {
            Ok(pair) => pair,
            Err(e) => {
                if let Err(release_err) = self.inventory.release(&lines).await {
                    warn!(error = %release_err, "failed to release reservation after settle error");
                }
                // A unique-index collision on the receipt means a racing
                // verify won; hand back its order instead of an error.
                if let Some(receipt) = &receipt {
                    if let Some(existing) = self
                        .find_by_gateway_order_id(&receipt.gateway_order_id)
                        .await?
                    {
                        info!(order_id = %existing.id, "concurrent verify settled first");
                        return self.details_of(existing).await;
                    }
                }
                return Err(e);
            }
        };

        metrics::ORDERS_PLACED.inc();
        info!(order_id = %order.id, order_number = %order.order_number, total = %order.total_price, "order settled");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderPlaced {
                    order_id: order.id,
                    user_id,
                    total: order.total_price,
                })
                .await
            {
                warn!(order_id = %order.id, error = %e, "failed to send order placed event");
            }
            if let Some(stamps) = stamps {
                if let Err(e) = event_sender
                    .send(Event::LoyaltyStampEarned { user_id, stamps })
                    .await
                {
                    warn!(%user_id, error = %e, "failed to send stamp event");
                }
            }
        }

        self.details_of(order).await
    }

    async fn settle_in_txn(
        &self,
        user_id: Uuid,
        request: &CreateOrderRequest,
        totals: &pricing::OrderTotals,
        receipt: Option<&GatewayReceipt>,
    ) -> Result<(OrderModel, Option<i32>), ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let (status, is_paid, paid_at) = match receipt {
            Some(_) => (OrderStatus::Processing, true, Some(now)),
            None => (OrderStatus::Pending, false, None),
        };

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number()),
            user_id: Set(user_id),
            status: Set(status),
            payment_method: Set(request.payment_method),
            shipping_address: Set(request.shipping_address.clone()),
            subtotal: Set(totals.subtotal),
            shipping_fee: Set(totals.shipping),
            tax_amount: Set(totals.tax),
            discount_amount: Set(totals.discount),
            total_price: Set(totals.total),
            coupon_code: Set(request.coupon_code.clone()),
            is_paid: Set(is_paid),
            paid_at: Set(paid_at),
            is_delivered: Set(false),
            delivered_at: Set(None),
            cancellation_reason: Set(None),
            cancelled_at: Set(None),
            return_status: Set(None),
            return_reason: Set(None),
            return_details: Set(None),
            return_requested_at: Set(None),
            refund_amount: Set(None),
            refund_method: Set(None),
            refund_transaction_id: Set(None),
            refund_status: Set(None),
            refund_completed_at: Set(None),
            gateway_order_id: Set(receipt.map(|r| r.gateway_order_id.clone())),
            gateway_payment_id: Set(receipt.map(|r| r.gateway_payment_id.clone())),
            gateway_signature: Set(receipt.map(|r| r.gateway_signature.clone())),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        for item in &request.items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name.clone()),
                size: Set(item.size.clone()),
                color: Set(item.color.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                image_url: Set(item.image_url.clone()),
            }
            .insert(&txn)
            .await?;
        }

        if let Some(code) = &request.coupon_code {
            self.coupons.redeem(&txn, code, user_id).await?;
        }

        let stamps = self.loyalty.accrue_stamp(&txn, user_id).await?;

        append_note(
            &txn,
            order_id,
            user_id,
            "customer",
            "order_placed",
            None,
            now,
        )
        .await?;

        txn.commit().await?;
        Ok((order, stamps))
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
    ) -> Result<OrderDetails, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        // Non-owners get the same answer as a missing order.
        if order.user_id != actor_id && !actor_is_admin {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }

        self.details_of(order).await
    }

    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListPage, ServiceError> {
        self.list_page(
            OrderEntity::find().filter(order::Column::UserId.eq(user_id)),
            page,
            per_page,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListPage, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        self.list_page(query, page, per_page).await
    }

    async fn list_page(
        &self,
        query: sea_orm::Select<OrderEntity>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListPage, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderListPage {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Customer-or-admin cancellation inside the policy window.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
        reason: String,
    ) -> Result<OrderModel, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "A cancellation reason is required".to_string(),
            ));
        }

        let order = self
            .mutate_versioned(order_id, |order| {
                if order.user_id != actor_id && !actor_is_admin {
                    return Err(ServiceError::NotFound("Order not found".to_string()));
                }
                cancel_guard(order, &self.policy, Utc::now())?;

                let now = Utc::now();
                let mut update: order::ActiveModel = order.clone().into();
                update.status = Set(OrderStatus::Cancelled);
                update.cancellation_reason = Set(Some(reason.clone()));
                update.cancelled_at = Set(Some(now));
                if order.is_paid {
                    update.refund_status = Set(Some(RefundStatus::Initiated));
                    update.refund_amount = Set(Some(order.total_price));
                    update.refund_method = Set(Some(RefundMethod::Original));
                }
                Ok((
                    update,
                    NoteSpec {
                        actor_id,
                        actor_role: actor_role(actor_is_admin),
                        kind: "order_cancelled",
                        note: Some(reason.clone()),
                    },
                ))
            })
            .await?;

        let lines = self.lines_of(order_id).await?;
        if let Err(e) = self.inventory.release(&lines).await {
            warn!(order_id = %order_id, error = %e, "inventory release after cancel failed");
        }

        metrics::ORDERS_CANCELLED.inc();
        info!(order_id = %order_id, refund_due = order.is_paid, "order cancelled");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderCancelled {
                    order_id,
                    user_id: order.user_id,
                    refund_due: order.is_paid,
                })
                .await
            {
                warn!(order_id = %order_id, error = %e, "failed to send cancel event");
            }
        }

        Ok(order)
    }

    /// Admin fulfilment progression. Entering `delivered` starts the
    /// return window.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn advance_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let mut old_status = OrderStatus::Pending;
        let order = self
            .mutate_versioned(order_id, |order| {
                if !order.status.can_transition_to(new_status) {
                    return Err(ServiceError::StateConflict(format!(
                        "cannot move order from {} to {}",
                        order.status, new_status
                    )));
                }
                old_status = order.status;

                let now = Utc::now();
                let mut update: order::ActiveModel = order.clone().into();
                update.status = Set(new_status);
                if new_status == OrderStatus::Delivered {
                    update.is_delivered = Set(true);
                    update.delivered_at = Set(Some(now));
                }
                Ok((
                    update,
                    NoteSpec {
                        actor_id,
                        actor_role: "admin",
                        kind: status_note_kind(new_status),
                        note: note.clone(),
                    },
                ))
            })
            .await?;

        info!(order_id = %order_id, from = %old_status, to = %new_status, "order status advanced");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status,
                })
                .await
            {
                warn!(order_id = %order_id, error = %e, "failed to send status event");
            }
        }

        Ok(order)
    }

    /// Manual settlement for COD. The only way `is_paid` flips without a
    /// gateway receipt.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn confirm_paid(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order = self
            .mutate_versioned(order_id, |order| {
                if order.payment_method != PaymentMethod::Cod {
                    return Err(ServiceError::StateConflict(
                        "only cash-on-delivery orders are confirmed manually".to_string(),
                    ));
                }
                if order.is_paid {
                    return Err(ServiceError::StateConflict(
                        "order is already paid".to_string(),
                    ));
                }
                if order.status == OrderStatus::Cancelled {
                    return Err(ServiceError::StateConflict(
                        "cancelled orders cannot be marked paid".to_string(),
                    ));
                }

                let mut update: order::ActiveModel = order.clone().into();
                update.is_paid = Set(true);
                update.paid_at = Set(Some(Utc::now()));
                Ok((
                    update,
                    NoteSpec {
                        actor_id,
                        actor_role: "admin",
                        kind: "payment_confirmed",
                        note: note.clone(),
                    },
                ))
            })
            .await?;

        info!(order_id = %order_id, "cod payment confirmed");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderPaymentConfirmed {
                    order_id,
                    user_id: order.user_id,
                })
                .await
            {
                warn!(order_id = %order_id, error = %e, "failed to send payment confirmed event");
            }
        }

        Ok(order)
    }

    pub async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderModel>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&self.db)
            .await?)
    }

    pub async fn details_of(&self, order: OrderModel) -> Result<OrderDetails, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&self.db)
            .await?;
        Ok(OrderDetails { order, items })
    }

    pub(crate) async fn mutate_versioned<F>(
        &self,
        order_id: Uuid,
        build: F,
    ) -> Result<OrderModel, ServiceError>
    where
        F: FnMut(&OrderModel) -> Result<(order::ActiveModel, NoteSpec), ServiceError>,
    {
        apply_order_mutation(&self.db, order_id, build).await
    }

    async fn lines_of(&self, order_id: Uuid) -> Result<Vec<ReservationLine>, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&self.db)
            .await?;

        Ok(items
            .iter()
            .map(|item| ReservationLine {
                variant_key: item.variant_key(),
                quantity: item.quantity,
            })
            .collect())
    }
}

/// Guarded write with one transparent retry. Each attempt re-reads the
/// row, re-runs the guards, and applies a conditional UPDATE keyed on the
/// version it read; a racing writer makes the UPDATE hit zero rows.
pub(crate) async fn apply_order_mutation<F>(
    db: &DatabaseConnection,
    order_id: Uuid,
    mut build: F,
) -> Result<OrderModel, ServiceError>
where
    F: FnMut(&OrderModel) -> Result<(order::ActiveModel, NoteSpec), ServiceError>,
{
    for attempt in 0..2 {
        let txn = db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let read_version = order.version;
        let (mut update, note) = build(&order)?;
        let now = Utc::now();
        update.version = Set(read_version + 1);
        update.updated_at = Set(Some(now));

        let result = OrderEntity::update_many()
            .set(update)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(read_version))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            warn!(order_id = %order_id, attempt, "version conflict, retrying");
            continue;
        }

        append_note(
            &txn,
            order_id,
            note.actor_id,
            note.actor_role,
            note.kind,
            note.note,
            now,
        )
        .await?;

        let updated = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        txn.commit().await?;
        return Ok(updated);
    }

    error!(order_id = %order_id, "version conflict persisted after retry");
    Err(ServiceError::ConcurrentModification(order_id))
}

pub(crate) struct NoteSpec {
    pub actor_id: Uuid,
    pub actor_role: &'static str,
    pub kind: &'static str,
    pub note: Option<String>,
}

pub(crate) async fn append_note(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    actor_id: Uuid,
    actor_role: &str,
    kind: &str,
    note: Option<String>,
    at: DateTime<Utc>,
) -> Result<(), ServiceError> {
    order_note::ActiveModel {
        order_id: Set(order_id),
        actor_id: Set(actor_id),
        actor_role: Set(actor_role.to_string()),
        kind: Set(kind.to_string()),
        note: Set(note),
        created_at: Set(at),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(())
}

pub(crate) fn actor_role(is_admin: bool) -> &'static str {
    if is_admin {
        "admin"
    } else {
        "customer"
    }
}

fn status_note_kind(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "order_pending",
        OrderStatus::Processing => "order_processing",
        OrderStatus::Shipped => "order_shipped",
        OrderStatus::Delivered => "order_delivered",
        OrderStatus::Cancelled => "order_cancelled",
    }
}

fn cancel_guard(
    order: &OrderModel,
    policy: &CheckoutPolicy,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if !order.status.is_cancellable() {
        return Err(ServiceError::StateConflict(format!(
            "orders in status {} cannot be cancelled",
            order.status
        )));
    }
    if order.is_delivered {
        return Err(ServiceError::StateConflict(
            "delivered orders cannot be cancelled".to_string(),
        ));
    }

    let window_secs = if order.is_paid {
        policy.paid_cancellation_window_secs
    } else {
        policy.unpaid_cancellation_window_secs
    };
    let deadline = order.created_at + Duration::seconds(window_secs as i64);
    if now > deadline {
        return Err(ServiceError::StateConflict(
            "the cancellation window for this order has closed".to_string(),
        ));
    }

    Ok(())
}

fn reservation_lines(items: &[NewOrderItem]) -> Vec<ReservationLine> {
    items
        .iter()
        .map(|item| ReservationLine {
            variant_key: format!("{}:{}:{}", item.product_id, item.size, item.color),
            quantity: item.quantity,
        })
        .collect()
}

fn order_number() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..8)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                char::from(CHARSET[idx])
            })
            .collect()
    };
    format!("TL-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order(now: DateTime<Utc>) -> OrderModel {
        OrderModel {
            id: Uuid::new_v4(),
            order_number: order_number(),
            user_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Cod,
            shipping_address: ShippingAddress {
                name: "Asha Rao".into(),
                phone: "9000000000".into(),
                line1: "14 MG Road".into(),
                line2: None,
                city: "Bengaluru".into(),
                state: "KA".into(),
                postal_code: "560001".into(),
            },
            subtotal: dec!(1299),
            shipping_fee: dec!(0),
            tax_amount: dec!(64.95),
            discount_amount: dec!(0),
            total_price: dec!(1363.95),
            coupon_code: None,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            cancellation_reason: None,
            cancelled_at: None,
            return_status: None,
            return_reason: None,
            return_details: None,
            return_requested_at: None,
            refund_amount: None,
            refund_method: None,
            refund_transaction_id: None,
            refund_status: None,
            refund_completed_at: None,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
            version: 1,
            created_at: now,
            updated_at: Some(now),
        }
    }

    #[test]
    fn unpaid_order_cancellable_within_a_day() {
        let now = Utc::now();
        let order = sample_order(now - Duration::hours(23));

        assert!(cancel_guard(&order, &CheckoutPolicy::default(), now).is_ok());
    }

    #[test]
    fn unpaid_order_rejected_after_a_day() {
        let now = Utc::now();
        let order = sample_order(now - Duration::hours(25));

        let err = cancel_guard(&order, &CheckoutPolicy::default(), now).unwrap_err();
        assert!(matches!(err, ServiceError::StateConflict(_)));
    }

    #[test]
    fn paid_order_window_shrinks_to_an_hour() {
        let now = Utc::now();
        let mut order = sample_order(now - Duration::minutes(90));
        order.is_paid = true;

        let err = cancel_guard(&order, &CheckoutPolicy::default(), now).unwrap_err();
        assert!(matches!(err, ServiceError::StateConflict(_)));

        let mut fresh = sample_order(now - Duration::minutes(30));
        fresh.is_paid = true;
        assert!(cancel_guard(&fresh, &CheckoutPolicy::default(), now).is_ok());
    }

    #[test]
    fn shipped_order_is_not_cancellable() {
        let now = Utc::now();
        let mut order = sample_order(now);
        order.status = OrderStatus::Shipped;

        let err = cancel_guard(&order, &CheckoutPolicy::default(), now).unwrap_err();
        assert!(matches!(err, ServiceError::StateConflict(_)));
    }

    #[test]
    fn delivered_flag_blocks_cancellation() {
        let now = Utc::now();
        let mut order = sample_order(now);
        order.is_delivered = true;

        assert!(cancel_guard(&order, &CheckoutPolicy::default(), now).is_err());
    }

    #[test]
    fn order_numbers_are_prefixed_and_unambiguous() {
        let number = order_number();

        assert!(number.starts_with("TL-"));
        assert_eq!(number.len(), 11);
        // 0, 1, I, L and O are excluded from the charset.
        assert!(!number[3..].chars().any(|c| "01ILO".contains(c)));
    }

    #[test]
    fn reservation_lines_use_variant_keys() {
        let product_id = Uuid::nil();
        let lines = reservation_lines(&[NewOrderItem {
            product_id,
            name: "Boxy Tee".into(),
            size: "L".into(),
            color: "ecru".into(),
            quantity: 2,
            unit_price: dec!(899),
            image_url: None,
        }]);

        assert_eq!(lines[0].variant_key, format!("{}:L:ecru", product_id));
        assert_eq!(lines[0].quantity, 2);
    }
}
