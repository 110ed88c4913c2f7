use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle states of an order. Transitions go through
/// [`OrderStatus::can_transition_to`]; call sites never compare raw strings.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    #[strum(serialize = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    #[strum(serialize = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    #[strum(serialize = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    #[strum(serialize = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    #[strum(serialize = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Central transition table for the fulfillment path. Cancellation is
    /// additionally guarded by the cancellation window in the order service.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }
}

/// How the customer pays. Online orders only come into existence through a
/// verified gateway receipt; COD orders settle via admin confirmation.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cod")]
    #[strum(serialize = "cod")]
    Cod,
    #[sea_orm(string_value = "online")]
    #[strum(serialize = "online")]
    Online,
}

/// Return workflow states. The chain is forward-only; `precedes` is the
/// single source of truth for which step may follow which.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[sea_orm(string_value = "requested")]
    #[strum(serialize = "requested")]
    Requested,
    #[sea_orm(string_value = "approved")]
    #[strum(serialize = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    #[strum(serialize = "rejected")]
    Rejected,
    #[sea_orm(string_value = "pickup_scheduled")]
    #[strum(serialize = "pickup_scheduled")]
    PickupScheduled,
    #[sea_orm(string_value = "picked_up")]
    #[strum(serialize = "picked_up")]
    PickedUp,
    #[sea_orm(string_value = "refund_processing")]
    #[strum(serialize = "refund_processing")]
    RefundProcessing,
    #[sea_orm(string_value = "refund_completed")]
    #[strum(serialize = "refund_completed")]
    RefundCompleted,
}

impl ReturnStatus {
    /// Whether `self` is the immediate predecessor of `next`. Skipping ahead
    /// in the chain is rejected by the returns service.
    pub fn precedes(&self, next: ReturnStatus) -> bool {
        use ReturnStatus::*;
        matches!(
            (self, next),
            (Requested, Approved)
                | (Requested, Rejected)
                | (Approved, PickupScheduled)
                | (PickupScheduled, PickedUp)
                | (PickedUp, RefundProcessing)
                | (RefundProcessing, RefundCompleted)
        )
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ReturnStatus::Rejected | ReturnStatus::RefundCompleted)
    }

    /// An active return blocks a second return request on the same order.
    pub fn is_active(&self) -> bool {
        !self.is_final()
    }
}

/// Closed list of reasons a customer can select when requesting a return.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    #[sea_orm(string_value = "defective_or_damaged")]
    #[strum(serialize = "defective_or_damaged")]
    DefectiveOrDamaged,
    #[sea_orm(string_value = "wrong_item")]
    #[strum(serialize = "wrong_item")]
    WrongItem,
    #[sea_orm(string_value = "size_or_fit")]
    #[strum(serialize = "size_or_fit")]
    SizeOrFit,
    #[sea_orm(string_value = "quality_not_as_expected")]
    #[strum(serialize = "quality_not_as_expected")]
    QualityNotAsExpected,
    #[sea_orm(string_value = "changed_mind")]
    #[strum(serialize = "changed_mind")]
    ChangedMind,
    #[sea_orm(string_value = "other")]
    #[strum(serialize = "other")]
    Other,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    #[sea_orm(string_value = "initiated")]
    #[strum(serialize = "initiated")]
    Initiated,
    #[sea_orm(string_value = "processing")]
    #[strum(serialize = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    #[strum(serialize = "completed")]
    Completed,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    #[sea_orm(string_value = "original")]
    #[strum(serialize = "original")]
    Original,
    #[sea_orm(string_value = "store_credit")]
    #[strum(serialize = "store_credit")]
    StoreCredit,
}

/// Shipping address snapshot persisted with the order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// The `orders` table. Orders are never deleted, only status-terminated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable order number (`TL-XXXXXXXX`).
    #[sea_orm(unique)]
    pub order_number: String,

    /// Owner of the order.
    pub user_id: Uuid,

    pub status: OrderStatus,
    pub payment_method: PaymentMethod,

    /// Address snapshot taken at checkout.
    #[sea_orm(column_type = "Json")]
    pub shipping_address: ShippingAddress,

    /// Server-recomputed breakdown. Client-sent totals are never stored.
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_price: Decimal,

    /// Coupon committed at checkout, if any.
    pub coupon_code: Option<String>,

    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,

    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,

    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,

    pub return_status: Option<ReturnStatus>,
    pub return_reason: Option<ReturnReason>,
    pub return_details: Option<String>,
    pub return_requested_at: Option<DateTime<Utc>>,

    pub refund_amount: Option<Decimal>,
    pub refund_method: Option<RefundMethod>,
    pub refund_transaction_id: Option<String>,
    pub refund_status: Option<RefundStatus>,
    pub refund_completed_at: Option<DateTime<Utc>>,

    /// Gateway receipt; all three stay NULL on COD orders. The unique index
    /// on `gateway_order_id` is what makes verify idempotent.
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,

    /// Optimistic lock, bumped on every mutation.
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_note::Entity")]
    OrderNote,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderNote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True while a return is underway; a second request is rejected until
    /// the current one reaches `rejected` or `refund_completed`.
    pub fn has_active_return(&self) -> bool {
        self.return_status.map(|s| s.is_active()).unwrap_or(false)
    }

    /// Refund fields freeze once the refund completes.
    pub fn refund_is_finalized(&self) -> bool {
        matches!(self.refund_status, Some(RefundStatus::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_transitions_follow_the_table() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Processing));
    }

    #[test]
    fn return_chain_is_forward_only() {
        use ReturnStatus::*;
        assert!(Requested.precedes(Approved));
        assert!(Requested.precedes(Rejected));
        assert!(Approved.precedes(PickupScheduled));
        assert!(PickupScheduled.precedes(PickedUp));
        assert!(PickedUp.precedes(RefundProcessing));
        assert!(RefundProcessing.precedes(RefundCompleted));

        assert!(!Requested.precedes(PickupScheduled));
        assert!(!Requested.precedes(RefundCompleted));
        assert!(!Approved.precedes(Rejected));
        assert!(!PickedUp.precedes(RefundCompleted));
        assert!(!RefundCompleted.precedes(Requested));
    }

    #[test]
    fn final_return_states_unblock_new_requests() {
        assert!(ReturnStatus::Rejected.is_final());
        assert!(ReturnStatus::RefundCompleted.is_final());
        assert!(ReturnStatus::Requested.is_active());
        assert!(ReturnStatus::RefundProcessing.is_active());
    }

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(ReturnStatus::PickupScheduled.to_string(), "pickup_scheduled");
        assert_eq!(ReturnReason::SizeOrFit.to_string(), "size_or_fit");
        assert_eq!(RefundMethod::StoreCredit.to_string(), "store_credit");
    }
}
