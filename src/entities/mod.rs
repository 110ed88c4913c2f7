pub mod coupon;
pub mod loyalty_account;
pub mod order;
pub mod order_item;
pub mod order_note;
pub mod surprise_template;

pub use coupon::DiscountKind;
pub use loyalty_account::LoyaltyLevel;
pub use order::{
    OrderStatus, PaymentMethod, RefundMethod, RefundStatus, ReturnReason, ReturnStatus,
    ShippingAddress,
};
