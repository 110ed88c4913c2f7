use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shape of a coupon's discount rule.
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
pub enum DiscountKind {
    /// `discount_value` is a percentage of the order total.
    #[sea_orm(string_value = "percentage")]
    #[strum(serialize = "percentage")]
    Percentage,
    /// `discount_value` is a fixed amount off.
    #[sea_orm(string_value = "flat")]
    #[strum(serialize = "flat")]
    Flat,
}

/// The `coupons` table. `used_at` transitions NULL to a timestamp exactly
/// once, via a conditional update in the coupon service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub code: String,

    pub description: Option<String>,

    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,

    /// Minimum order total required before the coupon applies.
    pub min_order: Decimal,

    pub expires_at: DateTime<Utc>,

    /// Owner binding. Claimed surprise coupons are user-scoped; campaign
    /// codes leave this NULL and anyone may redeem them.
    pub user_id: Option<Uuid>,

    pub used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Discount this coupon yields against `order_total`, capped so the
    /// payable amount never goes negative. Percentage discounts round to
    /// two decimal places.
    pub fn discount_for(&self, order_total: Decimal) -> Decimal {
        let raw = match self.discount_kind {
            DiscountKind::Percentage => {
                (order_total * self.discount_value / Decimal::from(100)).round_dp(2)
            }
            DiscountKind::Flat => self.discount_value,
        };
        raw.min(order_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coupon(kind: DiscountKind, value: Decimal) -> Model {
        Model {
            id: Uuid::new_v4(),
            code: "WELCOME10".into(),
            description: None,
            discount_kind: kind,
            discount_value: value,
            min_order: dec!(0),
            expires_at: Utc::now() + chrono::Duration::days(30),
            user_id: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_rounds_to_paise() {
        let c = coupon(DiscountKind::Percentage, dec!(10));
        assert_eq!(c.discount_for(dec!(1299)), dec!(129.90));
        assert_eq!(c.discount_for(dec!(333.33)), dec!(33.33));
    }

    #[test]
    fn flat_discount_is_capped_at_order_total() {
        let c = coupon(DiscountKind::Flat, dec!(500));
        assert_eq!(c.discount_for(dec!(1299)), dec!(500));
        assert_eq!(c.discount_for(dec!(300)), dec!(300));
    }

    #[test]
    fn expiry_is_a_strict_cutoff() {
        let mut c = coupon(DiscountKind::Flat, dec!(100));
        c.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(c.is_expired(Utc::now()));
    }
}
