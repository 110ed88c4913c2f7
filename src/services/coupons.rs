use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::coupon::{self, Entity as Coupon},
    errors::{CouponError, ServiceError},
};

/// Outcome of a read-only validation. `new_total` is what the order would
/// settle at if the coupon were committed right now.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CouponQuote {
    pub discount: Decimal,
    pub new_total: Decimal,
    pub coupon: coupon::Model,
}

#[derive(Clone)]
pub struct CouponService {
    db: DatabaseConnection,
}

impl CouponService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Read-only and repeatable. Checks run in a fixed order so the caller
    /// always sees the most actionable failure first.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        server_total: Decimal,
        user_id: Uuid,
    ) -> Result<CouponQuote, ServiceError> {
        let coupon = self.find_for_user(&self.db, code, user_id).await?;

        if coupon.is_expired(Utc::now()) {
            return Err(CouponError::Expired.into());
        }
        if coupon.is_used() {
            return Err(CouponError::AlreadyUsed.into());
        }
        if server_total < coupon.min_order {
            return Err(CouponError::MinOrderNotMet(coupon.min_order).into());
        }

        let discount = coupon.discount_for(server_total);
        debug!(code, %discount, "coupon quote computed");

        Ok(CouponQuote {
            discount,
            new_total: server_total - discount,
            coupon,
        })
    }

    /// Commitment write, run inside the order-creation transaction. The
    /// single conditional UPDATE is what makes one-shot redemption hold
    /// under concurrent checkouts: only one statement can see `used_at`
    /// still NULL.
    #[instrument(skip(self, conn))]
    pub async fn redeem<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        // Surfaces NotFound (and hides other users' codes) before the
        // conditional write narrows everything else to AlreadyUsed.
        self.find_for_user(conn, code, user_id).await?;

        let result = Coupon::update_many()
            .col_expr(coupon::Column::UsedAt, Expr::value(Utc::now()))
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::UsedAt.is_null())
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(CouponError::AlreadyUsed.into());
        }

        Ok(())
    }

    /// A coupon bound to another user is reported as missing rather than
    /// forbidden, so codes cannot be probed.
    async fn find_for_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        user_id: Uuid,
    ) -> Result<coupon::Model, ServiceError> {
        let coupon = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(conn)
            .await?
            .ok_or(CouponError::NotFound)?;

        if let Some(owner) = coupon.user_id {
            if owner != user_id {
                return Err(CouponError::NotFound.into());
            }
        }

        Ok(coupon)
    }
}
