use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        coupon,
        loyalty_account::{self, Entity as LoyaltyAccount, LoyaltyLevel},
        surprise_template::{self, Entity as SurpriseTemplate},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
};

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LoyaltyStatus {
    pub stamps: i32,
    pub cycles_completed: i32,
    pub loyalty_level: LoyaltyLevel,
    pub claimed_coupons: Vec<coupon::Model>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ClaimOutcome {
    pub coupon: coupon::Model,
    pub cycles_completed: i32,
    pub loyalty_level: LoyaltyLevel,
}

/// Stamp ledger and cycle rewards. The two writes that matter (accrue,
/// claim) are single conditional UPDATEs, which is what keeps concurrent
/// settlements and concurrent claims from double-counting.
#[derive(Clone)]
pub struct LoyaltyService {
    db: DatabaseConnection,
    cycle_stamps: i32,
    event_sender: Option<Arc<EventSender>>,
}

impl LoyaltyService {
    pub fn new(
        db: DatabaseConnection,
        cycle_stamps: i32,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            cycle_stamps,
            event_sender,
        }
    }

    /// One stamp per settled order, called inside the settlement
    /// transaction. At the cap the increment is a recorded no-op; the
    /// customer has to claim before earning again. Returns the new stamp
    /// count, or `None` when capped.
    pub async fn accrue_stamp<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<i32>, ServiceError> {
        let account = self.find_or_create_account(conn, user_id).await?;

        let result = LoyaltyAccount::update_many()
            .col_expr(
                loyalty_account::Column::Stamps,
                Expr::col(loyalty_account::Column::Stamps).add(1),
            )
            .col_expr(loyalty_account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(loyalty_account::Column::UserId.eq(user_id))
            .filter(loyalty_account::Column::Stamps.lt(self.cycle_stamps))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            info!(%user_id, "stamp card full, accrual skipped");
            return Ok(None);
        }

        Ok(Some(account.stamps + 1))
    }

    #[instrument(skip(self))]
    pub async fn status(&self, user_id: Uuid) -> Result<LoyaltyStatus, ServiceError> {
        let account = self.find_or_create_account(&self.db, user_id).await?;

        let claimed_coupons = coupon::Entity::find()
            .filter(coupon::Column::UserId.eq(user_id))
            .filter(coupon::Column::Code.starts_with(SURPRISE_PREFIX))
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(LoyaltyStatus {
            stamps: account.stamps,
            cycles_completed: account.cycles_completed,
            loyalty_level: account.loyalty_level,
            claimed_coupons,
        })
    }

    /// Exchange a full stamp card for a surprise coupon. Two concurrent
    /// claims race on the conditional UPDATE; exactly one sees a full card.
    #[instrument(skip(self))]
    pub async fn claim(&self, user_id: Uuid) -> Result<ClaimOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let reset = LoyaltyAccount::update_many()
            .col_expr(loyalty_account::Column::Stamps, Expr::value(0))
            .col_expr(
                loyalty_account::Column::CyclesCompleted,
                Expr::col(loyalty_account::Column::CyclesCompleted).add(1),
            )
            .col_expr(loyalty_account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(loyalty_account::Column::UserId.eq(user_id))
            .filter(loyalty_account::Column::Stamps.eq(self.cycle_stamps))
            .exec(&txn)
            .await?;

        if reset.rows_affected == 0 {
            let stamps = LoyaltyAccount::find()
                .filter(loyalty_account::Column::UserId.eq(user_id))
                .one(&txn)
                .await?
                .map(|account| account.stamps)
                .unwrap_or(0);
            return Err(ServiceError::InsufficientStamps(stamps));
        }

        let account = LoyaltyAccount::find()
            .filter(loyalty_account::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("loyalty account not found".to_string()))?;

        let new_level = LoyaltyLevel::for_cycles(account.cycles_completed);
        if new_level != account.loyalty_level {
            let mut update: loyalty_account::ActiveModel = account.clone().into();
            update.loyalty_level = Set(new_level);
            update.update(&txn).await?;
        }

        let template = self.pick_active_template(&txn).await?;
        let now = Utc::now();
        let minted = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(surprise_code()),
            description: Set(Some(template.name.clone())),
            discount_kind: Set(template.discount_kind),
            discount_value: Set(template.discount_value),
            min_order: Set(template.min_order),
            expires_at: Set(now + Duration::days(i64::from(template.validity_days))),
            user_id: Set(Some(user_id)),
            used_at: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        metrics::LOYALTY_CLAIMS.inc();
        info!(%user_id, code = %minted.code, cycles = account.cycles_completed, "loyalty cycle claimed");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::SurpriseCouponMinted {
                    user_id,
                    coupon_code: minted.code.clone(),
                })
                .await
            {
                warn!(%user_id, error = %e, "failed to send coupon minted event");
            }
        }

        Ok(ClaimOutcome {
            coupon: minted,
            cycles_completed: account.cycles_completed,
            loyalty_level: new_level,
        })
    }

    async fn find_or_create_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<loyalty_account::Model, ServiceError> {
        if let Some(account) = LoyaltyAccount::find()
            .filter(loyalty_account::Column::UserId.eq(user_id))
            .one(conn)
            .await?
        {
            return Ok(account);
        }

        let account = loyalty_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            stamps: Set(0),
            cycles_completed: Set(0),
            loyalty_level: Set(LoyaltyLevel::Bronze),
            updated_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;

        Ok(account)
    }

    async fn pick_active_template<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<surprise_template::Model, ServiceError> {
        let templates = SurpriseTemplate::find()
            .filter(surprise_template::Column::IsActive.eq(true))
            .all(conn)
            .await?;

        if templates.is_empty() {
            return Err(ServiceError::InternalError(
                "no active surprise templates configured".to_string(),
            ));
        }

        let index = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..templates.len())
        };

        Ok(templates
            .into_iter()
            .nth(index)
            .ok_or_else(|| ServiceError::InternalError("template pick out of range".to_string()))?)
    }
}

const SURPRISE_PREFIX: &str = "SURPRISE-";

fn surprise_code() -> String {
    use rand::distributions::Alphanumeric;

    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..8)
            .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
            .collect()
    };

    format!("{}{}", SURPRISE_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surprise_codes_are_prefixed_and_uppercase() {
        let code = surprise_code();

        assert!(code.starts_with("SURPRISE-"));
        assert_eq!(code.len(), "SURPRISE-".len() + 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn surprise_codes_do_not_repeat_quickly() {
        let a = surprise_code();
        let b = surprise_code();

        assert_ne!(a, b);
    }
}
