use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Tier derived from completed loyalty cycles.
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
pub enum LoyaltyLevel {
    #[sea_orm(string_value = "bronze")]
    #[strum(serialize = "bronze")]
    Bronze,
    #[sea_orm(string_value = "silver")]
    #[strum(serialize = "silver")]
    Silver,
    #[sea_orm(string_value = "gold")]
    #[strum(serialize = "gold")]
    Gold,
    #[sea_orm(string_value = "platinum")]
    #[strum(serialize = "platinum")]
    Platinum,
}

impl LoyaltyLevel {
    /// Tier table: 0 bronze, 1-2 silver, 3-5 gold, 6+ platinum.
    pub fn for_cycles(cycles_completed: i32) -> Self {
        match cycles_completed {
            i32::MIN..=0 => LoyaltyLevel::Bronze,
            1..=2 => LoyaltyLevel::Silver,
            3..=5 => LoyaltyLevel::Gold,
            _ => LoyaltyLevel::Platinum,
        }
    }
}

/// The `loyalty_accounts` table, one row per customer. `stamps` is bounded
/// by the cycle length; only a claim resets it to zero.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub user_id: Uuid,

    pub stamps: i32,
    pub cycles_completed: i32,
    pub loyalty_level: LoyaltyLevel,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
