use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Line-item snapshot copied from the cart at checkout. Product data is
/// frozen here; later catalog edits never change an existing order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub order_id: Uuid,

    pub product_id: Uuid,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Key the inventory service reserves stock under.
    pub fn variant_key(&self) -> String {
        format!("{}:{}:{}", self.product_id, self.size, self.color)
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn variant_key_includes_size_and_color() {
        let item = Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            name: "Oversized Tee".into(),
            size: "M".into(),
            color: "olive".into(),
            quantity: 2,
            unit_price: dec!(799),
            image_url: None,
        };
        assert_eq!(item.variant_key(), format!("{}:M:olive", Uuid::nil()));
        assert_eq!(item.line_total(), dec!(1598));
    }
}
