use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in the stock ledger. `quantity` is always positive; the
/// direction comes from `movement_type`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub movement_type: String,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Signed effect this movement has on the product's cached quantity.
    pub fn signed_change(&self) -> i32 {
        match MovementType::from_str(&self.movement_type) {
            Some(ty) => ty.signed(self.quantity),
            // Unknown rows cannot exist past input validation; treat as inert.
            None => 0,
        }
    }
}

/// Direction of a stock movement, stored as a plain string column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementType::In),
            "out" => Some(MovementType::Out),
            _ => None,
        }
    }

    /// Signed delta for a requested quantity, e.g. `Out` turns 30 into -30.
    pub fn signed(&self, quantity: i32) -> i32 {
        match self {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips_through_strings() {
        for ty in [MovementType::In, MovementType::Out] {
            assert_eq!(MovementType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(MovementType::from_str("sideways"), None);
    }

    #[test]
    fn signed_applies_direction() {
        assert_eq!(MovementType::In.signed(30), 30);
        assert_eq!(MovementType::Out.signed(30), -30);
    }

    #[test]
    fn signed_change_reads_the_stored_type() {
        let movement = Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 12,
            movement_type: "out".into(),
            reason: None,
            reference: None,
            user_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(movement.signed_change(), -12);
    }
}
