//! Transaction item entity - One debited line of a purchase.
use super::sea_orm_active_enums::{BenefitCategory, Unit};
use crate::core::amount;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning transaction
    pub transaction_id: i64,
    /// Benefit row that was debited
    pub benefit_id: i64,
    /// Category debited
    pub category: BenefitCategory,
    /// Quantity debited, in milli-units of `unit`
    pub quantity: i64,
    /// Unit of `quantity`
    pub unit: Unit,
    /// Resolved product name
    pub product_name: String,
    /// Food type, used for monthly caps
    pub food_type: Option<String>,
}

/// Defines relationships between `TransactionItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one transaction
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id"
    )]
    Transaction,
    /// Each item debits one benefit
    #[sea_orm(
        belongs_to = "super::benefit::Entity",
        from = "Column::BenefitId",
        to = "super::benefit::Column::Id"
    )]
    Benefit,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::benefit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Benefit.def()
    }
}

impl Model {
    /// Quantity debited, in `unit`
    #[must_use]
    pub fn amount(&self) -> Decimal {
        amount::from_milli(self.quantity)
    }
}

impl ActiveModelBehavior for ActiveModel {}
