//! Transaction entity - Immutable purchase header.
//!
//! Each transaction has a `card_number`, optional `store`, `timestamp` and the
//! `month_period` it was charged to. Line items live in [`super::transaction_item`].
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Card the purchase was charged to
    pub card_number: String,
    /// Store name, if known
    pub store: Option<String>,
    /// When the purchase was confirmed
    pub timestamp: DateTimeUtc,
    /// Benefit period charged, `YYYY-MM`
    pub month_period: String,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One transaction has many line items
    #[sea_orm(has_many = "super::transaction_item::Entity")]
    Items,
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
