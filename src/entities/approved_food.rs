//! Approved food entity - Pairs a product (or a whole food type) with a benefit category.
//!
//! `product_id = None` marks a category-level generic entry matching any catalog
//! product of the same food type. `brand = Some(..)` restricts the entry to
//! that brand.

use super::sea_orm_active_enums::BenefitCategory;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Approved food database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "approved_foods")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog product, or None for a category-level entry
    pub product_id: Option<i64>,
    /// Category the food is charged against
    pub category: BenefitCategory,
    /// Food type (e.g., "milk")
    pub food_type: String,
    /// Brand restriction, if any
    pub brand: Option<String>,
    /// False marks an explicit exclusion
    pub is_approved: bool,
}

/// Defines relationships between `ApprovedFood` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each approved food optionally belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
