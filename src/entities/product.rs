//! Product entity - General product catalog keyed by UPC or PLU.
//!
//! Products describe what a scanner sees: name, brand and the package size as
//! printed. Approval lives in [`super::approved_food`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// UPC barcode or PLU code
    #[sea_orm(unique)]
    pub code: String,
    /// Display name (e.g., "Whole Milk")
    pub name: String,
    /// Brand, if any
    pub brand: Option<String>,
    /// Package size as printed (e.g., "1/2 gal")
    pub size_text: Option<String>,
    /// Product image URL
    pub image_url: Option<String>,
    /// Food type used for size rules (e.g., "milk", "bread", "cereal")
    pub food_type: Option<String>,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product has many approved food entries
    #[sea_orm(has_many = "super::approved_food::Entity")]
    ApprovedFoods,
}

impl Related<super::approved_food::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApprovedFoods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
