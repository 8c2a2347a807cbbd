//! Product catalog and approved-food business logic.
//!
//! The catalog is read-mostly: it is seeded from configuration and queried by
//! the eligibility evaluator. Products are keyed by UPC or PLU code, and each
//! product may be referenced by several approved-food entries (brand-specific
//! or generic). Category-level entries without a product match any product of
//! the same food type.

use crate::{
    core::period::Clock,
    entities::{ApprovedFood, BenefitCategory, Product, approved_food, product},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Input for creating or refreshing a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    /// UPC or PLU code
    pub code: String,
    /// Display name
    pub name: String,
    /// Brand, if any
    #[serde(default)]
    pub brand: Option<String>,
    /// Package size as printed
    #[serde(default)]
    pub size_text: Option<String>,
    /// Image URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// Food type used by size rules
    #[serde(default)]
    pub food_type: Option<String>,
}

/// Input for an approved-food entry. `code = None` creates a category-level entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewApprovedFood {
    /// Product code, or None for a generic category entry
    #[serde(default)]
    pub code: Option<String>,
    /// Category charged
    pub category: BenefitCategory,
    /// Food type
    pub food_type: String,
    /// Brand restriction
    #[serde(default)]
    pub brand: Option<String>,
    /// False records an explicit exclusion
    #[serde(default = "default_approved")]
    pub is_approved: bool,
}

const fn default_approved() -> bool {
    true
}

/// A catalog product together with the approved-food entries that may apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    /// The product found by code
    pub product: product::Model,
    /// Entries in the requested category, unranked
    pub foods: Vec<approved_food::Model>,
}

/// Retrieves all products ordered alphabetically by name.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by its UPC or PLU code.
pub async fn get_product_by_code<C>(db: &C, code: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Code.eq(code.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a product, or refreshes the descriptive fields of the product
/// already registered under the same code.
///
/// # Errors
/// Returns an error if:
/// - The code or name is empty or whitespace-only
/// - The database operation fails
pub async fn upsert_product(
    db: &DatabaseConnection,
    clock: &impl Clock,
    new_product: NewProduct,
) -> Result<product::Model> {
    let code = new_product.code.trim().to_string();
    if code.is_empty() {
        return Err(Error::Config {
            message: "Product code cannot be empty".to_string(),
        });
    }
    if new_product.name.trim().is_empty() {
        return Err(Error::Config {
            message: "Product name cannot be empty".to_string(),
        });
    }

    let now = clock.now().naive_utc();

    if let Some(existing) = get_product_by_code(db, &code).await? {
        let mut product: product::ActiveModel = existing.into();
        product.name = Set(new_product.name.trim().to_string());
        product.brand = Set(new_product.brand);
        product.size_text = Set(new_product.size_text);
        product.image_url = Set(new_product.image_url);
        product.food_type = Set(new_product.food_type);
        product.updated_at = Set(now);
        return product.update(db).await.map_err(Into::into);
    }

    let product = product::ActiveModel {
        code: Set(code),
        name: Set(new_product.name.trim().to_string()),
        brand: Set(new_product.brand),
        size_text: Set(new_product.size_text),
        image_url: Set(new_product.image_url),
        food_type: Set(new_product.food_type),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Registers an approved-food entry unless an identical one exists.
///
/// # Errors
/// Returns [`Error::NotFound`] if `code` names a product missing from the catalog.
pub async fn ensure_approved_food(
    db: &DatabaseConnection,
    entry: NewApprovedFood,
) -> Result<approved_food::Model> {
    if entry.food_type.trim().is_empty() {
        return Err(Error::Config {
            message: "Food type cannot be empty".to_string(),
        });
    }

    let product_id = match entry.code.as_deref() {
        Some(code) => Some(
            get_product_by_code(db, code)
                .await?
                .ok_or_else(|| Error::NotFound {
                    code: code.to_string(),
                })?
                .id,
        ),
        None => None,
    };

    let food_type = entry.food_type.trim().to_lowercase();
    let existing = ApprovedFood::find()
        .filter(approved_food::Column::Category.eq(entry.category))
        .filter(approved_food::Column::FoodType.eq(food_type.as_str()))
        .filter(match product_id {
            Some(id) => approved_food::Column::ProductId.eq(id),
            None => approved_food::Column::ProductId.is_null(),
        })
        .filter(match entry.brand.as_deref() {
            Some(brand) => approved_food::Column::Brand.eq(brand),
            None => approved_food::Column::Brand.is_null(),
        })
        .one(db)
        .await?;

    if let Some(existing) = existing {
        if existing.is_approved == entry.is_approved {
            return Ok(existing);
        }
        let mut food: approved_food::ActiveModel = existing.into();
        food.is_approved = Set(entry.is_approved);
        return food.update(db).await.map_err(Into::into);
    }

    approved_food::ActiveModel {
        product_id: Set(product_id),
        category: Set(entry.category),
        food_type: Set(food_type),
        brand: Set(entry.brand),
        is_approved: Set(entry.is_approved),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Looks up `code` and returns the approved-food entries in `category` that
/// could apply to it: entries referencing the product and category-level
/// entries for the product's food type. Returns `None` for unknown codes.
pub async fn find_candidates<C>(
    db: &C,
    code: &str,
    category: BenefitCategory,
) -> Result<Option<Candidates>>
where
    C: ConnectionTrait,
{
    let Some(product) = get_product_by_code(db, code).await? else {
        return Ok(None);
    };

    let mut scope = Condition::any().add(approved_food::Column::ProductId.eq(product.id));
    if let Some(food_type) = product.food_type.as_deref() {
        scope = scope.add(
            Condition::all()
                .add(approved_food::Column::ProductId.is_null())
                .add(approved_food::Column::FoodType.eq(food_type.to_lowercase())),
        );
    }

    let foods = ApprovedFood::find()
        .filter(approved_food::Column::Category.eq(category))
        .filter(scope)
        .order_by_asc(approved_food::Column::Id)
        .all(db)
        .await?;

    Ok(Some(Candidates { product, foods }))
}
