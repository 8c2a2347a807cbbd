//! Product lookup collaborator.
//!
//! A lookup turns a scanned UPC or PLU into the plain product data the
//! evaluator needs. Remote services may fail; [`lookup_or_none`] downgrades
//! those failures to "not found" so evaluation always yields an outcome.

use crate::{
    core::catalog,
    entities::product,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use tracing::warn;

/// Product data as returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedProduct {
    /// Code that was scanned
    pub code: String,
    /// Product name
    pub name: String,
    /// Brand, if known
    pub brand: Option<String>,
    /// Image URL, if known
    pub image_url: Option<String>,
    /// Package size as printed; empty when unknown
    pub size_text: String,
}

impl From<product::Model> for ScannedProduct {
    fn from(product: product::Model) -> Self {
        Self {
            code: product.code,
            name: product.name,
            brand: product.brand,
            image_url: product.image_url,
            size_text: product.size_text.unwrap_or_default(),
        }
    }
}

/// Source of product data keyed by UPC or PLU.
#[allow(async_fn_in_trait)]
pub trait ProductLookup {
    /// Returns the product for `code`, `Ok(None)` if the service does not know
    /// it, or an error if the service could not be reached.
    async fn lookup(&self, code: &str) -> Result<Option<ScannedProduct>>;
}

/// Looks products up in the local catalog table.
#[derive(Debug, Clone, Copy)]
pub struct CatalogLookup<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CatalogLookup<'a> {
    /// Wraps a database connection.
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ProductLookup for CatalogLookup<'_> {
    async fn lookup(&self, code: &str) -> Result<Option<ScannedProduct>> {
        Ok(catalog::get_product_by_code(self.db, code)
            .await?
            .map(ScannedProduct::from))
    }
}

/// Fixed in-memory product data.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    products: HashMap<String, ScannedProduct>,
}

impl StaticLookup {
    /// Adds a product, replacing any previous entry with the same code.
    #[must_use]
    pub fn with_product(mut self, product: ScannedProduct) -> Self {
        self.products.insert(product.code.clone(), product);
        self
    }
}

impl ProductLookup for StaticLookup {
    async fn lookup(&self, code: &str) -> Result<Option<ScannedProduct>> {
        Ok(self.products.get(code.trim()).cloned())
    }
}

/// Calls the lookup and treats any failure as an unknown product.
pub async fn lookup_or_none<L>(lookup: &L, code: &str) -> Option<ScannedProduct>
where
    L: ProductLookup,
{
    match lookup.lookup(code).await {
        Ok(product) => product,
        Err(error) => {
            warn!(code, %error, "product lookup failed, treating as not found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_catalog_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        seed_test_catalog(&db).await?;

        let lookup = CatalogLookup::new(&db);
        let product = lookup.lookup(MILK_UPC).await?.unwrap();
        assert_eq!(product.name, "Whole Milk");
        assert_eq!(product.size_text, "1/2 gal");
        assert!(lookup.lookup("000000000000").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_or_none_downgrades_failures() {
        assert!(lookup_or_none(&UnavailableLookup, MILK_UPC).await.is_none());

        let lookup = StaticLookup::default().with_product(ScannedProduct {
            code: "4011".to_string(),
            name: "Bananas".to_string(),
            brand: None,
            image_url: None,
            size_text: "1 lb".to_string(),
        });
        assert_eq!(
            lookup_or_none(&lookup, "4011").await.unwrap().name,
            "Bananas"
        );
        assert!(lookup_or_none(&lookup, "4012").await.is_none());
    }
}
