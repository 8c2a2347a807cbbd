//! Seeds the database from the program configuration.
//!
//! Every step is idempotent: products are upserted by code, approved-food
//! entries are matched before inserting, and benefits already issued for the
//! current period are left alone. Running the binary twice changes nothing.

use crate::{
    config::program::AppConfig,
    core::{catalog, ledger, period::Clock},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};

/// Counts of what a seeding run touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Products created or refreshed
    pub products: usize,
    /// Approved-food entries ensured
    pub approved_foods: usize,
    /// Cards with benefits for the current period
    pub cards: usize,
}

/// Loads the catalog and issues the current period's benefits to every
/// configured card.
pub async fn seed_from_config(
    db: &DatabaseConnection,
    clock: &impl Clock,
    config: &AppConfig,
) -> Result<SeedSummary> {
    info!(
        products = config.products.len(),
        approved_foods = config.approved_foods.len(),
        cards = config.cards.len(),
        "seeding from configuration"
    );
    config.validate()?;

    let mut summary = SeedSummary::default();

    for product in &config.products {
        debug!(code = %product.code, "seeding product");
        catalog::upsert_product(db, clock, product.clone()).await?;
        summary.products += 1;
    }

    for entry in &config.approved_foods {
        catalog::ensure_approved_food(db, entry.clone()).await?;
        summary.approved_foods += 1;
    }

    if config.allocations.is_empty() && !config.cards.is_empty() {
        warn!("cards are configured but no allocations; no benefits issued");
        return Ok(summary);
    }

    let period = clock.current_period();
    for card_number in &config.cards {
        ledger::issue_benefits(db, clock, card_number, period, &config.allocations).await?;
        summary.cards += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::catalog::{NewApprovedFood, get_all_products};
    use crate::core::ledger::{Allocation, PurchaseLine, apply_purchase};
    use crate::entities::{ApprovedFood, BenefitCategory, Unit};
    use crate::errors::Error;
    use crate::test_utils::*;
    use rust_decimal::Decimal;
    use sea_orm::{EntityTrait, PaginatorTrait};

    fn sample_config() -> AppConfig {
        AppConfig {
            allocations: test_allocations(),
            cards: vec![TEST_CARD.to_string(), OTHER_CARD.to_string()],
            products: vec![milk_product(MILK_UPC)],
            approved_foods: vec![NewApprovedFood {
                code: Some(MILK_UPC.to_string()),
                category: BenefitCategory::Dairy,
                food_type: "milk".to_string(),
                brand: None,
                is_approved: true,
            }],
            size_rules: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_seed_from_config() -> Result<()> {
        let db = setup_test_db().await?;
        let clock = test_clock();

        let summary = seed_from_config(&db, &clock, &sample_config()).await?;
        assert_eq!(
            summary,
            SeedSummary {
                products: 1,
                approved_foods: 1,
                cards: 2,
            }
        );

        assert_eq!(get_all_products(&db).await?.len(), 1);
        assert_eq!(ledger::get_benefits(&db, OTHER_CARD, test_period()).await?.len(), 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_twice_keeps_spent_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let clock = test_clock();
        seed_from_config(&db, &clock, &sample_config()).await?;

        let milk = PurchaseLine::new(BenefitCategory::Dairy, Decimal::ONE, Unit::Gallons, "Whole Milk");
        apply_purchase(&db, &clock, TEST_CARD, &milk, test_period()).await?;

        seed_from_config(&db, &clock, &sample_config()).await?;

        let dairy = ledger::get_benefit(&db, TEST_CARD, BenefitCategory::Dairy, test_period())
            .await?
            .unwrap();
        assert_eq!(dairy.remaining(), Decimal::from(3));
        assert_eq!(ApprovedFood::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_without_allocations_issues_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let config = AppConfig {
            allocations: Vec::new(),
            ..sample_config()
        };

        let summary = seed_from_config(&db, &test_clock(), &config).await?;
        assert_eq!(summary.cards, 0);
        assert!(ledger::get_benefits(&db, TEST_CARD, test_period()).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_rejects_invalid_allocation() -> Result<()> {
        let db = setup_test_db().await?;
        let config = AppConfig {
            allocations: vec![Allocation {
                category: BenefitCategory::Dairy,
                amount: Decimal::from(-4),
            }],
            ..sample_config()
        };

        let result = seed_from_config(&db, &test_clock(), &config).await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));
        assert!(get_all_products(&db).await?.is_empty());

        Ok(())
    }
}
