//! Shared test utilities for the benefit ledger.
//!
//! This module provides common helpers for setting up test databases, a fixed
//! clock, standard allocations and a small product catalog.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        catalog::{self, NewApprovedFood, NewProduct},
        ledger::{self, Allocation},
        lookup::{ProductLookup, ScannedProduct},
        period::{Clock, FixedClock, MonthPeriod},
    },
    entities::{BenefitCategory, benefit},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection};
use std::path::Path;

/// Card used by most tests
pub const TEST_CARD: &str = "6001234567890123";
/// A second card for isolation checks
pub const OTHER_CARD: &str = "6009876543210987";

/// Half-gallon milk, approved generically and for its brand
pub const MILK_UPC: &str = "070038000563";
/// Gallon milk, approved but the wrong size
pub const MILK_GALLON_UPC: &str = "070038000570";
/// Bread approved only through a category-level entry
pub const BREAD_UPC: &str = "072250011372";
/// Cereal under a monthly cap
pub const CEREAL_UPC: &str = "016000275287";
/// Milk explicitly excluded
pub const ORGANIC_MILK_UPC: &str = "742365004445";

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Opens a file-backed `SQLite` database under `dir` with a pool of several
/// connections, so transactions really run on separate connections.
pub async fn setup_pooled_test_db(dir: &Path) -> Result<DatabaseConnection> {
    let url = format!("sqlite://{}?mode=rwc", dir.join("ledger.sqlite").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(4).min_connections(2);

    let db = sea_orm::Database::connect(options).await?;
    db.execute_unprepared("PRAGMA journal_mode=WAL").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Clock fixed at noon UTC on 2024-01-15.
pub fn test_clock() -> FixedClock {
    FixedClock::on(2024, 1, 15).unwrap()
}

/// The period of [`test_clock`], 2024-01.
pub fn test_period() -> MonthPeriod {
    test_clock().current_period()
}

/// A full set of monthly allocations.
///
/// * dairy: 4 gallons
/// * grains: 144 oz
/// * protein: 2 lbs
/// * fruits and vegetables: $11 each
pub fn test_allocations() -> Vec<Allocation> {
    vec![
        Allocation {
            category: BenefitCategory::Dairy,
            amount: Decimal::from(4),
        },
        Allocation {
            category: BenefitCategory::Grains,
            amount: Decimal::from(144),
        },
        Allocation {
            category: BenefitCategory::Protein,
            amount: Decimal::from(2),
        },
        Allocation {
            category: BenefitCategory::Fruits,
            amount: Decimal::from(11),
        },
        Allocation {
            category: BenefitCategory::Vegetables,
            amount: Decimal::from(11),
        },
    ]
}

/// Issues [`test_allocations`] to a card for [`test_period`].
pub async fn issue_test_benefits(
    db: &DatabaseConnection,
    card_number: &str,
) -> Result<Vec<benefit::Model>> {
    ledger::issue_benefits(db, &test_clock(), card_number, test_period(), &test_allocations())
        .await
}

/// Issues only a dairy balance of `amount` gallons for [`test_period`].
pub async fn issue_dairy_only(
    db: &DatabaseConnection,
    card_number: &str,
    amount: Decimal,
) -> Result<Vec<benefit::Model>> {
    let dairy = [Allocation {
        category: BenefitCategory::Dairy,
        amount,
    }];
    ledger::issue_benefits(db, &test_clock(), card_number, test_period(), &dairy).await
}

/// Half-gallon "Dairy Pure" whole milk under the given code.
pub fn milk_product(code: &str) -> NewProduct {
    NewProduct {
        code: code.to_string(),
        name: "Whole Milk".to_string(),
        brand: Some("Dairy Pure".to_string()),
        size_text: Some("1/2 gal".to_string()),
        image_url: None,
        food_type: Some("milk".to_string()),
    }
}

fn product(code: &str, name: &str, brand: &str, size_text: &str, food_type: &str) -> NewProduct {
    NewProduct {
        code: code.to_string(),
        name: name.to_string(),
        brand: Some(brand.to_string()),
        size_text: Some(size_text.to_string()),
        image_url: None,
        food_type: Some(food_type.to_string()),
    }
}

fn entry(
    code: Option<&str>,
    category: BenefitCategory,
    food_type: &str,
    brand: Option<&str>,
    is_approved: bool,
) -> NewApprovedFood {
    NewApprovedFood {
        code: code.map(str::to_string),
        category,
        food_type: food_type.to_string(),
        brand: brand.map(str::to_string),
        is_approved,
    }
}

/// Seeds the catalog used by the eligibility tests.
///
/// | code                 | size    | entries                                   |
/// |----------------------|---------|-------------------------------------------|
/// | [`MILK_UPC`]         | 1/2 gal | product (generic) + product "Dairy Pure" |
/// | [`MILK_GALLON_UPC`]  | 1 gal   | product                                   |
/// | [`BREAD_UPC`]        | 16 oz   | category-level grains/bread only          |
/// | [`CEREAL_UPC`]       | 18 oz   | product                                   |
/// | [`ORGANIC_MILK_UPC`] | 1/2 gal | product, excluded                         |
pub async fn seed_test_catalog(db: &DatabaseConnection) -> Result<()> {
    let clock = test_clock();

    let products = [
        milk_product(MILK_UPC),
        product(MILK_GALLON_UPC, "Whole Milk Gallon", "Dairy Pure", "1 gallon", "milk"),
        product(BREAD_UPC, "Whole Wheat Bread", "Nature's Own", "16 oz", "bread"),
        product(CEREAL_UPC, "Toasted Oats", "Cheerios", "18 oz", "cereal"),
        product(ORGANIC_MILK_UPC, "Organic Whole Milk", "Horizon", "1/2 gal", "milk"),
    ];
    for new_product in products {
        catalog::upsert_product(db, &clock, new_product).await?;
    }

    let entries = [
        entry(Some(MILK_UPC), BenefitCategory::Dairy, "milk", None, true),
        entry(Some(MILK_UPC), BenefitCategory::Dairy, "milk", Some("Dairy Pure"), true),
        entry(Some(MILK_GALLON_UPC), BenefitCategory::Dairy, "milk", None, true),
        entry(None, BenefitCategory::Grains, "bread", None, true),
        entry(Some(CEREAL_UPC), BenefitCategory::Grains, "cereal", None, true),
        entry(Some(ORGANIC_MILK_UPC), BenefitCategory::Dairy, "milk", None, false),
    ];
    for new_entry in entries {
        catalog::ensure_approved_food(db, new_entry).await?;
    }

    Ok(())
}

/// A lookup whose service is always down.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableLookup;

impl ProductLookup for UnavailableLookup {
    async fn lookup(&self, _code: &str) -> Result<Option<ScannedProduct>> {
        Err(Error::LookupUnavailable {
            message: "connection refused".to_string(),
        })
    }
}
