//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation. Tables are generated from
//! the entity definitions with `Schema::create_table_from_entity`, so the schema
//! always matches the Rust structs. The one thing the entities cannot express is
//! the composite uniqueness of a benefit row, which is added as an explicit index.

use crate::entities::{
    ApprovedFood, Benefit, Product, SystemState, Transaction, TransactionItem, benefit,
};
use crate::errors::{Error, Result};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/wic_ledger.sqlite?mode=rwc";

/// Gets the database URL from `DATABASE_URL` or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Connects to the database named by [`get_database_url`], creating the
/// directory of a file-backed `SQLite` database first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!(%database_url, "connecting to database");

    if let Some(dir) = sqlite_directory(&database_url) {
        std::fs::create_dir_all(dir).map_err(|e| Error::Config {
            message: format!("Failed to create database directory {dir}: {e}"),
        })?;
    }

    Database::connect(&database_url).await.map_err(Into::into)
}

fn sqlite_directory(database_url: &str) -> Option<&str> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    let (dir, _file) = path.rsplit_once('/')?;
    (!dir.is_empty()).then_some(dir)
}

/// Creates every table that does not exist yet, plus the unique index that
/// makes issuing benefits idempotent.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Referenced tables first
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, ApprovedFood).await?;
    create_table(db, &schema, Benefit).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, TransactionItem).await?;
    create_table(db, &schema, SystemState).await?;

    let benefit_key = Index::create()
        .name("idx_benefits_card_category_period")
        .table(Benefit)
        .col(benefit::Column::CardNumber)
        .col(benefit::Column::Category)
        .col(benefit::Column::MonthPeriod)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&benefit_key)).await?;

    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(db.get_database_backend().build(&statement))
        .await?;
    Ok(())
}
