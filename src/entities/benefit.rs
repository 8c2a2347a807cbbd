//! Benefit entity - One balance per card, category and month period.
//!
//! `remaining_amount` starts equal to `total_amount` and is only ever lowered by
//! purchases. Both are stored in thousandths of `unit`; use [`Model::total`] and
//! [`Model::remaining`] for the decimal values. Rows outlive their period so
//! history stays queryable.

use super::sea_orm_active_enums::{BenefitCategory, Unit};
use crate::core::amount;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Benefit database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "benefits")]
pub struct Model {
    /// Unique identifier for the benefit row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Beneficiary card number
    pub card_number: String,
    /// Benefit category
    pub category: BenefitCategory,
    /// Canonical unit of the category
    pub unit: Unit,
    /// Period in `YYYY-MM` form
    pub month_period: String,
    /// Amount issued for the period, in milli-units
    pub total_amount: i64,
    /// Amount still available, in milli-units
    pub remaining_amount: i64,
    /// Last calendar day the benefit can be used
    pub expires_at: Date,
    /// When the row was issued
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Benefit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One benefit is debited by many transaction items
    #[sea_orm(has_many = "super::transaction_item::Entity")]
    TransactionItems,
}

impl Related<super::transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionItems.def()
    }
}

impl Model {
    /// Amount issued for the period
    #[must_use]
    pub fn total(&self) -> Decimal {
        amount::from_milli(self.total_amount)
    }

    /// Amount still available
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        amount::from_milli(self.remaining_amount)
    }

    /// Amount used so far
    #[must_use]
    pub fn spent(&self) -> Decimal {
        amount::from_milli(self.total_amount - self.remaining_amount)
    }
}

impl ActiveModelBehavior for ActiveModel {}
