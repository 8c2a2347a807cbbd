//! Benefit ledger - Issues, reads and debits per-period category balances.
//!
//! Every debit runs inside a database transaction and lowers the balance with a
//! single conditional `UPDATE ... WHERE remaining_amount >= quantity`, so two
//! concurrent purchases can never both pass the balance check. Both sides of
//! that check are integer milli-units (see [`crate::core::amount`]). Purchases
//! are all-or-nothing: nothing is partially applied.

use crate::{
    core::{
        amount,
        period::{Clock, MonthPeriod},
    },
    entities::{Benefit, BenefitCategory, Unit, benefit, transaction, transaction_item},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Amount issued for one category each period.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Allocation {
    /// Category the amount is issued in
    pub category: BenefitCategory,
    /// Amount in the category's canonical unit
    pub amount: Decimal,
}

/// One line of a purchase to be charged against a benefit.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseLine {
    /// Category to debit
    pub category: BenefitCategory,
    /// Quantity to debit
    pub quantity: Decimal,
    /// Unit of `quantity`; must be the category's canonical unit
    pub unit: Unit,
    /// Resolved product name for the receipt
    pub product_name: String,
    /// Food type, recorded for monthly caps
    pub food_type: Option<String>,
}

impl PurchaseLine {
    /// Creates a line without a food type.
    pub fn new(
        category: BenefitCategory,
        quantity: Decimal,
        unit: Unit,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            category,
            quantity,
            unit,
            product_name: product_name.into(),
            food_type: None,
        }
    }

    /// Tags the line with a food type.
    #[must_use]
    pub fn with_food_type(mut self, food_type: impl Into<String>) -> Self {
        self.food_type = Some(food_type.into());
        self
    }

    /// Checks the unit first, then the quantity, and returns the quantity in
    /// milli-units.
    pub fn validate(&self) -> Result<i64> {
        let expected = self.category.canonical_unit();
        if self.unit != expected {
            return Err(Error::UnitMismatch {
                category: self.category,
                expected,
                actual: self.unit,
            });
        }
        if self.quantity <= Decimal::ZERO {
            return Err(Error::InvalidAmount {
                amount: self.quantity,
            });
        }
        amount::to_milli(self.quantity)
    }
}

/// Returns the balances for a card and period ordered by category, or an
/// empty list if the period was never issued.
pub async fn get_benefits<C>(
    db: &C,
    card_number: &str,
    period: MonthPeriod,
) -> Result<Vec<benefit::Model>>
where
    C: ConnectionTrait,
{
    Benefit::find()
        .filter(benefit::Column::CardNumber.eq(card_number))
        .filter(benefit::Column::MonthPeriod.eq(period.to_string()))
        .order_by_asc(benefit::Column::Id)
        .all(db)
        .await
        .map(|mut rows| {
            rows.sort_by_key(|row| row.category);
            rows
        })
        .map_err(Into::into)
}

/// Finds a single category balance.
pub async fn get_benefit<C>(
    db: &C,
    card_number: &str,
    category: BenefitCategory,
    period: MonthPeriod,
) -> Result<Option<benefit::Model>>
where
    C: ConnectionTrait,
{
    Benefit::find()
        .filter(benefit::Column::CardNumber.eq(card_number))
        .filter(benefit::Column::Category.eq(category))
        .filter(benefit::Column::MonthPeriod.eq(period.to_string()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Issues full balances for a period. Categories already issued for the
/// period are left untouched, so calling this again is harmless.
pub async fn issue_benefits(
    db: &DatabaseConnection,
    clock: &impl Clock,
    card_number: &str,
    period: MonthPeriod,
    allocations: &[Allocation],
) -> Result<Vec<benefit::Model>> {
    if card_number.trim().is_empty() {
        return Err(Error::Config {
            message: "Card number cannot be empty".to_string(),
        });
    }
    let mut amounts = Vec::with_capacity(allocations.len());
    for allocation in allocations {
        if allocation.amount.is_sign_negative() {
            return Err(Error::InvalidAmount {
                amount: allocation.amount,
            });
        }
        amounts.push((allocation.category, amount::to_milli(allocation.amount)?));
    }

    let txn = db.begin().await?;
    let inserted = insert_missing(
        &txn,
        clock.now(),
        card_number,
        period,
        amounts,
    )
    .await?;
    txn.commit().await?;

    info!(card_number, %period, inserted, "benefits issued");
    get_benefits(db, card_number, period).await
}

/// Creates full-balance rows for `to` using the totals issued in `from`.
///
/// Balances left over in `from` are not carried forward and `from` rows are
/// not modified. Rows that already exist for `to` are kept as they are, which
/// makes the operation safe to retry.
pub async fn rollover_period(
    db: &DatabaseConnection,
    clock: &impl Clock,
    card_number: &str,
    from: MonthPeriod,
    to: MonthPeriod,
) -> Result<Vec<benefit::Model>> {
    if to <= from {
        return Err(Error::InvalidPeriod {
            value: to.to_string(),
        });
    }

    let txn = db.begin().await?;
    let previous = get_benefits(&txn, card_number, from).await?;
    if previous.is_empty() {
        warn!(card_number, %from, %to, "nothing to roll over");
    }
    let inserted = insert_missing(
        &txn,
        clock.now(),
        card_number,
        to,
        previous.iter().map(|b| (b.category, b.total_amount)),
    )
    .await?;
    txn.commit().await?;

    info!(card_number, %from, %to, inserted, "period rolled over");
    get_benefits(db, card_number, to).await
}

async fn insert_missing<C, I>(
    conn: &C,
    now: DateTime<Utc>,
    card_number: &str,
    period: MonthPeriod,
    amounts: I,
) -> Result<u64>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = (BenefitCategory, i64)>,
{
    let expires_at = period.expires_at()?;
    let mut inserted = 0;

    for (category, milli) in amounts {
        let row = benefit::ActiveModel {
            card_number: Set(card_number.to_string()),
            category: Set(category),
            unit: Set(category.canonical_unit()),
            month_period: Set(period.to_string()),
            total_amount: Set(milli),
            remaining_amount: Set(milli),
            expires_at: Set(expires_at),
            created_at: Set(now),
            ..Default::default()
        };

        inserted += Benefit::insert(row)
            .on_conflict(
                OnConflict::columns([
                    benefit::Column::CardNumber,
                    benefit::Column::Category,
                    benefit::Column::MonthPeriod,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }

    Ok(inserted)
}

/// Debits one purchase line and records it as its own transaction.
///
/// Fails with [`Error::UnitMismatch`] if `line.unit` is not the category's
/// unit, [`Error::BenefitNotFound`] or [`Error::BenefitExpired`] if there is no
/// usable balance, and [`Error::InsufficientBenefit`] if the quantity exceeds
/// what remains. On failure nothing is written.
pub async fn apply_purchase(
    db: &DatabaseConnection,
    clock: &impl Clock,
    card_number: &str,
    line: &PurchaseLine,
    period: MonthPeriod,
) -> Result<benefit::Model> {
    line.validate()?;

    let txn = db.begin().await?;

    let header = transaction::ActiveModel {
        card_number: Set(card_number.to_string()),
        store: Set(None),
        timestamp: Set(clock.now()),
        month_period: Set(period.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let updated = debit_line(&txn, clock.today(), card_number, header.id, line, period).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Debits a line within an open database transaction and appends its item row.
pub(crate) async fn debit_line<C>(
    conn: &C,
    today: NaiveDate,
    card_number: &str,
    transaction_id: i64,
    line: &PurchaseLine,
    period: MonthPeriod,
) -> Result<benefit::Model>
where
    C: ConnectionTrait,
{
    let quantity = line.validate()?;

    let benefit = get_benefit(conn, card_number, line.category, period)
        .await?
        .ok_or_else(|| Error::BenefitNotFound {
            card_number: card_number.to_string(),
            category: line.category,
            period: period.to_string(),
        })?;

    if today > benefit.expires_at {
        return Err(Error::BenefitExpired {
            period: benefit.month_period,
            expires_at: benefit.expires_at,
        });
    }

    // Check and decrement in one statement
    let result = Benefit::update_many()
        .col_expr(
            benefit::Column::RemainingAmount,
            Expr::col(benefit::Column::RemainingAmount).sub(quantity),
        )
        .filter(benefit::Column::Id.eq(benefit.id))
        .filter(benefit::Column::RemainingAmount.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let remaining = Benefit::find_by_id(benefit.id)
            .one(conn)
            .await?
            .map_or_else(|| benefit.remaining(), |b| b.remaining());
        warn!(
            card_number,
            category = %line.category,
            %remaining,
            requested = %line.quantity,
            "purchase rejected"
        );
        return Err(Error::InsufficientBenefit {
            remaining,
            requested: line.quantity,
        });
    }

    transaction_item::ActiveModel {
        transaction_id: Set(transaction_id),
        benefit_id: Set(benefit.id),
        category: Set(line.category),
        quantity: Set(quantity),
        unit: Set(line.unit),
        product_name: Set(line.product_name.clone()),
        food_type: Set(line.food_type.clone()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    debug!(
        card_number,
        category = %line.category,
        quantity = %line.quantity,
        "benefit debited"
    );

    Benefit::find_by_id(benefit.id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::BenefitNotFound {
            card_number: card_number.to_string(),
            category: line.category,
            period: period.to_string(),
        })
}
