//! Transaction business logic - Records purchases and reads purchase history.
//!
//! A purchase is one transaction header plus one item per debited line. All
//! lines of a checkout are debited inside a single database transaction: if
//! any line fails validation or would overdraw its benefit, nothing is
//! written. Transactions are never updated or deleted afterwards.

use crate::{
    core::{
        amount,
        ledger::{self, PurchaseLine},
        period::{Clock, MonthPeriod},
        units::Quantity,
    },
    entities::{Transaction, TransactionItem, benefit, transaction, transaction_item},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// A committed purchase with the balances it left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Transaction header
    pub transaction: transaction::Model,
    /// Debited lines in checkout order
    pub items: Vec<transaction_item::Model>,
    /// Balances after the purchase, one per debited line
    pub balances: Vec<benefit::Model>,
}

/// Records a multi-line purchase against the clock's current period.
///
/// # Errors
/// Returns an error if `lines` is empty, or if any line fails the checks of
/// [`ledger::apply_purchase`]. No line is applied in that case.
pub async fn record_purchase(
    db: &DatabaseConnection,
    clock: &impl Clock,
    card_number: &str,
    store: Option<String>,
    lines: &[PurchaseLine],
) -> Result<Receipt> {
    if lines.is_empty() {
        return Err(Error::Config {
            message: "A purchase needs at least one line".to_string(),
        });
    }
    for line in lines {
        line.validate()?;
    }

    let period = clock.current_period();
    let txn = db.begin().await?;

    let header = transaction::ActiveModel {
        card_number: Set(card_number.to_string()),
        store: Set(store),
        timestamp: Set(clock.now()),
        month_period: Set(period.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut balances = Vec::with_capacity(lines.len());
    for line in lines {
        balances.push(
            ledger::debit_line(&txn, clock.today(), card_number, header.id, line, period).await?,
        );
    }

    let items = get_transaction_items(&txn, header.id).await?;
    txn.commit().await?;

    info!(
        card_number,
        transaction_id = header.id,
        lines = items.len(),
        "purchase recorded"
    );

    Ok(Receipt {
        transaction: header,
        items,
        balances,
    })
}

/// Retrieves the transactions of a card, newest first, optionally limited.
pub async fn get_transactions_for_card(
    db: &DatabaseConnection,
    card_number: &str,
    limit: Option<u64>,
) -> Result<Vec<transaction::Model>> {
    let mut query = Transaction::find()
        .filter(transaction::Column::CardNumber.eq(card_number))
        .order_by_desc(transaction::Column::Timestamp)
        .order_by_desc(transaction::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Retrieves the transactions a card made in one period, newest first,
/// optionally limited.
pub async fn get_transactions_for_period<C>(
    db: &C,
    card_number: &str,
    period: MonthPeriod,
    limit: Option<u64>,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Transaction::find()
        .filter(transaction::Column::CardNumber.eq(card_number))
        .filter(transaction::Column::MonthPeriod.eq(period.to_string()))
        .order_by_desc(transaction::Column::Timestamp)
        .order_by_desc(transaction::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Retrieves a transaction by its ID.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the line items of a transaction in checkout order.
pub async fn get_transaction_items<C>(
    db: &C,
    transaction_id: i64,
) -> Result<Vec<transaction_item::Model>>
where
    C: ConnectionTrait,
{
    TransactionItem::find()
        .filter(transaction_item::Column::TransactionId.eq(transaction_id))
        .order_by_asc(transaction_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Total quantity of `food_type` a card bought in a period, in the unit the
/// items were recorded in.
pub async fn purchased_quantity<C>(
    db: &C,
    card_number: &str,
    period: MonthPeriod,
    food_type: &str,
) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let items = TransactionItem::find()
        .inner_join(Transaction)
        .filter(transaction::Column::CardNumber.eq(card_number))
        .filter(transaction::Column::MonthPeriod.eq(period.to_string()))
        .filter(transaction_item::Column::FoodType.eq(food_type.to_lowercase()))
        .all(db)
        .await?;

    let Some(first) = items.first() else {
        return Ok(Decimal::ZERO);
    };
    let unit = first.unit;
    Ok(items
        .iter()
        .filter_map(|item| {
            if item.unit == unit {
                return Some(item.amount());
            }
            Quantity::new(amount::to_measure(item.amount()), item.unit)
                .convert_to(unit)
                .and_then(|quantity| amount::from_measure(quantity.amount))
        })
        .sum())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{BenefitCategory, Unit};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn basket() -> Vec<PurchaseLine> {
        vec![
            PurchaseLine::new(BenefitCategory::Dairy, Decimal::new(5, 1), Unit::Gallons, "Whole Milk")
                .with_food_type("milk"),
            PurchaseLine::new(BenefitCategory::Grains, Decimal::from(16), Unit::Oz, "Wheat Bread")
                .with_food_type("bread"),
            PurchaseLine::new(BenefitCategory::Fruits, Decimal::new(325, 2), Unit::Dollars, "Apples"),
        ]
    }

    #[tokio::test]
    async fn test_record_purchase_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let clock = test_clock();

        let result = record_purchase(&db, &clock, TEST_CARD, None, &[]).await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        let mut lines = basket();
        lines[1].unit = Unit::Lbs;
        let result = record_purchase(&db, &clock, TEST_CARD, None, &lines).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::UnitMismatch {
                category: BenefitCategory::Grains,
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_record_purchase_debits_every_line() -> Result<()> {
        let db = setup_test_db().await?;
        let clock = test_clock();
        issue_test_benefits(&db, TEST_CARD).await?;

        let receipt =
            record_purchase(&db, &clock, TEST_CARD, Some("Corner Market".to_string()), &basket())
                .await?;

        assert_eq!(receipt.items.len(), 3);
        assert_eq!(receipt.transaction.store.as_deref(), Some("Corner Market"));
        assert_eq!(receipt.balances[0].remaining(), Decimal::new(35, 1));
        assert_eq!(receipt.balances[1].remaining(), Decimal::from(128));
        assert_eq!(receipt.balances[2].remaining(), Decimal::new(775, 2));
        assert_eq!(receipt.items[2].amount(), Decimal::new(325, 2));

        let history = get_transactions_for_card(&db, TEST_CARD, None).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(
            get_transaction_by_id(&db, receipt.transaction.id).await?,
            Some(receipt.transaction)
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_record_purchase_is_all_or_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let clock = test_clock();
        issue_test_benefits(&db, TEST_CARD).await?;

        let mut lines = basket();
        lines.push(PurchaseLine::new(
            BenefitCategory::Vegetables,
            Decimal::from(50),
            Unit::Dollars,
            "Too Many Carrots",
        ));
        let result = record_purchase(&db, &clock, TEST_CARD, None, &lines).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBenefit { .. }
        ));

        let benefits = ledger::get_benefits(&db, TEST_CARD, test_period()).await?;
        assert!(benefits.iter().all(|b| b.remaining_amount == b.total_amount));
        assert!(get_transactions_for_card(&db, TEST_CARD, None).await?.is_empty());
        assert_eq!(TransactionItem::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_transactions_for_card_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        issue_test_benefits(&db, TEST_CARD).await?;
        issue_test_benefits(&db, OTHER_CARD).await?;

        let early = crate::core::period::FixedClock::on(2024, 1, 3).unwrap();
        let late = crate::core::period::FixedClock::on(2024, 1, 20).unwrap();
        let first = record_purchase(&db, &early, TEST_CARD, None, &basket()).await?;
        let second = record_purchase(&db, &late, TEST_CARD, None, &basket()).await?;
        record_purchase(&db, &late, OTHER_CARD, None, &basket()).await?;

        let history = get_transactions_for_card(&db, TEST_CARD, None).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.transaction.id);
        assert_eq!(history[1].id, first.transaction.id);

        let limited = get_transactions_for_card(&db, TEST_CARD, Some(1)).await?;
        assert_eq!(limited.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_transactions_for_period_filters_in_query() -> Result<()> {
        let db = setup_test_db().await?;
        let january = test_clock();
        let february = crate::core::period::FixedClock::on(2024, 2, 10).unwrap();
        issue_test_benefits(&db, TEST_CARD).await?;
        ledger::issue_benefits(
            &db,
            &february,
            TEST_CARD,
            february.current_period(),
            &test_allocations(),
        )
        .await?;

        let early = crate::core::period::FixedClock::on(2024, 1, 3).unwrap();
        let first = record_purchase(&db, &early, TEST_CARD, None, &basket()).await?;
        let second = record_purchase(&db, &january, TEST_CARD, None, &basket()).await?;
        let later = record_purchase(&db, &february, TEST_CARD, None, &basket()).await?;

        let jan = get_transactions_for_period(&db, TEST_CARD, test_period(), None).await?;
        let ids: Vec<_> = jan.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.transaction.id, first.transaction.id]);

        let newest = get_transactions_for_period(&db, TEST_CARD, test_period(), Some(1)).await?;
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].id, second.transaction.id);

        let feb =
            get_transactions_for_period(&db, TEST_CARD, february.current_period(), Some(5)).await?;
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].id, later.transaction.id);

        assert!(
            get_transactions_for_period(&db, OTHER_CARD, test_period(), None)
                .await?
                .is_empty()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_purchased_quantity_by_food_type() -> Result<()> {
        let db = setup_test_db().await?;
        let clock = test_clock();
        issue_test_benefits(&db, TEST_CARD).await?;

        let cereal = |oz: i64| {
            PurchaseLine::new(BenefitCategory::Grains, Decimal::from(oz), Unit::Oz, "Toasted Oats")
                .with_food_type("cereal")
        };
        record_purchase(&db, &clock, TEST_CARD, None, &[cereal(18), cereal(12)]).await?;
        record_purchase(&db, &clock, TEST_CARD, None, &basket()).await?;

        let total = purchased_quantity(&db, TEST_CARD, test_period(), "Cereal").await?;
        assert_eq!(total, Decimal::from(30));
        assert_eq!(
            purchased_quantity(&db, TEST_CARD, test_period().next(), "cereal").await?,
            Decimal::ZERO
        );
        assert_eq!(
            purchased_quantity(&db, OTHER_CARD, test_period(), "cereal").await?,
            Decimal::ZERO
        );

        Ok(())
    }
}
