//! Monthly rollover business logic
//!
//! At the start of each month every card that held benefits since the last
//! run gets full balances for the new period, copied from the latest period it
//! holds. Leftover amounts are not carried forward. The last completed period
//! is tracked in the `system_state` table so the job runs at most once per
//! month; each per-card rollover is itself idempotent, so a job interrupted
//! halfway can simply be run again.

use crate::{
    core::{
        ledger,
        period::{Clock, MonthPeriod},
    },
    entities::{Benefit, SystemState, benefit, system_state},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use std::fmt::Write;
use tracing::info;

const LAST_ROLLOVER_KEY: &str = "last_rollover_period";

/// Result of rolling one card over.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRollover {
    /// Card that was rolled over
    pub card_number: String,
    /// Period the card's totals were copied from
    pub from: MonthPeriod,
    /// Number of category balances present in the new period
    pub categories: usize,
}

/// Result of a rollover run across all cards.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloverSummary {
    /// Earliest period a card's totals could be copied from
    pub from: MonthPeriod,
    /// Period that was issued
    pub to: MonthPeriod,
    /// One entry per card, ordered by card number
    pub cards: Vec<CardRollover>,
}

/// Returns true when no rollover has been recorded for the clock's current period.
pub async fn is_rollover_needed(db: &DatabaseConnection, clock: &impl Clock) -> Result<bool> {
    let last = get_last_rollover_period(db).await?;
    Ok(last.is_none_or(|period| period < clock.current_period()))
}

/// Reads the last period the rollover job completed.
///
/// # Returns
/// * `Ok(Some(period))` - Last completed period
/// * `Ok(None)` - The job never ran
pub async fn get_last_rollover_period(db: &DatabaseConnection) -> Result<Option<MonthPeriod>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ROLLOVER_KEY))
        .one(db)
        .await?;

    state.map(|s| s.value.parse()).transpose()
}

async fn set_last_rollover_period<C>(db: &C, clock: &impl Clock, period: MonthPeriod) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = clock.now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ROLLOVER_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(period.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_ROLLOVER_KEY.to_string()),
            value: Set(period.to_string()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Latest period each card holds benefit rows in, within `since..before`,
/// ordered by card number.
pub async fn latest_card_periods(
    db: &DatabaseConnection,
    since: MonthPeriod,
    before: MonthPeriod,
) -> Result<Vec<(String, MonthPeriod)>> {
    // `YYYY-MM` keys sort the same as the periods they name
    let rows: Vec<(String, String)> = Benefit::find()
        .select_only()
        .column(benefit::Column::CardNumber)
        .column_as(benefit::Column::MonthPeriod.max(), "latest_period")
        .filter(benefit::Column::MonthPeriod.gte(since.to_string()))
        .filter(benefit::Column::MonthPeriod.lt(before.to_string()))
        .group_by(benefit::Column::CardNumber)
        .order_by_asc(benefit::Column::CardNumber)
        .into_tuple()
        .all(db)
        .await?;

    rows.into_iter()
        .map(|(card_number, period)| Ok((card_number, period.parse::<MonthPeriod>()?)))
        .collect()
}

/// Issues the clock's current period to every card, copying each card's
/// totals from the latest period it holds since the last completed run.
///
/// Without a recorded run only the previous period is considered. After a
/// skipped month the last recorded period is still found, so no card is left
/// without benefits.
///
/// # Returns
/// * `Ok(Some(summary))` - The rollover ran
/// * `Ok(None)` - Already done for this period
pub async fn process_period_rollover(
    db: &DatabaseConnection,
    clock: &impl Clock,
) -> Result<Option<RolloverSummary>> {
    if !is_rollover_needed(db, clock).await? {
        return Ok(None);
    }

    let to = clock.current_period();
    let from = get_last_rollover_period(db)
        .await?
        .unwrap_or_else(|| to.previous());

    let mut cards = Vec::new();
    for (card_number, source) in latest_card_periods(db, from, to).await? {
        let balances = ledger::rollover_period(db, clock, &card_number, source, to).await?;
        cards.push(CardRollover {
            card_number,
            from: source,
            categories: balances.len(),
        });
    }

    set_last_rollover_period(db, clock, to).await?;
    info!(%from, %to, cards = cards.len(), "monthly rollover complete");

    Ok(Some(RolloverSummary { from, to, cards }))
}

/// Formats a rollover summary for logs.
#[must_use]
pub fn format_rollover_summary(summary: &RolloverSummary) -> String {
    let mut out = format!(
        "Monthly Rollover - {} -> {} - {} cards\n",
        summary.from,
        summary.to,
        summary.cards.len()
    );

    for card in &summary.cards {
        let _ = writeln!(
            out,
            "  {} - {} categories issued from {}",
            card.card_number, card.categories, card.from
        );
    }

    out
}
