//! Benefit report generation.
//!
//! Builds a per-card view of one period: what was issued, what is left and
//! the most recent purchases. Formatting helpers render the report as text.

use crate::{
    core::{
        amount, ledger,
        period::{Clock, MonthPeriod},
        transaction as transactions,
        units::Quantity,
    },
    entities::{BenefitCategory, Unit, benefit, transaction},
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::fmt::Write;

/// Balance of one category within a report.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBalance {
    /// Benefit category
    pub category: BenefitCategory,
    /// Canonical unit
    pub unit: Unit,
    /// Amount issued
    pub total: Decimal,
    /// Amount left
    pub remaining: Decimal,
    /// Amount used
    pub spent: Decimal,
    /// Remaining as a percentage of total
    pub progress_percent: f64,
}

impl From<&benefit::Model> for CategoryBalance {
    fn from(benefit: &benefit::Model) -> Self {
        Self {
            category: benefit.category,
            unit: benefit.unit,
            total: benefit.total(),
            remaining: benefit.remaining(),
            spent: benefit.spent(),
            progress_percent: calculate_progress(
                amount::to_measure(benefit.remaining()),
                amount::to_measure(benefit.total()),
            ),
        }
    }
}

/// A card's benefits for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct BenefitReport {
    /// Card reported on
    pub card_number: String,
    /// Period reported on
    pub period: MonthPeriod,
    /// Last usable day
    pub expires_at: NaiveDate,
    /// True once the period is over
    pub expired: bool,
    /// Balances by category; empty if the period was never issued
    pub balances: Vec<CategoryBalance>,
    /// Most recent purchases of the card in this period
    pub recent_transactions: Vec<transaction::Model>,
}

/// Generates the report for a card and period.
///
/// # Arguments
/// * `db` - Database connection
/// * `clock` - Used to decide whether the period has expired
/// * `card_number` - Card to report on
/// * `period` - Period to report on
/// * `transaction_limit` - Maximum number of recent transactions to include (default 10)
pub async fn generate_benefit_report(
    db: &DatabaseConnection,
    clock: &impl Clock,
    card_number: &str,
    period: MonthPeriod,
    transaction_limit: Option<u64>,
) -> Result<BenefitReport> {
    let benefits = ledger::get_benefits(db, card_number, period).await?;
    let balances = benefits.iter().map(CategoryBalance::from).collect();

    let limit = transaction_limit.unwrap_or(10);
    let recent_transactions =
        transactions::get_transactions_for_period(db, card_number, period, Some(limit)).await?;

    Ok(BenefitReport {
        card_number: card_number.to_string(),
        period,
        expires_at: period.expires_at()?,
        expired: period.is_expired_on(clock.today())?,
        balances,
        recent_transactions,
    })
}

/// Calculates how much of an issued amount remains, as a percentage.
///
/// - 100% = nothing used
/// - 0% = fully used
/// - zero totals report 0%
#[must_use]
pub fn calculate_progress(remaining: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }

    (remaining / total) * 100.0
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80%`
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // clamped_progress is in [0, 100] and length is small, so the cast stays in [0, length]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {progress_percent:.1}%",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

/// Renders a report as plain text.
#[must_use]
pub fn format_benefit_report(report: &BenefitReport) -> String {
    let status = if report.expired { "expired" } else { "active" };
    let mut out = format!(
        "Card {} - {} ({status}, expires {})\n",
        report.card_number, report.period, report.expires_at
    );

    if report.balances.is_empty() {
        out.push_str("  No benefits issued for this period\n");
        return out;
    }

    for balance in &report.balances {
        let _ = writeln!(
            out,
            "  {:<10} {} of {} left {}",
            balance.category.as_str(),
            Quantity::new(amount::to_measure(balance.remaining), balance.unit),
            Quantity::new(amount::to_measure(balance.total), balance.unit),
            format_progress_bar(balance.progress_percent, None)
        );
    }

    if !report.recent_transactions.is_empty() {
        let _ = writeln!(out, "  Recent purchases: {}", report.recent_transactions.len());
        for transaction in &report.recent_transactions {
            let _ = writeln!(
                out,
                "    #{} {} {}",
                transaction.id,
                transaction.timestamp.format("%Y-%m-%d %H:%M"),
                transaction.store.as_deref().unwrap_or("unknown store")
            );
        }
    }

    out
}
