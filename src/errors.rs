//! Unified error type for the ledger, catalog and evaluator.
//!
//! Every variant is recoverable: callers translate them into user-facing
//! messages. Evaluator rejections are not errors, see
//! [`crate::core::eligibility::Rejection`].

use crate::entities::{BenefitCategory, Unit};
use rust_decimal::Decimal;
use thiserror::Error;

/// All errors surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A product code is not known to the catalog
    #[error("Product not found: {code}")]
    NotFound {
        /// UPC or PLU that was looked up
        code: String,
    },

    /// The caller supplied a unit that is not the category's canonical unit
    #[error("Unit mismatch for {category}: expected {expected}, got {actual}")]
    UnitMismatch {
        /// Category being debited
        category: BenefitCategory,
        /// Canonical unit of the category
        expected: Unit,
        /// Unit supplied by the caller
        actual: Unit,
    },

    /// The purchase would overdraw the remaining balance
    #[error("Insufficient benefit: {remaining} remaining, {requested} requested")]
    InsufficientBenefit {
        /// Balance at the time of the check
        remaining: Decimal,
        /// Quantity the purchase asked for
        requested: Decimal,
    },

    /// No benefit row exists for the card, category and period
    #[error("No {category} benefit for card {card_number} in {period}")]
    BenefitNotFound {
        /// Beneficiary card number
        card_number: String,
        /// Requested category
        category: BenefitCategory,
        /// Requested month period
        period: String,
    },

    /// The benefit period is over
    #[error("Benefit for {period} expired on {expires_at}")]
    BenefitExpired {
        /// Month period of the benefit
        period: String,
        /// Last valid day
        expires_at: chrono::NaiveDate,
    },

    /// A package size could not be parsed
    #[error("Unknown package size: '{text}'")]
    SizeUnknown {
        /// Original size text
        text: String,
    },

    /// Quantities must be positive with at most three decimal places
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Rejected value
        amount: Decimal,
    },

    /// A month period string is not `YYYY-MM`
    #[error("Invalid month period: '{value}'")]
    InvalidPeriod {
        /// Rejected value
        value: String,
    },

    /// The product lookup collaborator failed
    #[error("Product lookup unavailable: {message}")]
    LookupUnavailable {
        /// Transport or service error description
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
