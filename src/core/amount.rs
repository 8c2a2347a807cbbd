//! Exact benefit amounts.
//!
//! Ledger amounts are `Decimal` in Rust and integer thousandths of their unit
//! ("milli-units") in the database, so the balance check and debit run as exact
//! integer arithmetic inside `SQLite`. Measured package sizes stay `f64` and are
//! rounded to milli-units before they are compared with a balance.

use crate::errors::{Error, Result};
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};

/// Decimal places kept by the ledger
pub const AMOUNT_SCALE: u32 = 3;

/// Converts an amount to stored milli-units.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] for amounts with more than
/// [`AMOUNT_SCALE`] decimal places or outside the `i64` range.
pub fn to_milli(amount: Decimal) -> Result<i64> {
    let invalid = || Error::InvalidAmount { amount };
    let scaled = amount
        .checked_mul(Decimal::ONE_THOUSAND)
        .ok_or_else(invalid)?;
    if !scaled.fract().is_zero() {
        return Err(invalid());
    }
    scaled.to_i64().ok_or_else(invalid)
}

/// Converts stored milli-units back to an amount.
#[must_use]
pub fn from_milli(milli: i64) -> Decimal {
    Decimal::new(milli, AMOUNT_SCALE).normalize()
}

/// Rounds a measured value to the ledger's precision. `None` for NaN or infinity.
#[must_use]
pub fn from_measure(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|amount| amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// Converts an amount for display and unit conversion.
#[must_use]
pub fn to_measure(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}
