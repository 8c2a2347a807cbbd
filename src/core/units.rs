//! Package size parsing and unit conversion.
//!
//! Sizes arrive as free text from product lookups ("1 gallon", "500 ml",
//! "16 oz"). [`parse_size`] normalizes them into one of the ledger units.
//! Metric volumes become ounces: 1 mL = 0.033814 oz, 1 L = 33.814 oz.

use crate::entities::Unit;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fluid ounces per mL
pub const OZ_PER_ML: f64 = 0.033_814;
/// Fluid ounces per litre
pub const OZ_PER_LITRE: f64 = 33.814;
/// Fluid ounces per US gallon
pub const OZ_PER_GALLON: f64 = 128.0;
/// Ounces per pound
pub const OZ_PER_LB: f64 = 16.0;

/// An amount in a specific unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Numeric amount
    pub amount: f64,
    /// Unit of `amount`
    pub unit: Unit,
}

impl Quantity {
    /// Builds a quantity.
    #[must_use]
    pub const fn new(amount: f64, unit: Unit) -> Self {
        Self { amount, unit }
    }

    /// Converts into `target`, or `None` when the units are not comparable
    /// (dollars only convert to dollars).
    #[must_use]
    pub fn convert_to(self, target: Unit) -> Option<Self> {
        if self.unit == target {
            return Some(self);
        }
        let ounces = match self.unit {
            Unit::Gallons => self.amount * OZ_PER_GALLON,
            Unit::Oz => self.amount,
            Unit::Lbs => self.amount * OZ_PER_LB,
            Unit::Dollars => return None,
        };
        let amount = match target {
            Unit::Gallons => ounces / OZ_PER_GALLON,
            Unit::Oz => ounces,
            Unit::Lbs => ounces / OZ_PER_LB,
            Unit::Dollars => return None,
        };
        Some(Self::new(amount, target))
    }

    /// True if both quantities agree within `tolerance` relative to `self`.
    #[must_use]
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        other
            .convert_to(self.unit)
            .is_some_and(|other| (other.amount - self.amount).abs() <= self.amount.abs() * tolerance)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Unit::Dollars => write!(f, "${:.2}", self.amount),
            unit => write!(f, "{} {unit}", trim_float(self.amount)),
        }
    }
}

fn trim_float(value: f64) -> String {
    let formatted = format!("{value:.3}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// A parsed package size. `unit == None` means the text could not be
/// understood; `quantity` is then zero and `text` keeps the original for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSize {
    /// Normalized amount
    pub quantity: f64,
    /// Normalized unit, None when unknown
    pub unit: Option<Unit>,
    /// Size text as received
    pub text: String,
}

impl PackageSize {
    /// True if the size was understood.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.unit.is_some()
    }

    /// The normalized quantity, if known.
    #[must_use]
    pub fn as_quantity(&self) -> Option<Quantity> {
        self.unit.map(|unit| Quantity::new(self.quantity, unit))
    }

    /// The normalized quantity, or [`Error::SizeUnknown`].
    pub fn require_known(&self) -> Result<Quantity> {
        self.as_quantity().ok_or_else(|| Error::SizeUnknown {
            text: self.text.clone(),
        })
    }

    fn unknown(text: &str) -> Self {
        Self {
            quantity: 0.0,
            unit: None,
            text: text.to_string(),
        }
    }
}

/// Parses free-text package sizes such as `"1 gallon"`, `"1/2 gal"`,
/// `"half gallon"`, `"64 fl oz"`, `"500 ml"`, `"2 L"` or `"1.5 lbs"`.
#[must_use]
pub fn parse_size(text: &str) -> PackageSize {
    let lowered = text.trim().to_lowercase();

    let (amount, rest) = if let Some(rest) = lowered.strip_prefix("half") {
        (Some(0.5), rest)
    } else {
        let split = lowered
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '/'))
            .unwrap_or(lowered.len());
        let (number, rest) = lowered.split_at(split);
        (parse_number(number), rest)
    };

    let Some(amount) = amount.filter(|amount| amount.is_finite() && *amount > 0.0) else {
        return PackageSize::unknown(text);
    };

    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-');
    let rest = rest
        .strip_prefix("fluid")
        .or_else(|| rest.strip_prefix("fl"))
        .map_or(rest, |r| r.trim_start_matches(|c: char| c == '.' || c.is_whitespace()));
    let word: String = rest.chars().take_while(char::is_ascii_alphabetic).collect();

    let normalized = match word.as_str() {
        "gal" | "gals" | "gallon" | "gallons" => Some((amount, Unit::Gallons)),
        "qt" | "qts" | "quart" | "quarts" => Some((amount / 4.0, Unit::Gallons)),
        "oz" | "ounce" | "ounces" => Some((amount, Unit::Oz)),
        "lb" | "lbs" | "pound" | "pounds" => Some((amount, Unit::Lbs)),
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
            Some((amount * OZ_PER_ML, Unit::Oz))
        }
        "l" | "liter" | "liters" | "litre" | "litres" => Some((amount * OZ_PER_LITRE, Unit::Oz)),
        _ => None,
    };

    match normalized {
        Some((quantity, unit)) => PackageSize {
            quantity,
            unit: Some(unit),
            text: text.to_string(),
        },
        None => {
            tracing::debug!(size_text = text, "unrecognized package size");
            PackageSize::unknown(text)
        }
    }
}

fn parse_number(token: &str) -> Option<f64> {
    match token.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator = numerator.parse::<f64>().ok()?;
            let denominator = denominator.parse::<f64>().ok()?;
            (denominator != 0.0).then(|| numerator / denominator)
        }
        None => token.parse::<f64>().ok(),
    }
}
