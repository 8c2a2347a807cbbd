//! Program configuration loading from config.toml
//!
//! The file describes what a clinic issues each month and which foods it
//! accepts: per-category allocations, the cards to issue them to, the product
//! catalog, approved-food entries and package-size rules. It is used to seed the
//! database on startup.

use crate::{
    core::{
        amount,
        catalog::{NewApprovedFood, NewProduct},
        eligibility::{RuleSet, SizeRule},
        ledger::Allocation,
    },
    entities::BenefitCategory,
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Monthly amount per category
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    /// Cards to issue benefits to
    #[serde(default)]
    pub cards: Vec<String>,
    /// Catalog products
    #[serde(default)]
    pub products: Vec<NewProduct>,
    /// Approved-food entries; product entries must reference a listed product
    #[serde(default)]
    pub approved_foods: Vec<NewApprovedFood>,
    /// Package-size rules; when empty the built-in rules apply
    #[serde(default)]
    pub size_rules: Vec<SizeRuleConfig>,
}

/// A size rule together with the category it belongs to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SizeRuleConfig {
    /// Category the rule is registered under
    pub category: BenefitCategory,
    /// The rule itself
    #[serde(flatten)]
    pub rule: SizeRule,
}

impl AppConfig {
    /// Builds the evaluator rules, falling back to [`RuleSet::default`].
    #[must_use]
    pub fn rule_set(&self) -> RuleSet {
        if self.size_rules.is_empty() {
            return RuleSet::default();
        }
        self.size_rules
            .iter()
            .fold(RuleSet::empty(), |rules, entry| {
                rules.with_rule(entry.category, entry.rule.clone())
            })
    }

    /// Rejects allocations that are negative, too precise or listed twice.
    pub fn validate(&self) -> Result<()> {
        for (index, allocation) in self.allocations.iter().enumerate() {
            if allocation.amount.is_sign_negative() || amount::to_milli(allocation.amount).is_err() {
                return Err(Error::Config {
                    message: format!(
                        "Allocation for {} must be a non-negative number with at most {} decimal places",
                        allocation.category,
                        amount::AMOUNT_SCALE
                    ),
                });
            }
            if self.allocations[..index]
                .iter()
                .any(|other| other.category == allocation.category)
            {
                return Err(Error::Config {
                    message: format!("Allocation for {} is listed twice", allocation.category),
                });
            }
        }
        Ok(())
    }
}

/// Loads program configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
/// - An allocation is negative or duplicated
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!(?path, "loading configuration");

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    let config = parse_config(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `WIC_CONFIG`, or ./config.toml when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("WIC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}
