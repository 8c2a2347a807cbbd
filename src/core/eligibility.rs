//! Eligibility evaluation for scanned products.
//!
//! Evaluation order:
//! 1. pick the most specific approved-food entry for the product
//!    (brand and product > product > brand within category > category),
//! 2. apply the size rules registered for the entry's category and food type,
//! 3. convert the package size into the category unit,
//! 4. compare it with the remaining balance.
//!
//! Measured sizes are rounded to ledger precision before any comparison with a
//! balance or a monthly cap, so those comparisons are exact.
//!
//! Exceeding the balance is advisory. The ledger enforces the real limit when
//! the purchase is applied.

use crate::{
    core::{
        amount, catalog,
        ledger,
        lookup::{self, ProductLookup, ScannedProduct},
        period::Clock,
        transaction,
        units::{PackageSize, Quantity, parse_size},
    },
    entities::{BenefitCategory, Unit, approved_food, benefit},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Relative tolerance for exact package sizes
pub const SIZE_TOLERANCE: f64 = 0.01;

/// A package-size constraint for one food type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeRule {
    /// The package must be exactly this size
    Exact {
        /// Food type the rule applies to
        food_type: String,
        /// Required size
        size: Quantity,
    },
    /// Purchases of the food type may not exceed this amount per month
    MonthlyCap {
        /// Food type the rule applies to
        food_type: String,
        /// Monthly limit
        limit: Quantity,
    },
}

impl SizeRule {
    /// Food type the rule applies to
    #[must_use]
    pub fn food_type(&self) -> &str {
        match self {
            Self::Exact { food_type, .. } | Self::MonthlyCap { food_type, .. } => food_type,
        }
    }

    /// Checks a package against the rule. `purchased` is what was already
    /// bought of the food type this period.
    fn check(&self, size: Quantity, purchased: Decimal, purchased_unit: Unit) -> Option<Rejection> {
        match self {
            Self::Exact { size: required, .. } => {
                (!required.approx_eq(size, SIZE_TOLERANCE)).then(|| Rejection::WrongSize {
                    rule: self.clone(),
                    suggested: *required,
                })
            }
            Self::MonthlyCap { limit, .. } => {
                let cap = amount::from_measure(limit.amount).unwrap_or_default();
                let already =
                    convert_exact(purchased, purchased_unit, limit.unit).unwrap_or_default();
                let room = (cap - already).max(Decimal::ZERO);
                let fits = measure_in(size, limit.unit).is_some_and(|package| package <= room);
                (!fits).then(|| Rejection::WrongSize {
                    rule: self.clone(),
                    suggested: Quantity::new(amount::to_measure(room), limit.unit),
                })
            }
        }
    }
}

/// A measured quantity in `unit`, rounded to ledger precision.
fn measure_in(quantity: Quantity, unit: Unit) -> Option<Decimal> {
    quantity
        .convert_to(unit)
        .and_then(|converted| amount::from_measure(converted.amount))
}

/// Converts an exact amount between units. Same-unit amounts pass through
/// untouched.
fn convert_exact(value: Decimal, from: Unit, to: Unit) -> Option<Decimal> {
    if from == to {
        return Some(value);
    }
    measure_in(Quantity::new(amount::to_measure(value), from), to)
}

/// Size rules keyed by category.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: HashMap<BenefitCategory, Vec<SizeRule>>,
}

impl RuleSet {
    /// A rule set with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Registers a rule for a category.
    pub fn add(&mut self, category: BenefitCategory, rule: SizeRule) {
        self.rules.entry(category).or_default().push(rule);
    }

    /// Builder form of [`RuleSet::add`].
    #[must_use]
    pub fn with_rule(mut self, category: BenefitCategory, rule: SizeRule) -> Self {
        self.add(category, rule);
        self
    }

    /// Rules for a category that target `food_type`.
    pub fn rules_for<'a>(
        &'a self,
        category: BenefitCategory,
        food_type: &'a str,
    ) -> impl Iterator<Item = &'a SizeRule> + 'a {
        self.rules
            .get(&category)
            .into_iter()
            .flatten()
            .filter(move |rule| rule.food_type().eq_ignore_ascii_case(food_type))
    }

    /// Number of registered rules across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// True if no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if a monthly cap applies to the food type.
    #[must_use]
    pub fn has_cap(&self, category: BenefitCategory, food_type: &str) -> bool {
        self.rules_for(category, food_type)
            .any(|rule| matches!(rule, SizeRule::MonthlyCap { .. }))
    }
}

impl Default for RuleSet {
    /// Half-gallon milk, 16 oz bread and at most 72 oz of cereal a month.
    fn default() -> Self {
        Self::empty()
            .with_rule(
                BenefitCategory::Dairy,
                SizeRule::Exact {
                    food_type: "milk".to_string(),
                    size: Quantity::new(0.5, Unit::Gallons),
                },
            )
            .with_rule(
                BenefitCategory::Grains,
                SizeRule::Exact {
                    food_type: "bread".to_string(),
                    size: Quantity::new(16.0, Unit::Oz),
                },
            )
            .with_rule(
                BenefitCategory::Grains,
                SizeRule::MonthlyCap {
                    food_type: "cereal".to_string(),
                    limit: Quantity::new(72.0, Unit::Oz),
                },
            )
    }
}

/// What is left to spend in a category, plus purchases that count toward caps.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableBenefit {
    /// Remaining balance
    pub amount: Decimal,
    /// Unit of `amount`, the category unit
    pub unit: Unit,
    purchased: HashMap<String, Decimal>,
}

impl AvailableBenefit {
    /// A balance with no recorded purchases.
    #[must_use]
    pub fn new(amount: Decimal, unit: Unit) -> Self {
        Self {
            amount,
            unit,
            purchased: HashMap::new(),
        }
    }

    /// A zero balance, used when the period has no usable benefit.
    #[must_use]
    pub fn none(category: BenefitCategory) -> Self {
        Self::new(Decimal::ZERO, category.canonical_unit())
    }

    /// Records the amount of `food_type` already purchased this period, in
    /// [`AvailableBenefit::unit`].
    #[must_use]
    pub fn with_purchased(mut self, food_type: &str, amount: Decimal) -> Self {
        self.purchased.insert(food_type.to_lowercase(), amount);
        self
    }

    /// Amount of `food_type` purchased this period.
    #[must_use]
    pub fn purchased(&self, food_type: &str) -> Decimal {
        self.purchased
            .get(&food_type.to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    /// The balance as a measured quantity.
    #[must_use]
    pub fn remaining(&self) -> Quantity {
        Quantity::new(amount::to_measure(self.amount), self.unit)
    }
}

impl From<&benefit::Model> for AvailableBenefit {
    fn from(benefit: &benefit::Model) -> Self {
        Self::new(benefit.remaining(), benefit.unit)
    }
}

/// Details of an approved scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    /// The approved-food entry that matched
    pub food: approved_food::Model,
    /// Parsed package size
    pub package: PackageSize,
    /// Package size in the category unit; None when the size is unknown or
    /// the category is tracked in dollars
    pub quantity: Option<Quantity>,
    /// Remaining balance at evaluation time
    pub remaining: Quantity,
}

/// Why a scan was not approved.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The product is not in the approved-food catalog for the category
    NotFound,
    /// The catalog explicitly excludes the product
    Excluded,
    /// The package violates a size rule
    WrongSize {
        /// Rule that failed
        rule: SizeRule,
        /// Size that would pass
        suggested: Quantity,
    },
}

/// Result of evaluating a scanned product.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Approved and within the remaining balance (or size unknown)
    Approved(Approval),
    /// Approved, but larger than the remaining balance
    ApprovedButExceedsLimit(Approval),
    /// Not approved
    NotApproved(Rejection),
}

impl Evaluation {
    /// True for both approved variants.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_) | Self::ApprovedButExceedsLimit(_))
    }
}

/// Picks the most specific entry in `category` for a product of `brand`.
/// Entries restricted to another brand never match; ties go to the oldest entry.
pub fn best_match<'a>(
    brand: Option<&str>,
    category: BenefitCategory,
    candidates: &'a [approved_food::Model],
) -> Option<&'a approved_food::Model> {
    candidates
        .iter()
        .filter(|food| food.category == category)
        .filter_map(|food| specificity(food, brand).map(|score| (score, food)))
        .max_by_key(|(score, food)| (*score, Reverse(food.id)))
        .map(|(_, food)| food)
}

fn specificity(food: &approved_food::Model, brand: Option<&str>) -> Option<u8> {
    let brand_score = match food.brand.as_deref() {
        None => 0,
        Some(required) => {
            if brand.is_some_and(|brand| brand.trim().eq_ignore_ascii_case(required.trim())) {
                1
            } else {
                return None;
            }
        }
    };
    let product_score = if food.product_id.is_some() { 2 } else { 0 };
    Some(product_score + brand_score)
}

/// Applies a [`RuleSet`] to scanned products.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    rules: RuleSet,
}

impl Evaluator {
    /// Creates an evaluator with the given rules.
    #[must_use]
    pub const fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rules in use
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluates a product against catalog candidates and a balance.
    #[must_use]
    pub fn evaluate(
        &self,
        product: &ScannedProduct,
        category: BenefitCategory,
        candidates: &[approved_food::Model],
        available: &AvailableBenefit,
    ) -> Evaluation {
        let Some(food) = best_match(product.brand.as_deref(), category, candidates) else {
            return Evaluation::NotApproved(Rejection::NotFound);
        };
        if !food.is_approved {
            return Evaluation::NotApproved(Rejection::Excluded);
        }

        let package = parse_size(&product.size_text);
        let Some(size) = package.as_quantity() else {
            debug!(code = %product.code, size_text = %product.size_text, "size unknown, skipping size checks");
            return Evaluation::Approved(Approval {
                food: food.clone(),
                package,
                quantity: None,
                remaining: available.remaining(),
            });
        };

        let purchased = available.purchased(&food.food_type);
        if let Some(rejection) = self
            .rules
            .rules_for(category, &food.food_type)
            .find_map(|rule| rule.check(size, purchased, available.unit))
        {
            return Evaluation::NotApproved(rejection);
        }

        let quantity = size.convert_to(category.canonical_unit());
        let exceeds = quantity.is_some_and(|quantity| {
            let needed = amount::from_measure(quantity.amount);
            let remaining = convert_exact(available.amount, available.unit, quantity.unit);
            needed
                .zip(remaining)
                .is_none_or(|(needed, remaining)| needed > remaining)
        });

        let approval = Approval {
            food: food.clone(),
            package,
            quantity,
            remaining: available.remaining(),
        };
        if exceeds {
            Evaluation::ApprovedButExceedsLimit(approval)
        } else {
            Evaluation::Approved(approval)
        }
    }

    /// Looks up a scanned code and evaluates it for a card in the clock's
    /// current period. Lookup failures and unknown codes yield
    /// `NotApproved(NotFound)`; only database errors are returned as `Err`.
    pub async fn evaluate_scan<L>(
        &self,
        db: &DatabaseConnection,
        lookup: &L,
        clock: &impl Clock,
        card_number: &str,
        code: &str,
        category: BenefitCategory,
    ) -> Result<Evaluation>
    where
        L: ProductLookup,
    {
        let Some(mut product) = lookup::lookup_or_none(lookup, code).await else {
            return Ok(Evaluation::NotApproved(Rejection::NotFound));
        };
        let Some(candidates) = catalog::find_candidates(db, code, category).await? else {
            return Ok(Evaluation::NotApproved(Rejection::NotFound));
        };
        if product.brand.is_none() {
            product.brand.clone_from(&candidates.product.brand);
        }

        let period = clock.current_period();
        let mut available = match ledger::get_benefit(db, card_number, category, period).await? {
            Some(benefit) if clock.today() <= benefit.expires_at => AvailableBenefit::from(&benefit),
            _ => AvailableBenefit::none(category),
        };

        let capped: BTreeSet<&str> = candidates
            .foods
            .iter()
            .map(|food| food.food_type.as_str())
            .filter(|food_type| self.rules.has_cap(category, food_type))
            .collect();
        for food_type in capped {
            let purchased =
                transaction::purchased_quantity(db, card_number, period, food_type).await?;
            available = available.with_purchased(food_type, purchased);
        }

        Ok(self.evaluate(&product, category, &candidates.foods, &available))
    }
}
