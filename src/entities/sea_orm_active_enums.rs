//! Enumerations stored as string columns.
//!
//! `BenefitCategory` and `Unit` are shared by the benefit, approved food and
//! transaction item tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WIC benefit category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum BenefitCategory {
    /// Milk, cheese, yogurt
    #[sea_orm(string_value = "dairy")]
    Dairy,
    /// Bread, cereal, whole grains
    #[sea_orm(string_value = "grains")]
    Grains,
    /// Eggs, beans, peanut butter
    #[sea_orm(string_value = "protein")]
    Protein,
    /// Cash-value fruit benefit
    #[sea_orm(string_value = "fruits")]
    Fruits,
    /// Cash-value vegetable benefit
    #[sea_orm(string_value = "vegetables")]
    Vegetables,
}

impl BenefitCategory {
    /// All categories in display order
    pub const ALL: [Self; 5] = [
        Self::Dairy,
        Self::Grains,
        Self::Protein,
        Self::Fruits,
        Self::Vegetables,
    ];

    /// The unit balances in this category are tracked in.
    #[must_use]
    pub const fn canonical_unit(self) -> Unit {
        match self {
            Self::Dairy => Unit::Gallons,
            Self::Grains => Unit::Oz,
            Self::Protein => Unit::Lbs,
            Self::Fruits | Self::Vegetables => Unit::Dollars,
        }
    }

    /// Lowercase name as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dairy => "dairy",
            Self::Grains => "grains",
            Self::Protein => "protein",
            Self::Fruits => "fruits",
            Self::Vegetables => "vegetables",
        }
    }
}

impl fmt::Display for BenefitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenefitCategory {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::errors::Error::Config {
                message: format!("Unknown benefit category '{s}'"),
            })
    }
}

/// Unit a benefit quantity is measured in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// US liquid gallons
    #[sea_orm(string_value = "gallons")]
    Gallons,
    /// Ounces (fluid for liquids, weight for solids)
    #[sea_orm(string_value = "oz")]
    Oz,
    /// Pounds
    #[sea_orm(string_value = "lbs")]
    Lbs,
    /// Cash value in US dollars
    #[sea_orm(string_value = "dollars")]
    Dollars,
}

impl Unit {
    /// Short name as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gallons => "gallons",
            Self::Oz => "oz",
            Self::Lbs => "lbs",
            Self::Dollars => "dollars",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_canonical_units() {
        assert_eq!(BenefitCategory::Dairy.canonical_unit(), Unit::Gallons);
        assert_eq!(BenefitCategory::Grains.canonical_unit(), Unit::Oz);
        assert_eq!(BenefitCategory::Protein.canonical_unit(), Unit::Lbs);
        assert_eq!(BenefitCategory::Fruits.canonical_unit(), Unit::Dollars);
        assert_eq!(BenefitCategory::Vegetables.canonical_unit(), Unit::Dollars);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            "Dairy".parse::<BenefitCategory>().unwrap(),
            BenefitCategory::Dairy
        );
        assert_eq!(
            " vegetables ".parse::<BenefitCategory>().unwrap(),
            BenefitCategory::Vegetables
        );
        assert!("snacks".parse::<BenefitCategory>().is_err());
    }
}
