//! Registration price table
//!
//! Prices are fixed per subscriber category and are not configurable at runtime.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BillingError;

/// Subscriber category, as recorded on the account profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Student")]
    Student,
    #[serde(rename = "APyB Associated")]
    ApybAssociated,
    #[serde(rename = "Speaker")]
    Speaker,
    #[serde(rename = "Individual")]
    Individual,
    #[serde(rename = "Corporate")]
    Corporate,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Student,
        Category::ApybAssociated,
        Category::Speaker,
        Category::Individual,
        Category::Corporate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Student => "Student",
            Category::ApybAssociated => "APyB Associated",
            Category::Speaker => "Speaker",
            Category::Individual => "Individual",
            Category::Corporate => "Corporate",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| BillingError::UnknownCategory(s.to_string()))
    }
}

/// Registration price in BRL for each category
pub const PRICES: [(Category, u32); 5] = [
    (Category::Student, 150),
    (Category::ApybAssociated, 150),
    (Category::Speaker, 150),
    (Category::Individual, 250),
    (Category::Corporate, 350),
];

/// Look up the registration price for a category
pub fn price_for(category: Category) -> Decimal {
    PRICES
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, amount)| Decimal::from(*amount))
        // Every variant has a row in PRICES
        .unwrap_or(Decimal::ZERO)
}
