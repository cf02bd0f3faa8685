use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CantonCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Denomination {
    Protestant,
    RomanCatholic,
    ChristCatholic,
    Jewish,
}

impl Denomination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protestant => "protestant",
            Self::RomanCatholic => "roman_catholic",
            Self::ChristCatholic => "christ_catholic",
            Self::Jewish => "jewish",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "protestant" => Some(Self::Protestant),
            "roman_catholic" => Some(Self::RomanCatholic),
            "christ_catholic" => Some(Self::ChristCatholic),
            "jewish" => Some(Self::Jewish),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChurchTaxMethod {
    /// One parish rate on the simple cantonal tax.
    RateOnSimpleTax,
    /// District (Kirchgemeindeverband / canton-wide church) plus parish rate.
    DistrictAndParish,
}

impl ChurchTaxMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateOnSimpleTax => "rate_on_simple_tax",
            Self::DistrictAndParish => "district_and_parish",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rate_on_simple_tax" => Some(Self::RateOnSimpleTax),
            "district_and_parish" => Some(Self::DistrictAndParish),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurchTaxConfig {
    pub canton: CantonCode,
    pub has_church_tax: bool,
    pub recognized_denominations: Vec<Denomination>,
    pub method: ChurchTaxMethod,
}

impl ChurchTaxConfig {
    pub fn recognizes(
        &self,
        denomination: Denomination,
    ) -> bool {
        self.has_church_tax && self.recognized_denominations.contains(&denomination)
    }
}

/// Church rates in the canton's multiplier convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurchTaxRate {
    pub canton: CantonCode,
    pub municipality: String,
    pub denomination: Denomination,
    pub tax_year: i32,
    /// Parish rate, or the single rate for `RateOnSimpleTax`.
    pub rate: Decimal,
    /// District component, required by `DistrictAndParish`.
    pub district_rate: Option<Decimal>,
}
