use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Jurisdiction;

/// How the simple tax is read off a bracket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateStructureKind {
    /// Each bracket's rate applies only to the slice of income inside it.
    Progressive,
    /// One rate on the whole base; the table has a single unbounded bracket.
    Proportional,
    /// The whole base is taxed at the rate of the bracket it falls into.
    FlatPerBracket,
}

impl RateStructureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progressive => "progressive",
            Self::Proportional => "proportional",
            Self::FlatPerBracket => "flat_per_bracket",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "progressive" => Some(Self::Progressive),
            "proportional" => Some(Self::Proportional),
            "flat_per_bracket" => Some(Self::FlatPerBracket),
            _ => None,
        }
    }
}

/// Unit in which canton, municipal and church multipliers are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiplierConvention {
    /// Plain factor, `0.98` means 98 % of the simple tax.
    Fraction,
    /// Steuerfuss in percent, `98` means 98 % of the simple tax.
    Percentage,
    /// Steuereinheiten, `1.6` means 1.6 times the simple tax.
    Einheiten,
    /// Centimes additionnels, percent of the cantonal base tax.
    CentimesAdditionnels,
}

impl MultiplierConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fraction => "fraction",
            Self::Percentage => "percentage",
            Self::Einheiten => "einheiten",
            Self::CentimesAdditionnels => "centimes_additionnels",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fraction" => Some(Self::Fraction),
            "percentage" => Some(Self::Percentage),
            "einheiten" => Some(Self::Einheiten),
            "centimes_additionnels" => Some(Self::CentimesAdditionnels),
            _ => None,
        }
    }

    /// Converts a published multiplier into a factor on the simple tax.
    pub fn normalize(
        &self,
        value: Decimal,
    ) -> Decimal {
        match self {
            Self::Fraction | Self::Einheiten => value,
            Self::Percentage | Self::CentimesAdditionnels => value / Decimal::ONE_HUNDRED,
        }
    }
}

/// Whether municipalities may reduce the canton's own share of the tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiplierSplit {
    /// Every municipality pays the full cantonal tax.
    Uniform,
    /// A municipality may carry a canton-share factor below 100 %
    /// (Basel-Stadt: the city levies no municipal tax and pays the full
    /// canton share, the villages pay half and levy their own).
    CantonShareOverride,
}

impl MultiplierSplit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::CantonShareOverride => "canton_share_override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uniform" => Some(Self::Uniform),
            "canton_share_override" => Some(Self::CantonShareOverride),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundingMethod {
    Centime,
    FiveCentimes,
    Franc,
}

impl RoundingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Centime => "centime",
            Self::FiveCentimes => "five_centimes",
            Self::Franc => "franc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "centime" => Some(Self::Centime),
            "five_centimes" => Some(Self::FiveCentimes),
            "franc" => Some(Self::Franc),
            _ => None,
        }
    }
}

/// Published configuration of one jurisdiction for one tax year.
///
/// Rows are written by data seeding and never mutated at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CantonTaxYear {
    pub jurisdiction: Jurisdiction,
    pub tax_year: i32,
    pub rate_structure: RateStructureKind,
    pub multiplier_convention: MultiplierConvention,
    /// Cantonal Steuerfuss in `multiplier_convention` units.
    pub canton_multiplier: Decimal,
    pub has_municipal_multiplier: bool,
    pub multiplier_split: MultiplierSplit,
    pub rounding: RoundingMethod,
    /// Married taxpayers use the single tariff at `taxable / divisor`.
    pub splitting_divisor: Option<Decimal>,
    /// Ceiling on `simple tax / base`.
    pub max_average_rate: Option<Decimal>,
    /// The base is truncated down to a multiple of this step.
    pub base_truncation: Option<Decimal>,
}

impl CantonTaxYear {
    pub fn canton_factor(&self) -> Decimal {
        self.multiplier_convention.normalize(self.canton_multiplier)
    }
}
