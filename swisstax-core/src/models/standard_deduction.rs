use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CivilStatus, Jurisdiction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxBase {
    Income,
    Wealth,
}

impl TaxBase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Wealth => "wealth",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "wealth" => Some(Self::Wealth),
            _ => None,
        }
    }
}

/// What a percentage rule takes its percentage of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeductionBase {
    /// The gross income or wealth being reduced.
    Gross,
    /// The amount the taxpayer claimed under this deduction's code.
    Claimed,
}

impl DeductionBase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gross => "gross",
            Self::Claimed => "claimed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gross" => Some(Self::Gross),
            "claimed" => Some(Self::Claimed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdGate {
    /// Granted while the gross amount is below the threshold.
    Below,
    /// Granted once the gross amount reaches the threshold.
    Above,
}

impl ThresholdGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Below => "below",
            Self::Above => "above",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "below" => Some(Self::Below),
            "above" => Some(Self::Above),
            _ => None,
        }
    }
}

/// Shrinks a threshold-gated amount as the gross amount rises past the
/// threshold: `reduction_per_step` is taken off for every full `step`
/// above it, never going under `floor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degression {
    pub step: Decimal,
    pub reduction_per_step: Decimal,
    pub floor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeductionRule {
    Fixed {
        amount: Decimal,
        /// Multiply `amount` by the number of children.
        per_child: bool,
    },
    PercentageCapped {
        base: DeductionBase,
        /// Percent of the base.
        percentage: Decimal,
        min_amount: Decimal,
        max_amount: Decimal,
    },
    ThresholdGated {
        gate: ThresholdGate,
        threshold: Decimal,
        amount: Decimal,
        degression: Option<Degression>,
    },
}

impl DeductionRule {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::PercentageCapped { .. } => "percentage_capped",
            Self::ThresholdGated { .. } => "threshold_gated",
        }
    }
}

/// Who may take a deduction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Empty means every civil status.
    pub civil_statuses: Vec<CivilStatus>,
    pub min_children: u32,
    /// Only granted when the taxpayer claimed the code.
    pub requires_claim: bool,
}

impl Eligibility {
    pub fn allows_status(
        &self,
        status: CivilStatus,
    ) -> bool {
        self.civil_statuses.is_empty() || self.civil_statuses.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardDeduction {
    pub jurisdiction: Jurisdiction,
    pub tax_year: i32,
    pub code: String,
    pub target: TaxBase,
    pub rule: DeductionRule,
    pub eligibility: Eligibility,
    /// Code of a deduction that must have been granted earlier.
    pub requires: Option<String>,
    /// Evaluation order within the jurisdiction's catalog.
    pub ordering: i32,
}
