use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CantonCode, RateBand, TariffGroup};

const PER_MILLE: Decimal = Decimal::ONE_THOUSAND;

/// Tax-free wealth allowance for one tariff group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthTaxThreshold {
    pub canton: CantonCode,
    pub tax_year: i32,
    pub tariff: TariffGroup,
    pub tax_free_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthTaxBracket {
    pub canton: CantonCode,
    pub tax_year: i32,
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    /// Marginal rate in per mille.
    pub rate_per_mille: Decimal,
    pub ordering: i32,
}

impl RateBand for WealthTaxBracket {
    fn lower_bound(&self) -> Decimal {
        self.lower_bound
    }

    fn upper_bound(&self) -> Option<Decimal> {
        self.upper_bound
    }

    fn rate_factor(&self) -> Decimal {
        self.rate_per_mille / PER_MILLE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthTaxProportional {
    pub canton: CantonCode,
    pub tax_year: i32,
    pub rate_per_mille: Decimal,
}

impl WealthTaxProportional {
    pub fn rate_factor(&self) -> Decimal {
        self.rate_per_mille / PER_MILLE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WealthRates {
    Brackets(Vec<WealthTaxBracket>),
    Proportional(WealthTaxProportional),
}

/// Everything needed to compute one canton's simple wealth tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthSchedule {
    pub canton: CantonCode,
    pub tax_year: i32,
    pub thresholds: Vec<WealthTaxThreshold>,
    pub rates: WealthRates,
}

impl WealthSchedule {
    /// Allowance for `tariff`, zero when the canton publishes none.
    pub fn tax_free_amount(
        &self,
        tariff: TariffGroup,
    ) -> Decimal {
        self.thresholds
            .iter()
            .find(|t| t.tariff == tariff)
            .map(|t| t.tax_free_amount)
            .unwrap_or(Decimal::ZERO)
    }
}
