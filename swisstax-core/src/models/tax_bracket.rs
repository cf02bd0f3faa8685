use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Jurisdiction, TariffGroup};

/// One row of a bracket table, independent of what it taxes.
///
/// Bounds are `[lower_bound, upper_bound)`; `None` marks the unbounded top
/// bracket.
pub trait RateBand {
    fn lower_bound(&self) -> Decimal;
    fn upper_bound(&self) -> Option<Decimal>;
    /// Rate as a plain factor on the base (`0.21` for 21 %).
    fn rate_factor(&self) -> Decimal;

    fn contains(
        &self,
        amount: Decimal,
    ) -> bool {
        amount >= self.lower_bound() && self.upper_bound().is_none_or(|upper| amount < upper)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxBracket {
    pub jurisdiction: Jurisdiction,
    pub tax_year: i32,
    pub tariff: TariffGroup,
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    /// Marginal (or flat) rate in percent.
    pub rate: Decimal,
    pub ordering: i32,
}

impl RateBand for IncomeTaxBracket {
    fn lower_bound(&self) -> Decimal {
        self.lower_bound
    }

    fn upper_bound(&self) -> Option<Decimal> {
        self.upper_bound
    }

    fn rate_factor(&self) -> Decimal {
        self.rate / Decimal::ONE_HUNDRED
    }
}
