use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CantonCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub canton: CantonCode,
    pub tax_year: i32,
    pub name: String,
    /// Federal statistical office number, when known.
    pub bfs_number: Option<i32>,
    /// Municipal Steuerfuss in the canton's multiplier convention.
    pub tax_multiplier: Decimal,
    /// Fraction of the cantonal tax this municipality pays; `None` is 100 %.
    pub canton_share: Option<Decimal>,
}

impl Municipality {
    pub fn canton_share_or_full(&self) -> Decimal {
        self.canton_share.unwrap_or(Decimal::ONE)
    }
}
