use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CantonCode, CivilStatus, Denomination};
use crate::error::CalculationError;

const MIN_TAX_YEAR: i32 = 2000;
const MAX_TAX_YEAR: i32 = 2100;

/// Largest gross or claimed amount accepted, in CHF. Keeps every
/// intermediate product well inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Taxpayer profile handed over by the questionnaire for one calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Two-letter canton code as entered.
    pub canton: String,
    pub municipality: String,
    pub tax_year: i32,
    pub civil_status: CivilStatus,
    pub children: u32,
    pub gross_income: Decimal,
    pub gross_wealth: Decimal,
    /// Itemized amounts keyed by deduction code.
    pub deduction_claims: BTreeMap<String, Decimal>,
    pub denomination: Option<Denomination>,
}

impl CalculationRequest {
    /// Type and range checks. Returns the parsed canton.
    pub fn validate(&self) -> Result<CantonCode, CalculationError> {
        let canton = CantonCode::parse(&self.canton).ok_or_else(|| {
            CalculationError::Validation(format!("unknown canton code '{}'", self.canton))
        })?;

        if self.municipality.trim().is_empty() {
            return Err(CalculationError::Validation(
                "municipality must not be empty".to_string(),
            ));
        }
        if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&self.tax_year) {
            return Err(CalculationError::Validation(format!(
                "tax year {} outside {MIN_TAX_YEAR}..={MAX_TAX_YEAR}",
                self.tax_year
            )));
        }
        check_amount("gross income", self.gross_income)?;
        check_amount("gross wealth", self.gross_wealth)?;
        for (code, amount) in &self.deduction_claims {
            check_amount(&format!("claimed amount for deduction '{code}'"), *amount)?;
        }
        if self.civil_status == CivilStatus::SingleParent && self.children == 0 {
            return Err(CalculationError::Validation(
                "single parent status requires at least one child".to_string(),
            ));
        }

        Ok(canton)
    }
}

/// Negative amounts are rejected, and so is anything above [`MAX_AMOUNT`].
fn check_amount(
    what: &str,
    amount: Decimal,
) -> Result<(), CalculationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CalculationError::Validation(format!(
            "{what} must not be negative, got {amount}"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(CalculationError::Validation(format!(
            "{what} exceeds {MAX_AMOUNT} CHF, got {amount}"
        )));
    }
    Ok(())
}

/// Liability breakdown for one request. Amounts are rounded per the
/// canton's rounding method; `total_tax` is the sum of the rounded parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub taxable_income: Decimal,
    pub federal_taxable_income: Decimal,
    pub taxable_wealth: Decimal,
    pub federal_tax: Decimal,
    pub cantonal_simple_tax: Decimal,
    pub cantonal_simple_wealth_tax: Decimal,
    pub cantonal_tax: Decimal,
    pub municipal_tax: Decimal,
    pub church_tax: Decimal,
    pub total_tax: Decimal,
    /// `total_tax / gross_income`, four decimal places.
    pub effective_rate: Decimal,
}
