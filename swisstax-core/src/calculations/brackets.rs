//! Simple ("einfache") tax from a bracket table.
//!
//! | Mode | Tax on `x` |
//! |------|------------|
//! | [`BracketMode::ProgressiveMarginal`] | Σ rate × width of each bracket slice below `x` |
//! | [`BracketMode::FlatPerBracket`] | `x` × rate of the bracket containing `x` |
//! | [`BracketMode::Proportional`] | `x` × the table's single rate |
//!
//! Brackets are `[lower, upper)`: an amount equal to a boundary belongs to the
//! bracket that starts there. Amounts at or below zero are never taxed.
//!
//! Results are unrounded; the aggregation step rounds once.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use swisstax_core::calculations::{BracketMode, compute_simple_tax};
//! use swisstax_core::{IncomeTaxBracket, Jurisdiction, TariffGroup};
//!
//! let bracket = |lower, upper, rate| IncomeTaxBracket {
//!     jurisdiction: Jurisdiction::Federal,
//!     tax_year: 2024,
//!     tariff: TariffGroup::Single,
//!     lower_bound: lower,
//!     upper_bound: upper,
//!     rate,
//!     ordering: 0,
//! };
//! let brackets = vec![
//!     bracket(dec!(0), Some(dec!(100)), dec!(0)),
//!     bracket(dec!(100), Some(dec!(200)), dec!(10)),
//!     bracket(dec!(200), None, dec!(20)),
//! ];
//!
//! let tax = compute_simple_tax(dec!(250), &brackets, BracketMode::ProgressiveMarginal).unwrap();
//! assert_eq!(tax, dec!(20.00));
//! ```

use rust_decimal::Decimal;
use tracing::trace;

use crate::calculations::common::{non_negative, truncate_to_step};
use crate::error::CalculationError;
use crate::models::{CantonTaxYear, RateBand, RateStructureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketMode {
    ProgressiveMarginal,
    FlatPerBracket,
    Proportional,
}

impl From<RateStructureKind> for BracketMode {
    fn from(kind: RateStructureKind) -> Self {
        match kind {
            RateStructureKind::Progressive => Self::ProgressiveMarginal,
            RateStructureKind::FlatPerBracket => Self::FlatPerBracket,
            RateStructureKind::Proportional => Self::Proportional,
        }
    }
}

/// Computes the simple tax on `amount` from an ordered bracket table.
///
/// # Errors
///
/// [`CalculationError::Configuration`] when the table is empty, has a gap
/// covering `amount`, or (proportional mode) has more than one bracket.
pub fn compute_simple_tax<B: RateBand>(
    amount: Decimal,
    brackets: &[B],
    mode: BracketMode,
) -> Result<Decimal, CalculationError> {
    BracketTaxCalculator::new(brackets, mode).compute(amount)
}

/// Bracket table bound to a computation mode.
#[derive(Debug, Clone)]
pub struct BracketTaxCalculator<'a, B> {
    brackets: &'a [B],
    mode: BracketMode,
}

impl<'a, B: RateBand> BracketTaxCalculator<'a, B> {
    /// `brackets` must be sorted ascending by lower bound.
    pub fn new(
        brackets: &'a [B],
        mode: BracketMode,
    ) -> Self {
        Self { brackets, mode }
    }

    pub fn compute(
        &self,
        amount: Decimal,
    ) -> Result<Decimal, CalculationError> {
        if self.brackets.is_empty() {
            return Err(CalculationError::Configuration(
                "no brackets in tax table".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let tax = match self.mode {
            BracketMode::ProgressiveMarginal => self.progressive(amount),
            BracketMode::FlatPerBracket => self.flat_per_bracket(amount)?,
            BracketMode::Proportional => self.proportional(amount)?,
        };
        trace!(%amount, %tax, mode = ?self.mode, "simple tax");

        Ok(non_negative(tax))
    }

    /// Slice-by-slice accumulation.
    fn progressive(
        &self,
        amount: Decimal,
    ) -> Decimal {
        let mut tax = Decimal::ZERO;
        for bracket in self.brackets {
            let lower = bracket.lower_bound();
            if amount <= lower {
                break;
            }
            let top = bracket.upper_bound().map_or(amount, |upper| upper.min(amount));
            tax += (top - lower) * bracket.rate_factor();
        }
        tax
    }

    /// Whole amount at the rate of its bracket. Deliberately not expressed
    /// through `progressive`: the rate of lower brackets never enters.
    fn flat_per_bracket(
        &self,
        amount: Decimal,
    ) -> Result<Decimal, CalculationError> {
        let bracket = self.containing(amount)?;
        Ok(amount * bracket.rate_factor())
    }

    fn proportional(
        &self,
        amount: Decimal,
    ) -> Result<Decimal, CalculationError> {
        match self.brackets {
            [single] => Ok(amount * single.rate_factor()),
            _ => Err(CalculationError::Configuration(format!(
                "proportional schedule must have exactly one bracket, found {}",
                self.brackets.len()
            ))),
        }
    }

    fn containing(
        &self,
        amount: Decimal,
    ) -> Result<&'a B, CalculationError> {
        self.brackets
            .iter()
            .find(|b| b.contains(amount))
            .ok_or_else(|| {
                CalculationError::Configuration(format!("no bracket contains amount {amount}"))
            })
    }

    /// Progressive tax through precomputed cumulative base amounts:
    /// `base_tax(bracket) + (amount - lower) × rate`.
    ///
    /// Independent of [`Self::compute`]; both must agree.
    pub fn progressive_closed_form(
        &self,
        amount: Decimal,
    ) -> Result<Decimal, CalculationError> {
        if amount <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let bases = cumulative_base_taxes(self.brackets);
        let index = self
            .brackets
            .iter()
            .position(|b| b.contains(amount))
            .ok_or_else(|| {
                CalculationError::Configuration(format!("no bracket contains amount {amount}"))
            })?;
        let bracket = &self.brackets[index];

        Ok(bases[index] + (amount - bracket.lower_bound()) * bracket.rate_factor())
    }
}

/// Tax owed at the lower bound of each bracket.
pub fn cumulative_base_taxes<B: RateBand>(brackets: &[B]) -> Vec<Decimal> {
    let mut bases = Vec::with_capacity(brackets.len());
    let mut running = Decimal::ZERO;
    for bracket in brackets {
        bases.push(running);
        if let Some(upper) = bracket.upper_bound() {
            running += (upper - bracket.lower_bound()) * bracket.rate_factor();
        }
    }
    bases
}

/// Checks the structural invariants of a bracket table: starts at zero,
/// ascending, contiguous, non-negative rates, exactly one unbounded top
/// bracket which comes last.
pub fn validate_brackets<B: RateBand>(
    label: &str,
    brackets: &[B],
) -> Result<(), CalculationError> {
    let invalid = |msg: String| Err(CalculationError::Configuration(format!("{label}: {msg}")));

    let Some(first) = brackets.first() else {
        return invalid("no brackets".to_string());
    };
    if first.lower_bound() != Decimal::ZERO {
        return invalid(format!("first bracket starts at {}", first.lower_bound()));
    }

    let mut expected_lower = Decimal::ZERO;
    for (i, bracket) in brackets.iter().enumerate() {
        if bracket.lower_bound() != expected_lower {
            return invalid(format!(
                "bracket {i} starts at {} but previous ends at {expected_lower}",
                bracket.lower_bound()
            ));
        }
        if bracket.rate_factor() < Decimal::ZERO {
            return invalid(format!("bracket {i} has a negative rate"));
        }
        match bracket.upper_bound() {
            Some(upper) if upper <= bracket.lower_bound() => {
                return invalid(format!("bracket {i} is empty or inverted"));
            }
            Some(upper) => expected_lower = upper,
            None if i + 1 != brackets.len() => {
                return invalid(format!("unbounded bracket {i} is not the top bracket"));
            }
            None => return Ok(()),
        }
    }

    invalid("missing unbounded top bracket".to_string())
}

/// Simple income or wealth tax for one jurisdiction, applying its base
/// truncation, splitting and maximum average rate.
///
/// With splitting, the rate is determined at `base / divisor` and applied to
/// the whole base, which reduces to `simple(base / divisor) × divisor`.
pub fn assess_simple_tax<B: RateBand>(
    config: &CantonTaxYear,
    brackets: &[B],
    mode: BracketMode,
    base: Decimal,
    apply_splitting: bool,
) -> Result<Decimal, CalculationError> {
    let base = truncate_to_step(non_negative(base), config.base_truncation);
    if base.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let calculator = BracketTaxCalculator::new(brackets, mode);
    let tax = match config.splitting_divisor.filter(|_| apply_splitting) {
        Some(divisor) if divisor > Decimal::ZERO => calculator.compute(base / divisor)? * divisor,
        Some(divisor) => {
            return Err(CalculationError::Configuration(format!(
                "{}: splitting divisor must be positive, got {divisor}",
                config.jurisdiction
            )));
        }
        None => calculator.compute(base)?,
    };

    Ok(match config.max_average_rate {
        Some(max_rate) => tax.min(base * max_rate / Decimal::ONE_HUNDRED),
        None => tax,
    })
}
