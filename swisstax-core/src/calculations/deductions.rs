//! Deduction rules and taxable-base derivation.
//!
//! Deductions of one target base are evaluated in catalog `ordering`. A rule
//! naming `requires` is only granted when that code already produced a
//! non-zero amount, so capped supplements cannot double-count.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::common::non_negative;
use crate::error::CalculationError;
use crate::models::{
    CivilStatus, DeductionBase, DeductionRule, Degression, StandardDeduction, TaxBase,
    ThresholdGate,
};

/// Taxpayer facts every deduction rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct TaxpayerSituation<'a> {
    pub civil_status: CivilStatus,
    pub children: u32,
    /// Claimed amounts keyed by deduction code.
    pub claims: &'a BTreeMap<String, Decimal>,
}

impl TaxpayerSituation<'_> {
    fn claimed(
        &self,
        code: &str,
    ) -> Option<Decimal> {
        self.claims.get(code).copied()
    }
}

/// Input for a single rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionContext {
    pub civil_status: CivilStatus,
    pub children: u32,
    /// What the taxpayer claimed under the rule's code, if anything.
    pub claimed: Option<Decimal>,
}

impl Degression {
    /// `amount` less one `reduction_per_step` per full `step` of `excess`,
    /// never below `floor`.
    pub fn reduce(
        &self,
        amount: Decimal,
        excess: Decimal,
    ) -> Decimal {
        if self.step <= Decimal::ZERO || excess <= Decimal::ZERO {
            return amount;
        }
        let steps = (excess / self.step).floor();
        (amount - steps * self.reduction_per_step).max(self.floor)
    }
}

impl DeductionRule {
    /// Amount this rule deducts from `gross`. Never negative; pure.
    pub fn apply(
        &self,
        gross: Decimal,
        ctx: &DeductionContext,
    ) -> Decimal {
        let amount = match self {
            Self::Fixed { amount, per_child } => {
                if *per_child {
                    *amount * Decimal::from(ctx.children)
                } else {
                    *amount
                }
            }
            Self::PercentageCapped {
                base,
                percentage,
                min_amount,
                max_amount,
            } => {
                let base = match base {
                    DeductionBase::Gross => gross,
                    DeductionBase::Claimed => ctx.claimed.unwrap_or(Decimal::ZERO),
                };
                if base <= Decimal::ZERO {
                    Decimal::ZERO
                } else {
                    (base * *percentage / Decimal::ONE_HUNDRED)
                        .max(*min_amount)
                        .min(*max_amount)
                }
            }
            Self::ThresholdGated {
                gate,
                threshold,
                amount,
                degression,
            } => {
                let reached = gross >= *threshold;
                match (gate, reached, degression) {
                    (ThresholdGate::Below, false, _) => *amount,
                    (ThresholdGate::Above, false, _) => Decimal::ZERO,
                    (_, true, Some(degression)) => degression.reduce(*amount, gross - *threshold),
                    (ThresholdGate::Above, true, None) => *amount,
                    (ThresholdGate::Below, true, None) => Decimal::ZERO,
                }
            }
        };
        non_negative(amount)
    }
}

impl StandardDeduction {
    /// Civil status, children and claim predicates.
    pub fn is_applicable(
        &self,
        situation: &TaxpayerSituation<'_>,
    ) -> bool {
        self.eligibility.allows_status(situation.civil_status)
            && situation.children >= self.eligibility.min_children
            && (!self.eligibility.requires_claim || situation.claims.contains_key(&self.code))
    }
}

/// Catalog entries open to `civil_status`, in evaluation order.
pub fn filter_catalog<'a>(
    catalog: &'a [StandardDeduction],
    civil_status: CivilStatus,
) -> Vec<&'a StandardDeduction> {
    let mut rules: Vec<_> = catalog
        .iter()
        .filter(|d| d.eligibility.allows_status(civil_status))
        .collect();
    rules.sort_by_key(|d| d.ordering);
    rules
}

/// Rejects claims no catalog entry can honour.
///
/// A code absent from every catalog is unknown; a code whose entries all
/// exclude the taxpayer's civil status is incompatible.
pub fn validate_claims<'a>(
    catalogs: impl IntoIterator<Item = &'a [StandardDeduction]> + Clone,
    situation: &TaxpayerSituation<'_>,
) -> Result<(), CalculationError> {
    for (code, amount) in situation.claims {
        let mut matching = catalogs
            .clone()
            .into_iter()
            .flat_map(|catalog| catalog.iter())
            .filter(|d| &d.code == code)
            .peekable();

        if matching.peek().is_none() {
            return Err(CalculationError::Validation(format!(
                "unknown deduction code '{code}'"
            )));
        }
        if !matching.any(|d| d.eligibility.allows_status(situation.civil_status)) {
            return Err(CalculationError::Validation(format!(
                "deduction '{code}' is not available for civil status {}",
                situation.civil_status.as_str()
            )));
        }
        if amount.is_zero() {
            warn!(code = %code, "deduction claimed with zero amount");
        }
    }
    Ok(())
}

/// Amounts granted per code for one target base, in evaluation order.
pub fn granted_deductions(
    gross: Decimal,
    catalog: &[StandardDeduction],
    target: TaxBase,
    situation: &TaxpayerSituation<'_>,
) -> Vec<(String, Decimal)> {
    let mut rules: Vec<_> = catalog
        .iter()
        .filter(|d| d.target == target && d.is_applicable(situation))
        .collect();
    rules.sort_by_key(|d| d.ordering);

    let mut granted: Vec<(String, Decimal)> = Vec::with_capacity(rules.len());
    for rule in rules {
        if let Some(required) = &rule.requires {
            let satisfied = granted
                .iter()
                .any(|(code, amount)| code == required && !amount.is_zero());
            if !satisfied {
                debug!(code = %rule.code, requires = %required, "prerequisite not granted");
                continue;
            }
        }

        let ctx = DeductionContext {
            civil_status: situation.civil_status,
            children: situation.children,
            claimed: situation.claimed(&rule.code),
        };
        let amount = rule.rule.apply(gross, &ctx);
        debug!(code = %rule.code, kind = rule.rule.kind(), %amount, "deduction");
        granted.push((rule.code.clone(), amount));
    }
    granted
}

/// Gross income less every applicable income deduction, clamped at zero.
pub fn derive_taxable_income(
    gross_income: Decimal,
    catalog: &[StandardDeduction],
    situation: &TaxpayerSituation<'_>,
) -> Decimal {
    derive_taxable(gross_income, catalog, TaxBase::Income, situation)
}

/// Gross wealth less wealth deductions and the tax-free amount, clamped at
/// zero.
pub fn derive_taxable_wealth(
    gross_wealth: Decimal,
    catalog: &[StandardDeduction],
    tax_free_amount: Decimal,
    situation: &TaxpayerSituation<'_>,
) -> Decimal {
    non_negative(
        derive_taxable(gross_wealth, catalog, TaxBase::Wealth, situation) - tax_free_amount,
    )
}

fn derive_taxable(
    gross: Decimal,
    catalog: &[StandardDeduction],
    target: TaxBase,
    situation: &TaxpayerSituation<'_>,
) -> Decimal {
    let total: Decimal = granted_deductions(gross, catalog, target, situation)
        .into_iter()
        .map(|(_, amount)| amount)
        .sum();
    non_negative(gross - total)
}
