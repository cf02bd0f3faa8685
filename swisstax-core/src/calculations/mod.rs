//! Calculation components of the engine.
//!
//! - [`brackets`]: simple tax from a bracket table
//! - [`deductions`]: deduction rules and taxable-base derivation
//! - [`aggregation`]: multipliers, church tax and the rounded total
//!
//! Every function here is pure over its arguments and a [`RateSnapshot`](crate::snapshot::RateSnapshot).

pub mod aggregation;
pub mod brackets;
pub mod common;
pub mod deductions;

pub use aggregation::{Multipliers, SimpleTaxes, TaxBreakdown, aggregate, apply_multipliers};
pub use brackets::{
    BracketMode, BracketTaxCalculator, assess_simple_tax, compute_simple_tax, validate_brackets,
};
pub use deductions::{
    DeductionContext, TaxpayerSituation, derive_taxable_income, derive_taxable_wealth,
    validate_claims,
};
