use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::Jurisdiction;

/// Failures surfaced by the calculation core.
///
/// None of these are transient; callers show them instead of an
/// approximate result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    /// No reference data for the requested jurisdiction and year.
    #[error("tax data unavailable for {jurisdiction}/{tax_year}: {what}")]
    NotFound {
        what: String,
        jurisdiction: String,
        tax_year: i32,
    },

    /// Reference data is internally inconsistent.
    #[error("invalid tax configuration: {0}")]
    Configuration(String),

    /// The request is malformed.
    #[error("invalid calculation request: {0}")]
    Validation(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CalculationError {
    pub fn not_found(
        what: impl Into<String>,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Self {
        Self::NotFound {
            what: what.into(),
            jurisdiction: jurisdiction.to_string(),
            tax_year,
        }
    }
}
