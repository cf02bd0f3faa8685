use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    CantonCode, CantonTaxYear, ChurchTaxConfig, ChurchTaxRate, Denomination, IncomeTaxBracket,
    Jurisdiction, MultiplierConvention, Municipality, StandardDeduction, TariffGroup, WealthSchedule,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Read access to the published reference tables, plus the write hooks the
/// data loaders need. Request-time code only ever reads.
#[async_trait]
pub trait RateRepository: Send + Sync {
    // Jurisdiction configuration
    async fn get_canton_tax_year(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<CantonTaxYear, RepositoryError>;
    async fn list_jurisdictions(
        &self,
        tax_year: i32,
    ) -> Result<Vec<Jurisdiction>, RepositoryError>;
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Income brackets, ordered ascending by lower bound
    async fn get_income_brackets(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
        tariff: TariffGroup,
    ) -> Result<Vec<IncomeTaxBracket>, RepositoryError>;
    async fn insert_income_bracket(
        &self,
        bracket: &IncomeTaxBracket,
    ) -> Result<(), RepositoryError>;
    async fn delete_income_brackets(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
        tariff: TariffGroup,
    ) -> Result<(), RepositoryError>;

    // Wealth tax
    async fn get_wealth_schedule(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<WealthSchedule, RepositoryError>;

    // Municipalities
    async fn get_municipality(
        &self,
        canton: CantonCode,
        name: &str,
        tax_year: i32,
    ) -> Result<Municipality, RepositoryError>;
    async fn list_municipalities(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<Vec<Municipality>, RepositoryError>;
    async fn insert_municipality(
        &self,
        municipality: &Municipality,
    ) -> Result<(), RepositoryError>;
    async fn delete_municipalities(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<(), RepositoryError>;

    /// Published municipal multiplier with the canton's convention.
    async fn get_municipal_multiplier(
        &self,
        canton: CantonCode,
        name: &str,
        tax_year: i32,
    ) -> Result<(Decimal, MultiplierConvention), RepositoryError> {
        let config = self.get_canton_tax_year(canton.into(), tax_year).await?;
        let municipality = self.get_municipality(canton, name, tax_year).await?;
        Ok((municipality.tax_multiplier, config.multiplier_convention))
    }

    // Church tax
    async fn get_church_tax_config(
        &self,
        canton: CantonCode,
    ) -> Result<ChurchTaxConfig, RepositoryError>;
    async fn get_church_rate(
        &self,
        canton: CantonCode,
        municipality: &str,
        denomination: Denomination,
        tax_year: i32,
    ) -> Result<ChurchTaxRate, RepositoryError>;
    async fn list_church_rates(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<Vec<ChurchTaxRate>, RepositoryError>;

    // Deductions, ordered by evaluation order
    async fn get_deductions(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Vec<StandardDeduction>, RepositoryError>;
}
