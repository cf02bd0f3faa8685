//! CSV loaders for the reference tables that change every year.
//!
//! Both loaders replace whole groups: every `(jurisdiction, year, tariff)`
//! bracket table or `(canton, year)` municipality list present in the input
//! is deleted and re-inserted, so loading the same file twice is a no-op.

use std::collections::BTreeMap;
use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use swisstax_core::calculations::validate_brackets;
use swisstax_core::{
    CantonCode, IncomeTaxBracket, Jurisdiction, Municipality, RateRepository, RepositoryError,
    TariffGroup,
};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading income bracket tables.
#[derive(Debug, Error)]
pub enum IncomeBracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid jurisdiction '{0}'")]
    InvalidJurisdiction(String),

    #[error("Invalid tariff '{0}'")]
    InvalidTariff(String),

    #[error("Invalid bracket table: {0}")]
    InvalidTable(String),

    #[error("{0}/{1} is not configured in the database (have you run the seeds?)")]
    JurisdictionNotConfigured(Jurisdiction, i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for IncomeBracketLoaderError {
    fn from(err: csv::Error) -> Self {
        IncomeBracketLoaderError::CsvParse(err.to_string())
    }
}

/// Errors that can occur when loading municipality multipliers.
#[derive(Debug, Error)]
pub enum MunicipalityLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid canton '{0}'")]
    InvalidCanton(String),

    #[error("Invalid municipality '{name}': {reason}")]
    InvalidMunicipality { name: String, reason: String },

    #[error("{0}/{1} is not configured in the database (have you run the seeds?)")]
    CantonNotConfigured(CantonCode, i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for MunicipalityLoaderError {
    fn from(err: csv::Error) -> Self {
        MunicipalityLoaderError::CsvParse(err.to_string())
    }
}

/// One row of an income bracket CSV.
///
/// - `jurisdiction`: `CH` for the federal schedule or a canton code
/// - `tariff`: `single` or `married`
/// - `upper_bound`: empty for the top bracket
/// - `rate`: marginal rate in percent
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IncomeBracketRecord {
    pub jurisdiction: String,
    pub tax_year: i32,
    pub tariff: String,
    pub lower_bound: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

/// One row of a municipality CSV. `bfs_number` and `canton_share` may be
/// left empty.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MunicipalityRecord {
    pub canton: String,
    pub tax_year: i32,
    pub name: String,
    pub bfs_number: Option<i32>,
    pub multiplier: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub canton_share: Option<Decimal>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn parse_records<R, T, E>(reader: R) -> Result<Vec<T>, E>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
    E: From<csv::Error>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize()
        .map(|result| result.map_err(E::from))
        .collect()
}

/// Loads income bracket tables through any [`RateRepository`].
pub struct IncomeBracketLoader;

impl IncomeBracketLoader {
    /// Parse bracket records from a CSV reader. Column order does not matter.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<IncomeBracketRecord>, IncomeBracketLoaderError> {
        parse_records(reader)
    }

    /// Group records into validated bracket tables keyed by
    /// `(jurisdiction, tax_year, tariff)`. Rows are sorted by lower bound and
    /// numbered from 1.
    pub fn tables(
        records: &[IncomeBracketRecord]
    ) -> Result<BTreeMap<(Jurisdiction, i32, TariffGroup), Vec<IncomeTaxBracket>>, IncomeBracketLoaderError>
    {
        let mut tables: BTreeMap<_, Vec<IncomeTaxBracket>> = BTreeMap::new();

        for record in records {
            let jurisdiction = Jurisdiction::parse(&record.jurisdiction).ok_or_else(|| {
                IncomeBracketLoaderError::InvalidJurisdiction(record.jurisdiction.clone())
            })?;
            let tariff = TariffGroup::parse(record.tariff.trim())
                .ok_or_else(|| IncomeBracketLoaderError::InvalidTariff(record.tariff.clone()))?;

            tables
                .entry((jurisdiction, record.tax_year, tariff))
                .or_default()
                .push(IncomeTaxBracket {
                    jurisdiction,
                    tax_year: record.tax_year,
                    tariff,
                    lower_bound: record.lower_bound,
                    upper_bound: record.upper_bound,
                    rate: record.rate,
                    ordering: 0,
                });
        }

        for ((jurisdiction, tax_year, tariff), brackets) in &mut tables {
            brackets.sort_by_key(|b| b.lower_bound);
            for (ordering, bracket) in (1..).zip(brackets.iter_mut()) {
                bracket.ordering = ordering;
            }
            let label = format!("{jurisdiction}/{tax_year}/{}", tariff.as_str());
            validate_brackets(&label, brackets)
                .map_err(|e| IncomeBracketLoaderError::InvalidTable(e.to_string()))?;
        }

        Ok(tables)
    }

    /// Replace the bracket tables named in `records`. Every table is validated
    /// before anything is written. Returns the number of rows inserted.
    pub async fn load<R: RateRepository + ?Sized>(
        repo: &R,
        records: &[IncomeBracketRecord],
    ) -> Result<usize, IncomeBracketLoaderError> {
        let tables = Self::tables(records)?;
        let mut inserted = 0;

        for ((jurisdiction, tax_year, tariff), brackets) in tables {
            repo.get_canton_tax_year(jurisdiction, tax_year)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => {
                        IncomeBracketLoaderError::JurisdictionNotConfigured(jurisdiction, tax_year)
                    }
                    other => IncomeBracketLoaderError::Repository(other),
                })?;

            repo.delete_income_brackets(jurisdiction, tax_year, tariff).await?;
            for bracket in &brackets {
                repo.insert_income_bracket(bracket).await?;
                inserted += 1;
            }
            debug!(%jurisdiction, tax_year, tariff = tariff.as_str(), rows = brackets.len(), "bracket table replaced");
        }

        info!(inserted, "income brackets loaded");
        Ok(inserted)
    }
}

/// Loads municipal multipliers through any [`RateRepository`].
pub struct MunicipalityLoader;

impl MunicipalityLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<MunicipalityRecord>, MunicipalityLoaderError> {
        parse_records(reader)
    }

    fn to_municipality(record: &MunicipalityRecord) -> Result<Municipality, MunicipalityLoaderError> {
        let canton = CantonCode::parse(&record.canton)
            .ok_or_else(|| MunicipalityLoaderError::InvalidCanton(record.canton.clone()))?;
        let invalid = |reason: &str| MunicipalityLoaderError::InvalidMunicipality {
            name: record.name.clone(),
            reason: reason.to_string(),
        };

        if record.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if record.multiplier < Decimal::ZERO {
            return Err(invalid("multiplier is negative"));
        }
        if record
            .canton_share
            .is_some_and(|share| !(Decimal::ZERO..=Decimal::ONE).contains(&share))
        {
            return Err(invalid("canton share outside 0..=1"));
        }

        Ok(Municipality {
            canton,
            tax_year: record.tax_year,
            name: record.name.trim().to_string(),
            bfs_number: record.bfs_number,
            tax_multiplier: record.multiplier,
            canton_share: record.canton_share,
        })
    }

    /// Replace the municipality list of every `(canton, year)` in `records`.
    /// Returns the number of rows inserted.
    pub async fn load<R: RateRepository + ?Sized>(
        repo: &R,
        records: &[MunicipalityRecord],
    ) -> Result<usize, MunicipalityLoaderError> {
        let mut groups: BTreeMap<(CantonCode, i32), Vec<Municipality>> = BTreeMap::new();
        for record in records {
            let municipality = Self::to_municipality(record)?;
            groups
                .entry((municipality.canton, municipality.tax_year))
                .or_default()
                .push(municipality);
        }

        let mut inserted = 0;
        for ((canton, tax_year), municipalities) in groups {
            repo.get_canton_tax_year(canton.into(), tax_year)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => {
                        MunicipalityLoaderError::CantonNotConfigured(canton, tax_year)
                    }
                    other => MunicipalityLoaderError::Repository(other),
                })?;

            repo.delete_municipalities(canton, tax_year).await?;
            for municipality in &municipalities {
                repo.insert_municipality(municipality).await?;
                inserted += 1;
            }
            debug!(canton = canton.as_str(), tax_year, rows = municipalities.len(), "municipalities replaced");
        }

        info!(inserted, "municipalities loaded");
        Ok(inserted)
    }
}
