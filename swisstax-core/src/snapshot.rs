//! Immutable reference tables for one tax year.
//!
//! A [`RateSnapshot`] is built once, validated, and then shared read-only by
//! every calculation for that year. It is the only source of rates the
//! calculator sees; nothing is read from ambient state.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::calculations::brackets::validate_brackets;
use crate::db::{RateRepository, RepositoryError};
use crate::error::CalculationError;
use crate::models::{
    CantonCode, CantonTaxYear, ChurchTaxConfig, ChurchTaxRate, CivilStatus, Denomination,
    IncomeTaxBracket, Jurisdiction, MultiplierConvention, MultiplierSplit, Municipality,
    StandardDeduction, TariffGroup, WealthRates, WealthSchedule,
};

#[derive(Debug, Clone)]
pub struct RateSnapshot {
    tax_year: i32,
    configs: HashMap<Jurisdiction, CantonTaxYear>,
    brackets: HashMap<(Jurisdiction, TariffGroup), Vec<IncomeTaxBracket>>,
    wealth: HashMap<CantonCode, WealthSchedule>,
    // Keyed by lowercase name.
    municipalities: HashMap<(CantonCode, String), Municipality>,
    church_configs: HashMap<CantonCode, ChurchTaxConfig>,
    church_rates: HashMap<(CantonCode, String, Denomination), ChurchTaxRate>,
    deductions: HashMap<Jurisdiction, Vec<StandardDeduction>>,
}

fn municipality_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl RateSnapshot {
    pub fn builder(tax_year: i32) -> RateSnapshotBuilder {
        RateSnapshotBuilder::new(tax_year)
    }

    /// Reads every table for `tax_year` through `repo` and validates the
    /// result.
    ///
    /// # Errors
    ///
    /// * [`CalculationError::NotFound`] when the repository holds no
    ///   jurisdiction for the year.
    /// * [`CalculationError::Configuration`] when the loaded tables are
    ///   inconsistent.
    /// * [`CalculationError::Repository`] for storage failures.
    pub async fn load(
        repo: &dyn RateRepository,
        tax_year: i32,
    ) -> Result<Self, CalculationError> {
        let jurisdictions = repo.list_jurisdictions(tax_year).await?;
        if jurisdictions.is_empty() {
            return Err(CalculationError::not_found(
                "tax year",
                Jurisdiction::Federal,
                tax_year,
            ));
        }

        let mut builder = RateSnapshotBuilder::new(tax_year);
        for jurisdiction in jurisdictions {
            let config = repo
                .get_canton_tax_year(jurisdiction, tax_year)
                .await
                .map_err(|err| match err {
                    RepositoryError::NotFound => {
                        CalculationError::not_found("tax configuration", jurisdiction, tax_year)
                    }
                    other => other.into(),
                })?;
            builder = builder.canton_tax_year(config);

            for tariff in [TariffGroup::Single, TariffGroup::Married] {
                if let Some(brackets) =
                    optional(repo.get_income_brackets(jurisdiction, tax_year, tariff).await)?
                {
                    builder = builder.income_brackets(brackets);
                }
            }
            for deduction in repo.get_deductions(jurisdiction, tax_year).await? {
                builder = builder.deduction(deduction);
            }

            let Some(canton) = jurisdiction.canton() else {
                continue;
            };
            if let Some(schedule) = optional(repo.get_wealth_schedule(canton, tax_year).await)? {
                builder = builder.wealth_schedule(schedule);
            }
            for municipality in repo.list_municipalities(canton, tax_year).await? {
                builder = builder.municipality(municipality);
            }
            if let Some(config) = optional(repo.get_church_tax_config(canton).await)? {
                builder = builder.church_config(config);
            }
            for rate in repo.list_church_rates(canton, tax_year).await? {
                builder = builder.church_rate(rate);
            }
        }

        let snapshot = builder.build()?;
        info!(
            tax_year,
            jurisdictions = snapshot.configs.len(),
            municipalities = snapshot.municipalities.len(),
            "rate snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn tax_year(&self) -> i32 {
        self.tax_year
    }

    /// Jurisdictions with a configuration, federal first.
    pub fn jurisdictions(&self) -> Vec<Jurisdiction> {
        let mut all: Vec<_> = self.configs.keys().copied().collect();
        all.sort();
        all
    }

    pub fn canton_tax_year(
        &self,
        jurisdiction: Jurisdiction,
    ) -> Result<&CantonTaxYear, CalculationError> {
        self.configs.get(&jurisdiction).ok_or_else(|| {
            CalculationError::not_found("tax configuration", jurisdiction, self.tax_year)
        })
    }

    pub fn get_income_brackets(
        &self,
        jurisdiction: Jurisdiction,
        tariff: TariffGroup,
    ) -> Result<&[IncomeTaxBracket], CalculationError> {
        self.brackets
            .get(&(jurisdiction, tariff))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                CalculationError::not_found(
                    format!("{} income brackets", tariff.as_str()),
                    jurisdiction,
                    self.tax_year,
                )
            })
    }

    /// Income brackets by raw jurisdiction code (`CH` or a canton code).
    /// An unknown code has no data and is reported as not found.
    pub fn get_income_brackets_for_code(
        &self,
        code: &str,
        tariff: TariffGroup,
    ) -> Result<&[IncomeTaxBracket], CalculationError> {
        match Jurisdiction::parse(code) {
            Some(jurisdiction) => self.get_income_brackets(jurisdiction, tariff),
            None => Err(CalculationError::NotFound {
                what: format!("{} income brackets", tariff.as_str()),
                jurisdiction: code.to_string(),
                tax_year: self.tax_year,
            }),
        }
    }

    pub fn get_wealth_schedule(
        &self,
        canton: CantonCode,
    ) -> Result<&WealthSchedule, CalculationError> {
        self.wealth.get(&canton).ok_or_else(|| {
            CalculationError::not_found("wealth tax schedule", canton.into(), self.tax_year)
        })
    }

    pub fn get_municipality(
        &self,
        canton: CantonCode,
        name: &str,
    ) -> Result<&Municipality, CalculationError> {
        self.municipalities
            .get(&(canton, municipality_key(name)))
            .ok_or_else(|| {
                CalculationError::not_found(
                    format!("municipality '{name}'"),
                    canton.into(),
                    self.tax_year,
                )
            })
    }

    /// Published municipal multiplier and the convention it is expressed in.
    pub fn get_municipal_multiplier(
        &self,
        canton: CantonCode,
        name: &str,
    ) -> Result<(Decimal, MultiplierConvention), CalculationError> {
        let config = self.canton_tax_year(canton.into())?;
        let municipality = self.get_municipality(canton, name)?;
        Ok((municipality.tax_multiplier, config.multiplier_convention))
    }

    pub fn church_tax_config(
        &self,
        canton: CantonCode,
    ) -> Option<&ChurchTaxConfig> {
        self.church_configs.get(&canton)
    }

    pub fn get_church_rate(
        &self,
        canton: CantonCode,
        municipality: &str,
        denomination: Denomination,
    ) -> Result<&ChurchTaxRate, CalculationError> {
        self.church_rates
            .get(&(canton, municipality_key(municipality), denomination))
            .ok_or_else(|| {
                CalculationError::not_found(
                    format!("{} church rate for '{municipality}'", denomination.as_str()),
                    canton.into(),
                    self.tax_year,
                )
            })
    }

    /// Full deduction catalog of a jurisdiction, in evaluation order.
    /// Empty when the jurisdiction grants none.
    pub fn deductions(
        &self,
        jurisdiction: Jurisdiction,
    ) -> &[StandardDeduction] {
        self.deductions
            .get(&jurisdiction)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Deductions whose civil-status predicate admits `civil_status`.
    ///
    /// # Errors
    ///
    /// [`CalculationError::NotFound`] when the jurisdiction has no
    /// configuration for the year.
    pub fn get_deductions(
        &self,
        jurisdiction: Jurisdiction,
        civil_status: CivilStatus,
    ) -> Result<Vec<&StandardDeduction>, CalculationError> {
        self.canton_tax_year(jurisdiction)?;
        Ok(crate::calculations::deductions::filter_catalog(
            self.deductions(jurisdiction),
            civil_status,
        ))
    }
}

/// Maps a repository `NotFound` onto `None`.
fn optional<T>(result: Result<T, RepositoryError>) -> Result<Option<T>, RepositoryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RepositoryError::NotFound) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Collects reference rows and validates them into a [`RateSnapshot`].
#[derive(Debug, Clone)]
pub struct RateSnapshotBuilder {
    tax_year: i32,
    configs: Vec<CantonTaxYear>,
    brackets: Vec<IncomeTaxBracket>,
    wealth: Vec<WealthSchedule>,
    municipalities: Vec<Municipality>,
    church_configs: Vec<ChurchTaxConfig>,
    church_rates: Vec<ChurchTaxRate>,
    deductions: Vec<StandardDeduction>,
}

impl RateSnapshotBuilder {
    pub fn new(tax_year: i32) -> Self {
        Self {
            tax_year,
            configs: Vec::new(),
            brackets: Vec::new(),
            wealth: Vec::new(),
            municipalities: Vec::new(),
            church_configs: Vec::new(),
            church_rates: Vec::new(),
            deductions: Vec::new(),
        }
    }

    pub fn canton_tax_year(
        mut self,
        config: CantonTaxYear,
    ) -> Self {
        self.configs.push(config);
        self
    }

    pub fn income_bracket(
        mut self,
        bracket: IncomeTaxBracket,
    ) -> Self {
        self.brackets.push(bracket);
        self
    }

    pub fn income_brackets(
        mut self,
        brackets: impl IntoIterator<Item = IncomeTaxBracket>,
    ) -> Self {
        self.brackets.extend(brackets);
        self
    }

    pub fn wealth_schedule(
        mut self,
        schedule: WealthSchedule,
    ) -> Self {
        self.wealth.push(schedule);
        self
    }

    pub fn municipality(
        mut self,
        municipality: Municipality,
    ) -> Self {
        self.municipalities.push(municipality);
        self
    }

    pub fn church_config(
        mut self,
        config: ChurchTaxConfig,
    ) -> Self {
        self.church_configs.push(config);
        self
    }

    pub fn church_rate(
        mut self,
        rate: ChurchTaxRate,
    ) -> Self {
        self.church_rates.push(rate);
        self
    }

    pub fn deduction(
        mut self,
        deduction: StandardDeduction,
    ) -> Self {
        self.deductions.push(deduction);
        self
    }

    /// Validates and freezes the collected rows.
    ///
    /// # Errors
    ///
    /// [`CalculationError::Configuration`] for rows of another year,
    /// duplicates, rows without a jurisdiction configuration, malformed
    /// bracket tables, or out-of-range multipliers.
    pub fn build(self) -> Result<RateSnapshot, CalculationError> {
        let year = self.tax_year;
        let invalid = |msg: String| CalculationError::Configuration(msg);
        let check_year = |what: &str, owner: &dyn std::fmt::Display, row_year: i32| {
            if row_year == year {
                Ok(())
            } else {
                Err(invalid(format!(
                    "{what} for {owner} is for {row_year}, snapshot is {year}"
                )))
            }
        };

        let mut configs = HashMap::new();
        for config in self.configs {
            check_year("configuration", &config.jurisdiction, config.tax_year)?;
            validate_config(&config)?;
            if configs.insert(config.jurisdiction, config.clone()).is_some() {
                return Err(invalid(format!(
                    "duplicate configuration for {}",
                    config.jurisdiction
                )));
            }
        }
        let configured = |jurisdiction: Jurisdiction| -> Result<&CantonTaxYear, CalculationError> {
            configs.get(&jurisdiction).ok_or_else(|| {
                invalid(format!("{jurisdiction} has rows but no configuration for {year}"))
            })
        };

        let mut grouped: BTreeMap<(Jurisdiction, TariffGroup), Vec<IncomeTaxBracket>> =
            BTreeMap::new();
        for bracket in self.brackets {
            check_year("income bracket", &bracket.jurisdiction, bracket.tax_year)?;
            configured(bracket.jurisdiction)?;
            grouped
                .entry((bracket.jurisdiction, bracket.tariff))
                .or_default()
                .push(bracket);
        }
        let mut brackets = HashMap::with_capacity(grouped.len());
        for ((jurisdiction, tariff), mut table) in grouped {
            table.sort_by(|a, b| {
                a.ordering
                    .cmp(&b.ordering)
                    .then(a.lower_bound.cmp(&b.lower_bound))
            });
            validate_brackets(&format!("{jurisdiction}/{year} {}", tariff.as_str()), &table)?;
            brackets.insert((jurisdiction, tariff), table);
        }

        let mut wealth = HashMap::new();
        for mut schedule in self.wealth {
            check_year("wealth schedule", &schedule.canton, schedule.tax_year)?;
            configured(schedule.canton.into())?;
            let label = format!("{}/{year} wealth", schedule.canton);
            match &mut schedule.rates {
                WealthRates::Brackets(table) => {
                    table.sort_by_key(|b| b.ordering);
                    validate_brackets(&label, table)?;
                }
                WealthRates::Proportional(rate) if rate.rate_per_mille < Decimal::ZERO => {
                    return Err(invalid(format!("{label}: negative proportional rate")));
                }
                WealthRates::Proportional(_) => {}
            }
            if schedule.thresholds.iter().any(|t| t.tax_free_amount < Decimal::ZERO) {
                return Err(invalid(format!("{label}: negative tax-free amount")));
            }
            let canton = schedule.canton;
            if wealth.insert(canton, schedule).is_some() {
                return Err(invalid(format!("duplicate wealth schedule for {canton}")));
            }
        }

        let mut municipalities = HashMap::new();
        for municipality in self.municipalities {
            check_year("municipality", &municipality.canton, municipality.tax_year)?;
            let config = configured(municipality.canton.into())?;
            validate_municipality(config, &municipality)?;
            let key = (municipality.canton, municipality_key(&municipality.name));
            if municipalities.insert(key, municipality.clone()).is_some() {
                return Err(invalid(format!(
                    "duplicate municipality '{}' in {}",
                    municipality.name, municipality.canton
                )));
            }
        }

        let mut church_configs = HashMap::new();
        for config in self.church_configs {
            configured(config.canton.into())?;
            let canton = config.canton;
            if church_configs.insert(canton, config).is_some() {
                return Err(invalid(format!("duplicate church tax configuration for {canton}")));
            }
        }

        let mut church_rates = HashMap::new();
        for rate in self.church_rates {
            check_year("church rate", &rate.canton, rate.tax_year)?;
            configured(rate.canton.into())?;
            if rate.rate < Decimal::ZERO || rate.district_rate.is_some_and(|d| d < Decimal::ZERO)
            {
                return Err(invalid(format!(
                    "negative church rate for '{}' in {}",
                    rate.municipality, rate.canton
                )));
            }
            let key = (rate.canton, municipality_key(&rate.municipality), rate.denomination);
            if church_rates.contains_key(&key) {
                return Err(invalid(format!(
                    "duplicate {} church rate for '{}' in {}",
                    rate.denomination.as_str(),
                    rate.municipality,
                    rate.canton
                )));
            }
            church_rates.insert(key, rate);
        }

        let mut deductions: HashMap<Jurisdiction, Vec<StandardDeduction>> = HashMap::new();
        for deduction in self.deductions {
            check_year("deduction", &deduction.jurisdiction, deduction.tax_year)?;
            configured(deduction.jurisdiction)?;
            deductions
                .entry(deduction.jurisdiction)
                .or_default()
                .push(deduction);
        }
        for catalog in deductions.values_mut() {
            catalog.sort_by_key(|d| d.ordering);
        }

        debug!(
            tax_year = year,
            tables = brackets.len(),
            "rate snapshot validated"
        );

        Ok(RateSnapshot {
            tax_year: year,
            configs,
            brackets,
            wealth,
            municipalities,
            church_configs,
            church_rates,
            deductions,
        })
    }
}

fn validate_config(config: &CantonTaxYear) -> Result<(), CalculationError> {
    let fail = |msg: &str| {
        Err(CalculationError::Configuration(format!(
            "{}/{}: {msg}",
            config.jurisdiction, config.tax_year
        )))
    };

    if config.canton_multiplier < Decimal::ZERO {
        return fail("negative canton multiplier");
    }
    if config.splitting_divisor.is_some_and(|d| d <= Decimal::ZERO) {
        return fail("splitting divisor must be positive");
    }
    if config
        .max_average_rate
        .is_some_and(|r| r <= Decimal::ZERO || r > Decimal::ONE_HUNDRED)
    {
        return fail("maximum average rate must be within (0, 100]");
    }
    if config.base_truncation.is_some_and(|t| t <= Decimal::ZERO) {
        return fail("base truncation step must be positive");
    }
    Ok(())
}

fn validate_municipality(
    config: &CantonTaxYear,
    municipality: &Municipality,
) -> Result<(), CalculationError> {
    let fail = |msg: String| {
        Err(CalculationError::Configuration(format!(
            "{}/{} '{}': {msg}",
            municipality.canton, municipality.tax_year, municipality.name
        )))
    };

    if municipality.tax_multiplier < Decimal::ZERO {
        return fail("negative municipal multiplier".to_string());
    }
    match (config.multiplier_split, municipality.canton_share) {
        (MultiplierSplit::Uniform, Some(_)) => {
            fail("canton-share override in a canton with a uniform split".to_string())
        }
        (_, Some(share)) if share < Decimal::ZERO || share > Decimal::ONE => {
            fail(format!("canton share {share} outside [0, 1]"))
        }
        _ => Ok(()),
    }
}
