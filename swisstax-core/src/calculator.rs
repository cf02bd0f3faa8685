//! End-to-end liability for one taxpayer.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, instrument};

use crate::calculations::aggregation::{SimpleTaxes, aggregate};
use crate::calculations::brackets::{BracketMode, assess_simple_tax, compute_simple_tax};
use crate::calculations::common::round_half_up;
use crate::calculations::deductions::{
    TaxpayerSituation, derive_taxable_income, derive_taxable_wealth, validate_claims,
};
use crate::error::CalculationError;
use crate::models::{
    CalculationRequest, CalculationResult, CantonCode, CantonTaxYear, Jurisdiction, TariffGroup,
    WealthRates,
};
use crate::snapshot::RateSnapshot;

/// Runs requests against one tax year's snapshot.
///
/// Holds nothing but a shared reference, so one calculator may serve any
/// number of concurrent requests.
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator<'a> {
    snapshot: &'a RateSnapshot,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(snapshot: &'a RateSnapshot) -> Self {
        Self { snapshot }
    }

    /// Validates `request`, derives the taxable bases, computes the simple
    /// taxes and aggregates them.
    ///
    /// # Errors
    ///
    /// * [`CalculationError::Validation`] for a malformed request or claim.
    /// * [`CalculationError::NotFound`] when the snapshot lacks data for the
    ///   canton or year.
    /// * [`CalculationError::Configuration`] for inconsistent reference data.
    #[instrument(skip_all, fields(canton = %request.canton, tax_year = request.tax_year))]
    pub fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, CalculationError> {
        let canton = request.validate()?;
        let jurisdiction = Jurisdiction::Canton(canton);
        if request.tax_year != self.snapshot.tax_year() {
            return Err(CalculationError::not_found(
                "tax year",
                jurisdiction,
                request.tax_year,
            ));
        }

        let federal_config = self.snapshot.canton_tax_year(Jurisdiction::Federal)?;
        let canton_config = self.snapshot.canton_tax_year(jurisdiction)?;
        let federal_catalog = self.snapshot.deductions(Jurisdiction::Federal);
        let canton_catalog = self.snapshot.deductions(jurisdiction);

        let situation = TaxpayerSituation {
            civil_status: request.civil_status,
            children: request.children,
            claims: &request.deduction_claims,
        };
        validate_claims([federal_catalog, canton_catalog], &situation)?;

        let tariff = request.civil_status.tariff();
        let federal_taxable_income =
            derive_taxable_income(request.gross_income, federal_catalog, &situation);
        let taxable_income = derive_taxable_income(request.gross_income, canton_catalog, &situation);
        debug!(%federal_taxable_income, %taxable_income, "taxable income");

        let simple_federal = self.simple_income_tax(federal_config, tariff, federal_taxable_income)?;
        let simple_cantonal = self.simple_income_tax(canton_config, tariff, taxable_income)?;

        let (taxable_wealth, simple_wealth) =
            self.wealth_tax(canton, tariff, request.gross_wealth, canton_catalog, &situation)?;
        debug!(
            %simple_federal,
            %simple_cantonal,
            %taxable_wealth,
            %simple_wealth,
            "simple taxes"
        );

        let simple = SimpleTaxes {
            federal: simple_federal,
            cantonal_income: simple_cantonal,
            cantonal_wealth: simple_wealth,
        };
        let breakdown = aggregate(
            self.snapshot,
            &simple,
            canton,
            &request.municipality,
            request.tax_year,
            request.denomination,
        )?;

        let effective_rate = if request.gross_income.is_zero() {
            Decimal::ZERO
        } else {
            (breakdown.total_tax / request.gross_income)
                .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        };

        debug!(total = %breakdown.total_tax, %effective_rate, "calculation complete");

        Ok(CalculationResult {
            taxable_income,
            federal_taxable_income,
            taxable_wealth,
            federal_tax: breakdown.federal_tax,
            cantonal_simple_tax: round_half_up(simple_cantonal),
            cantonal_simple_wealth_tax: round_half_up(simple_wealth),
            cantonal_tax: breakdown.cantonal_tax,
            municipal_tax: breakdown.municipal_tax,
            church_tax: breakdown.church_tax,
            total_tax: breakdown.total_tax,
            effective_rate,
        })
    }

    /// Married taxpayers in a splitting jurisdiction use the single tariff
    /// at the rate-determining income; elsewhere their own tariff.
    fn simple_income_tax(
        &self,
        config: &CantonTaxYear,
        tariff: TariffGroup,
        taxable: Decimal,
    ) -> Result<Decimal, CalculationError> {
        let splitting = tariff == TariffGroup::Married && config.splitting_divisor.is_some();
        let table_tariff = if splitting { TariffGroup::Single } else { tariff };
        let brackets = self
            .snapshot
            .get_income_brackets(config.jurisdiction, table_tariff)?;

        assess_simple_tax(
            config,
            brackets,
            config.rate_structure.into(),
            taxable,
            splitting,
        )
    }

    /// Taxable wealth and simple wealth tax. A canton without a wealth
    /// schedule is only acceptable when there is no wealth to tax.
    fn wealth_tax(
        &self,
        canton: CantonCode,
        tariff: TariffGroup,
        gross_wealth: Decimal,
        catalog: &[crate::models::StandardDeduction],
        situation: &TaxpayerSituation<'_>,
    ) -> Result<(Decimal, Decimal), CalculationError> {
        let schedule = match self.snapshot.get_wealth_schedule(canton) {
            Ok(schedule) => schedule,
            Err(CalculationError::NotFound { .. }) if gross_wealth.is_zero() => {
                return Ok((Decimal::ZERO, Decimal::ZERO));
            }
            Err(err) => return Err(err),
        };

        let taxable = derive_taxable_wealth(
            gross_wealth,
            catalog,
            schedule.tax_free_amount(tariff),
            situation,
        );
        let simple = match &schedule.rates {
            WealthRates::Brackets(table) => {
                compute_simple_tax(taxable, table, BracketMode::ProgressiveMarginal)?
            }
            WealthRates::Proportional(rate) => taxable * rate.rate_factor(),
        };

        Ok((taxable, simple))
    }
}
