//! Multipliers and aggregation of simple taxes into the reported liability.
//!
//! ```text
//! cantonal  = simple × canton factor × canton share
//! municipal = simple × municipal factor
//! church    = simple × church factor
//! total     = federal + cantonal + municipal + church
//! ```
//!
//! `simple` is the cantonal simple income tax plus the simple wealth tax.
//! Each component is rounded once with its jurisdiction's method and the
//! total is the sum of the rounded components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculations::common::round_with;
use crate::error::CalculationError;
use crate::models::{
    CantonCode, CantonTaxYear, ChurchTaxMethod, Denomination, Jurisdiction, MultiplierSplit,
    Municipality, RoundingMethod,
};
use crate::snapshot::RateSnapshot;

/// Unscaled taxes the bracket calculator produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleTaxes {
    pub federal: Decimal,
    pub cantonal_income: Decimal,
    pub cantonal_wealth: Decimal,
}

impl SimpleTaxes {
    pub fn cantonal(&self) -> Decimal {
        self.cantonal_income + self.cantonal_wealth
    }
}

/// Normalized factors applied to the cantonal simple tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multipliers {
    pub canton: Decimal,
    pub canton_share: Decimal,
    pub municipal: Decimal,
    pub church: Decimal,
}

impl Multipliers {
    /// Resolves canton and municipal factors. `municipality` may only be
    /// absent when the canton levies no municipal multiplier and does not
    /// split its share.
    pub fn resolve(
        config: &CantonTaxYear,
        municipality: Option<&Municipality>,
        church: Decimal,
    ) -> Result<Self, CalculationError> {
        let needs_row = config.has_municipal_multiplier
            || config.multiplier_split == MultiplierSplit::CantonShareOverride;

        let (canton_share, municipal) = match (municipality, needs_row) {
            (None, true) => {
                return Err(CalculationError::Configuration(format!(
                    "{}/{}: no municipal multiplier row",
                    config.jurisdiction, config.tax_year
                )));
            }
            (None, false) => (Decimal::ONE, Decimal::ZERO),
            (Some(m), _) => {
                let share = match (config.multiplier_split, m.canton_share) {
                    (MultiplierSplit::Uniform, Some(_)) => {
                        return Err(CalculationError::Configuration(format!(
                            "{}: municipality '{}' overrides the canton share of a uniform canton",
                            config.jurisdiction, m.name
                        )));
                    }
                    (MultiplierSplit::Uniform, None) => Decimal::ONE,
                    (MultiplierSplit::CantonShareOverride, _) => m.canton_share_or_full(),
                };
                let municipal = if config.has_municipal_multiplier {
                    config.multiplier_convention.normalize(m.tax_multiplier)
                } else {
                    Decimal::ZERO
                };
                (share, municipal)
            }
        };

        Ok(Self {
            canton: config.canton_factor(),
            canton_share,
            municipal,
            church,
        })
    }
}

/// Rounded liability components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub federal_tax: Decimal,
    pub cantonal_tax: Decimal,
    pub municipal_tax: Decimal,
    pub church_tax: Decimal,
    pub total_tax: Decimal,
}

/// Scales the simple taxes and rounds each component.
pub fn apply_multipliers(
    simple: &SimpleTaxes,
    multipliers: &Multipliers,
    federal_rounding: RoundingMethod,
    cantonal_rounding: RoundingMethod,
) -> TaxBreakdown {
    let base = simple.cantonal();

    let federal_tax = round_with(simple.federal, federal_rounding);
    let cantonal_tax = round_with(
        base * multipliers.canton * multipliers.canton_share,
        cantonal_rounding,
    );
    let municipal_tax = round_with(base * multipliers.municipal, cantonal_rounding);
    let church_tax = round_with(base * multipliers.church, cantonal_rounding);

    TaxBreakdown {
        federal_tax,
        cantonal_tax,
        municipal_tax,
        church_tax,
        total_tax: federal_tax + cantonal_tax + municipal_tax + church_tax,
    }
}

/// Church factor for the taxpayer's denomination. Zero without a
/// denomination, in cantons without church tax, and for denominations the
/// canton does not recognise.
pub fn church_factor(
    snapshot: &RateSnapshot,
    config: &CantonTaxYear,
    canton: CantonCode,
    municipality: &str,
    denomination: Option<Denomination>,
) -> Result<Decimal, CalculationError> {
    let Some(denomination) = denomination else {
        return Ok(Decimal::ZERO);
    };
    let Some(church) = snapshot.church_tax_config(canton).filter(|c| c.has_church_tax) else {
        return Ok(Decimal::ZERO);
    };
    if !church.recognizes(denomination) {
        warn!(
            canton = %canton,
            denomination = denomination.as_str(),
            "denomination not recognised, no church tax"
        );
        return Ok(Decimal::ZERO);
    }

    let rate = snapshot.get_church_rate(canton, municipality, denomination)?;
    let published = match church.method {
        ChurchTaxMethod::RateOnSimpleTax => rate.rate,
        ChurchTaxMethod::DistrictAndParish => rate.rate + rate.district_rate.unwrap_or_default(),
    };

    Ok(config.multiplier_convention.normalize(published))
}

/// Cantonal, municipal and church taxes for one municipality, plus the
/// federal tax, from the simple taxes.
///
/// # Errors
///
/// * [`CalculationError::Configuration`] when the municipality resolves to
///   no multiplier row.
/// * [`CalculationError::NotFound`] when the year is not the snapshot's or
///   the canton has no configuration.
pub fn aggregate(
    snapshot: &RateSnapshot,
    simple: &SimpleTaxes,
    canton: CantonCode,
    municipality: &str,
    tax_year: i32,
    denomination: Option<Denomination>,
) -> Result<TaxBreakdown, CalculationError> {
    let jurisdiction = Jurisdiction::Canton(canton);
    if tax_year != snapshot.tax_year() {
        return Err(CalculationError::not_found(
            "tax year configuration",
            jurisdiction,
            tax_year,
        ));
    }
    let federal = snapshot.canton_tax_year(Jurisdiction::Federal)?;
    let config = snapshot.canton_tax_year(jurisdiction)?;

    let row = match snapshot.get_municipality(canton, municipality) {
        Ok(row) => Some(row),
        Err(CalculationError::NotFound { .. }) => None,
        Err(other) => return Err(other),
    };
    let church = church_factor(snapshot, config, canton, municipality, denomination)?;
    let multipliers = Multipliers::resolve(config, row, church).map_err(|err| match err {
        CalculationError::Configuration(msg) => {
            CalculationError::Configuration(format!("{msg} for '{municipality}'"))
        }
        other => other,
    })?;
    debug!(?multipliers, canton = %canton, municipality, "resolved multipliers");

    Ok(apply_multipliers(
        simple,
        &multipliers,
        federal.rounding,
        config.rounding,
    ))
}
