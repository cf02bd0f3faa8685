mod calculation;
mod canton_tax_year;
mod church_tax;
mod civil_status;
mod jurisdiction;
mod municipality;
mod standard_deduction;
mod tax_bracket;
mod wealth;

pub use calculation::{CalculationRequest, CalculationResult, MAX_AMOUNT};
pub use canton_tax_year::{
    CantonTaxYear, MultiplierConvention, MultiplierSplit, RateStructureKind, RoundingMethod,
};
pub use church_tax::{ChurchTaxConfig, ChurchTaxMethod, ChurchTaxRate, Denomination};
pub use civil_status::{CivilStatus, TariffGroup};
pub use jurisdiction::{CantonCode, Jurisdiction};
pub use municipality::Municipality;
pub use standard_deduction::{
    DeductionBase, DeductionRule, Degression, Eligibility, StandardDeduction, TaxBase,
    ThresholdGate,
};
pub use tax_bracket::{IncomeTaxBracket, RateBand};
pub use wealth::{
    WealthRates, WealthSchedule, WealthTaxBracket, WealthTaxProportional, WealthTaxThreshold,
};
