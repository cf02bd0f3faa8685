//! End-to-end calculations over the seeded SQLite database.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use swisstax_core::{
    CalculationError, CalculationRequest, CalculationResult, CivilStatus, DbConfig, Denomination,
    MAX_AMOUNT, RateSnapshot, RepositoryRegistry, TaxCalculator,
};
use swisstax_db_sqlite::SqliteRepositoryFactory;

async fn snapshot_2024() -> RateSnapshot {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    let repo = registry
        .create(&DbConfig::sqlite(":memory:"))
        .await
        .expect("seeded repository opens");

    RateSnapshot::load(&*repo, 2024).await.expect("2024 snapshot loads")
}

fn basel_single(municipality: &str) -> CalculationRequest {
    CalculationRequest {
        canton: "BS".to_string(),
        municipality: municipality.to_string(),
        tax_year: 2024,
        civil_status: CivilStatus::Single,
        children: 0,
        gross_income: dec!(100000),
        gross_wealth: Decimal::ZERO,
        deduction_claims: BTreeMap::new(),
        denomination: None,
    }
}

#[tokio::test]
async fn basel_city_levies_no_municipal_tax() {
    let snapshot = snapshot_2024().await;

    let result = TaxCalculator::new(&snapshot)
        .calculate(&basel_single("Basel"))
        .expect("calculates");

    assert_eq!(
        result,
        CalculationResult {
            taxable_income: dec!(97000),
            federal_taxable_income: dec!(97000),
            taxable_wealth: dec!(0),
            federal_tax: dec!(2538.60),
            cantonal_simple_tax: dec!(20370),
            cantonal_simple_wealth_tax: dec!(0),
            cantonal_tax: dec!(20370),
            municipal_tax: dec!(0),
            church_tax: dec!(0),
            total_tax: dec!(22908.60),
            effective_rate: dec!(0.2291),
        }
    );
}

#[tokio::test]
async fn riehen_splits_canton_share_and_adds_church_tax() {
    let snapshot = snapshot_2024().await;
    let mut request = basel_single("Riehen");
    request.denomination = Some(Denomination::Protestant);

    let result = TaxCalculator::new(&snapshot)
        .calculate(&request)
        .expect("calculates");

    assert_eq!(result.cantonal_tax, dec!(10185));
    assert_eq!(result.municipal_tax, dec!(7638.75));
    assert_eq!(result.church_tax, dec!(1629.60));
    assert_eq!(result.total_tax, dec!(21991.95));
    assert_eq!(result.effective_rate, dec!(0.2199));
}

#[tokio::test]
async fn recognised_denomination_without_rate_is_not_found() {
    let snapshot = snapshot_2024().await;
    let mut request = basel_single("Riehen");
    request.denomination = Some(Denomination::Jewish);

    let result = TaxCalculator::new(&snapshot).calculate(&request);

    assert!(matches!(result, Err(CalculationError::NotFound { .. })));
}

#[tokio::test]
async fn unknown_municipality_is_a_configuration_error() {
    let snapshot = snapshot_2024().await;

    let result = TaxCalculator::new(&snapshot).calculate(&basel_single("Allschwil"));

    assert!(matches!(result, Err(CalculationError::Configuration(msg)) if msg.contains("Allschwil")));
}

#[tokio::test]
async fn canton_missing_from_year_is_not_found() {
    let snapshot = snapshot_2024().await;
    let mut request = basel_single("Genève");
    request.canton = "GE".to_string();

    let result = TaxCalculator::new(&snapshot).calculate(&request);

    assert!(matches!(result, Err(CalculationError::NotFound { ref jurisdiction, .. }) if jurisdiction == "GE"));
}

#[tokio::test]
async fn zero_income_and_wealth_owe_nothing() {
    let snapshot = snapshot_2024().await;
    let mut request = basel_single("Riehen");
    request.gross_income = Decimal::ZERO;
    request.denomination = Some(Denomination::Protestant);

    let result = TaxCalculator::new(&snapshot)
        .calculate(&request)
        .expect("calculates");

    assert_eq!(result.total_tax, dec!(0));
    assert_eq!(result.effective_rate, dec!(0));
}

#[tokio::test]
async fn oversized_income_is_a_validation_error() {
    let snapshot = snapshot_2024().await;
    let mut request = basel_single("Basel");
    request.gross_income = MAX_AMOUNT * dec!(10000000000000);

    let result = TaxCalculator::new(&snapshot).calculate(&request);

    assert!(matches!(result, Err(CalculationError::Validation(msg)) if msg.contains("gross income")));
}

#[tokio::test]
async fn largest_accepted_amounts_calculate() {
    let snapshot = snapshot_2024().await;
    let mut request = basel_single("Riehen");
    request.gross_income = MAX_AMOUNT;
    request.gross_wealth = MAX_AMOUNT;
    request.denomination = Some(Denomination::Protestant);

    let result = TaxCalculator::new(&snapshot)
        .calculate(&request)
        .expect("calculates");

    assert!(result.total_tax > Decimal::ZERO);
    assert!(result.total_tax < MAX_AMOUNT);
}

#[tokio::test]
async fn lucerne_married_couple_uses_splitting() {
    let snapshot = snapshot_2024().await;
    let single = CalculationRequest {
        canton: "LU".to_string(),
        municipality: "Luzern".to_string(),
        tax_year: 2024,
        civil_status: CivilStatus::Single,
        children: 0,
        gross_income: dec!(150000),
        gross_wealth: Decimal::ZERO,
        deduction_claims: BTreeMap::new(),
        denomination: None,
    };
    let married = CalculationRequest {
        civil_status: CivilStatus::Married,
        ..single.clone()
    };

    let calculator = TaxCalculator::new(&snapshot);
    let single_result = calculator.calculate(&single).expect("single calculates");
    let married_result = calculator.calculate(&married).expect("married calculates");

    assert!(married_result.cantonal_simple_tax < single_result.cantonal_simple_tax);
    assert!(married_result.federal_tax < single_result.federal_tax);
}
