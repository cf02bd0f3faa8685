use std::collections::BTreeMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use swisstax_core::calculations::common::round_half_up;
use swisstax_core::calculations::{
    BracketMode, BracketTaxCalculator, Multipliers, SimpleTaxes, TaxpayerSituation,
    apply_multipliers, compute_simple_tax, derive_taxable_income,
};
use swisstax_core::{
    CantonCode, CivilStatus, DeductionBase, DeductionRule, Degression, Eligibility,
    IncomeTaxBracket, Jurisdiction, RateBand, RoundingMethod, StandardDeduction, TariffGroup,
    TaxBase, ThresholdGate,
};

/// Amount in centimes up to 10 million francs.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|c| Decimal::new(c, 2))
}

/// Contiguous table from zero: widths in francs, rates in hundredths of a
/// percent, last bracket unbounded.
fn bracket_table() -> impl Strategy<Value = Vec<IncomeTaxBracket>> {
    prop::collection::vec((1i64..200_000, 0i64..4_000), 1..8).prop_map(|rows| {
        let last = rows.len() - 1;
        let mut lower = Decimal::ZERO;
        rows.into_iter()
            .enumerate()
            .map(|(i, (width, rate))| {
                let upper = (i != last).then(|| lower + Decimal::from(width));
                let bracket = IncomeTaxBracket {
                    jurisdiction: Jurisdiction::Canton(CantonCode::ZH),
                    tax_year: 2024,
                    tariff: TariffGroup::Single,
                    lower_bound: lower,
                    upper_bound: upper,
                    rate: Decimal::new(rate, 2),
                    ordering: i as i32,
                };
                if let Some(upper) = upper {
                    lower = upper;
                }
                bracket
            })
            .collect()
    })
}

fn rule() -> impl Strategy<Value = DeductionRule> {
    let money = || (0i64..5_000_000).prop_map(|c| Decimal::new(c, 2));
    prop_oneof![
        (money(), any::<bool>()).prop_map(|(amount, per_child)| DeductionRule::Fixed {
            amount,
            per_child
        }),
        (0i64..10_000, money(), money()).prop_map(|(pct, a, b)| {
            DeductionRule::PercentageCapped {
                base: DeductionBase::Gross,
                percentage: Decimal::new(pct, 2),
                min_amount: a.min(b),
                max_amount: a.max(b),
            }
        }),
        (any::<bool>(), money(), money(), 1i64..10_000).prop_map(|(below, threshold, amount, step)| {
            DeductionRule::ThresholdGated {
                gate: if below { ThresholdGate::Below } else { ThresholdGate::Above },
                threshold,
                amount,
                degression: Some(Degression {
                    step: Decimal::from(step),
                    reduction_per_step: Decimal::from(100),
                    floor: Decimal::ZERO,
                }),
            }
        }),
    ]
}

fn catalog() -> impl Strategy<Value = Vec<StandardDeduction>> {
    prop::collection::vec(rule(), 0..6).prop_map(|rules| {
        rules
            .into_iter()
            .enumerate()
            .map(|(i, rule)| StandardDeduction {
                jurisdiction: Jurisdiction::Canton(CantonCode::ZH),
                tax_year: 2024,
                code: format!("d{i}"),
                target: TaxBase::Income,
                rule,
                eligibility: Eligibility::default(),
                requires: None,
                ordering: i as i32,
            })
            .collect()
    })
}

fn rate_of_bracket_containing(
    table: &[IncomeTaxBracket],
    x: Decimal,
) -> Decimal {
    table
        .iter()
        .find(|b| b.contains(x))
        .map(RateBand::rate_factor)
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn progressive_tax_is_monotonic(table in bracket_table(), a in amount(), b in amount()) {
        let (x, y) = if a <= b { (a, b) } else { (b, a) };

        let tx = compute_simple_tax(x, &table, BracketMode::ProgressiveMarginal).unwrap();
        let ty = compute_simple_tax(y, &table, BracketMode::ProgressiveMarginal).unwrap();

        prop_assert!(tx <= ty, "tax({x}) = {tx} > tax({y}) = {ty}");
    }

    #[test]
    fn non_positive_amounts_are_untaxed(table in bracket_table(), c in 0i64..1_000_000_000) {
        let x = -Decimal::new(c, 2);

        for mode in [BracketMode::ProgressiveMarginal, BracketMode::FlatPerBracket] {
            prop_assert_eq!(compute_simple_tax(x, &table, mode).unwrap(), Decimal::ZERO);
        }
    }

    #[test]
    fn slice_sum_matches_closed_form(table in bracket_table(), x in amount()) {
        let calc = BracketTaxCalculator::new(&table, BracketMode::ProgressiveMarginal);

        prop_assert_eq!(calc.compute(x).unwrap(), calc.progressive_closed_form(x).unwrap());
    }

    #[test]
    fn flat_per_bracket_is_amount_times_rate(table in bracket_table(), x in amount()) {
        prop_assume!(x > Decimal::ZERO);

        let tax = compute_simple_tax(x, &table, BracketMode::FlatPerBracket).unwrap();

        prop_assert_eq!(tax, x * rate_of_bracket_containing(&table, x));
    }

    #[test]
    fn taxable_income_is_never_negative(
        catalog in catalog(),
        gross in amount(),
        children in 0u32..6,
    ) {
        let claims = BTreeMap::new();
        let situation = TaxpayerSituation {
            civil_status: CivilStatus::Married,
            children,
            claims: &claims,
        };

        let taxable = derive_taxable_income(gross, &catalog, &situation);

        prop_assert!(taxable >= Decimal::ZERO);
        prop_assert!(taxable <= gross);
    }

    #[test]
    fn zero_simple_tax_aggregates_to_zero(
        canton in 0i64..400,
        share in 0i64..=100,
        municipal in 0i64..400,
        church in 0i64..50,
    ) {
        let multipliers = Multipliers {
            canton: Decimal::new(canton, 2),
            canton_share: Decimal::new(share, 2),
            municipal: Decimal::new(municipal, 2),
            church: Decimal::new(church, 2),
        };

        for method in [RoundingMethod::Centime, RoundingMethod::FiveCentimes, RoundingMethod::Franc] {
            let result = apply_multipliers(&SimpleTaxes::default(), &multipliers, method, method);
            prop_assert_eq!(result.total_tax, Decimal::ZERO);
        }
    }

    #[test]
    fn rounding_is_within_half_a_centime(c in -1_000_000_000i64..1_000_000_000) {
        let x = Decimal::new(c, 4);

        prop_assert!((round_half_up(x) - x).abs() <= Decimal::new(5, 3));
    }
}
