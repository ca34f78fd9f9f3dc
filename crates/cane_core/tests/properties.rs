use cane_core::dataset::SyntheticGenerator;
use cane_core::decision::{confidence, recommend};
use cane_core::economics::{self, ProductionConditions};
use cane_core::features::{month_column, prepare};
use cane_core::predictor::align_to_schema;
use cane_core::{Scenario, SUGAR_TARGET};
use proptest::prelude::*;

fn conditions_strategy() -> impl Strategy<Value = ProductionConditions> {
    (
        (50.0..120.0f64, 10.0..18.0f64, 20.0..32.0f64, 600.0..2000.0f64),
        (0.35..0.65f64, 0.40..0.80f64, 0.85..0.95f64, 1800.0..2500.0f64),
        (35.0..55.0f64, 50.0..80.0f64, 15.0..35.0f64, 80.0..150.0f64),
    )
        .prop_map(
            |((yield_t, brix, temp, rain), (sp, ep, ferm, plant), (sc, ec, bag, mol))| {
                ProductionConditions {
                    cane_yield_tons_per_hectare: yield_t,
                    sugar_content_brix: brix,
                    avg_temp_plantation: temp,
                    rainfall_mm: rain,
                    sugar_price_per_kg: sp,
                    ethanol_price_per_liter: ep,
                    fermentation_efficiency: ferm,
                    plantation_cost_per_hectare: plant,
                    sugar_processing_cost_per_ton_cane: sc,
                    ethanol_processing_cost_per_ton_cane: ec,
                    bagasse_value_per_ton: bag,
                    molasses_value_per_ton: mol,
                    ccs_quality: None,
                    harvest_month: None,
                }
            },
        )
}

type Label = cane_core::Strategy;

#[test]
fn generated_labels_follow_threshold_rule() {
    let data = SyntheticGenerator::new(7).generate(2000).unwrap();
    for row in &data.rows {
        assert_eq!(row.optimal_strategy, Label::from_difference(row.profit_difference));
        assert!(
            (row.profit_difference
                - (row.ethanol_profit_per_hectare - row.sugar_profit_per_hectare))
                .abs()
                < 0.011
        );
    }
    let (sugar, ethanol, mixed) = data.strategy_counts();
    assert_eq!(sugar + ethanol + mixed, 2000);
    assert!(sugar > 0);
}

#[test]
fn generated_profits_stay_near_analytic_values() {
    let data = SyntheticGenerator::new(11).generate(500).unwrap();
    for row in &data.rows {
        let analytic = economics::evaluate(&row.conditions());
        let band = |exact: f64| 0.08 * exact.abs() + 0.01;
        assert!((row.sugar_profit_per_hectare - analytic.sugar_profit).abs() <= band(analytic.sugar_profit));
        assert!((row.ethanol_profit_per_hectare - analytic.ethanol_profit).abs() <= band(analytic.ethanol_profit));
    }
}

#[test]
fn sparse_scenario_aligns_to_prepared_schema() {
    let data = SyntheticGenerator::default().generate(30).unwrap();
    let prepared = prepare(&data.sugar_view().unwrap(), SUGAR_TARGET).unwrap();

    let scenario = Scenario::new()
        .with("sugar_price", 800.0)
        .with("ethanol_price", 0.45)
        .with("harvest_month", 9.0);
    let row = align_to_schema(&scenario, &prepared.columns);

    assert_eq!(row.len(), prepared.n_features());
    for (name, value) in prepared.columns.iter().zip(&row) {
        let expected = match name.as_str() {
            "sugar_price" => 800.0,
            n if n == month_column(9) => 1.0,
            _ => 0.0,
        };
        assert_eq!(*value, expected, "column {}", name);
    }
}

proptest! {
    #[test]
    fn recommendation_matches_difference(c in conditions_strategy()) {
        let result = recommend(&c);
        prop_assert_eq!(result.recommendation, Label::from_difference(result.profit_difference));
        prop_assert!((0.0..=1.0).contains(&result.confidence));
        prop_assert!(
            (result.profit_difference
                - (result.ethanol_profit_per_hectare - result.sugar_profit_per_hectare))
                .abs()
                < 0.011
        );
        match result.recommendation {
            Label::Sugar => prop_assert!(result.profit_difference < -500.0),
            Label::Ethanol => prop_assert!(result.profit_difference > 500.0),
            Label::Mixed => prop_assert!(result.profit_difference.abs() <= 500.0),
        }
    }

    #[test]
    fn confidence_is_clamped(d in -10_000.0..10_000.0f64) {
        let c = confidence(d);
        prop_assert!((0.0..=1.0).contains(&c));
        if d.abs() >= 2000.0 {
            prop_assert_eq!(c, 1.0);
        }
    }

    #[test]
    fn alignment_is_idempotent(price in 300.0..700.0f64, month in 1u8..=12) {
        let columns: Vec<String> = ["sugar_price", "bagasse_value"]
            .iter()
            .map(|s| s.to_string())
            .chain((1..=12).map(month_column))
            .collect();
        let scenario = Scenario::new()
            .with("sugar_price", price)
            .with("harvest_month", f64::from(month));

        let once = align_to_schema(&scenario, &columns);
        let realigned: Scenario = columns.iter().cloned().zip(once.iter().copied()).collect();
        let twice = align_to_schema(&realigned.with("harvest_month", f64::from(month)), &columns);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn rows_are_independent_of_sample_count(seed in 0u64..1000, n in 1usize..40) {
        let generator = SyntheticGenerator::new(seed);
        let data = generator.generate(n).unwrap();
        prop_assert_eq!(&data.rows[n - 1], &generator.sample_row(n - 1));
    }
}
