//! Production decision engine
//!
//! Compares sugar and ethanol profit per hectare for one set of conditions
//! using the closed-form formulas in [`crate::economics`]. No model is
//! involved; results are deterministic.

use serde::{Deserialize, Serialize};

use crate::economics::{
    self, round_to, ProductionConditions, Strategy, OPTIMAL_RAINFALL_MM, STRATEGY_THRESHOLD,
};
use crate::errors::{CoreError, Result};
use crate::predictor::Scenario;

/// Profit gap at which confidence saturates at 1.0
pub const CONFIDENCE_SATURATION: f64 = 2000.0;

/// Condition keys that have no default
pub const REQUIRED_CONDITIONS: [&str; 11] = [
    "cane_yield_tons_per_hectare",
    "sugar_content_brix",
    "avg_temp_plantation",
    "sugar_price_per_kg",
    "ethanol_price_per_liter",
    "fermentation_efficiency",
    "plantation_cost_per_hectare",
    "sugar_processing_cost_per_ton_cane",
    "ethanol_processing_cost_per_ton_cane",
    "bagasse_value_per_ton",
    "molasses_value_per_ton",
];

/// Recommendation and supporting figures for one hectare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub recommendation: Strategy,
    pub sugar_profit_per_hectare: f64,
    pub ethanol_profit_per_hectare: f64,
    /// `ethanol - sugar`
    pub profit_difference: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub sugar_production_tons: f64,
    pub ethanol_production_liters: f64,
    pub byproduct_revenue_sugar: f64,
    pub byproduct_revenue_ethanol: f64,
}

impl ProductionConditions {
    /// Build conditions from named inputs.
    ///
    /// Every key in [`REQUIRED_CONDITIONS`] must be present. `rainfall_mm`
    /// falls back to the optimum of 1200 mm; unknown keys are ignored.
    pub fn from_map(inputs: &Scenario) -> Result<Self> {
        let require = |key: &str| {
            inputs
                .get(key)
                .ok_or_else(|| CoreError::MissingCondition(key.to_string()))
        };

        let harvest_month = inputs
            .get("harvest_month")
            .filter(|m| m.fract() == 0.0 && (1.0..=12.0).contains(m))
            .map(|m| m as u8);

        Ok(Self {
            cane_yield_tons_per_hectare: require("cane_yield_tons_per_hectare")?,
            sugar_content_brix: require("sugar_content_brix")?,
            avg_temp_plantation: require("avg_temp_plantation")?,
            rainfall_mm: inputs.get("rainfall_mm").unwrap_or(OPTIMAL_RAINFALL_MM),
            sugar_price_per_kg: require("sugar_price_per_kg")?,
            ethanol_price_per_liter: require("ethanol_price_per_liter")?,
            fermentation_efficiency: require("fermentation_efficiency")?,
            plantation_cost_per_hectare: require("plantation_cost_per_hectare")?,
            sugar_processing_cost_per_ton_cane: require("sugar_processing_cost_per_ton_cane")?,
            ethanol_processing_cost_per_ton_cane: require("ethanol_processing_cost_per_ton_cane")?,
            bagasse_value_per_ton: require("bagasse_value_per_ton")?,
            molasses_value_per_ton: require("molasses_value_per_ton")?,
            ccs_quality: inputs.get("ccs_quality"),
            harvest_month,
        })
    }
}

/// Linear confidence ramp: 0 at no gap, 1 at a 2000-unit gap or more.
pub fn confidence(profit_difference: f64) -> f64 {
    (profit_difference.abs() / CONFIDENCE_SATURATION).min(1.0)
}

fn reasoning(strategy: Strategy, sugar: f64, ethanol: f64, difference: f64) -> String {
    let (winner, loser, winner_profit, loser_profit) = match strategy {
        Strategy::Ethanol => ("Ethanol", "sugar", ethanol, sugar),
        Strategy::Sugar => ("Sugar", "ethanol", sugar, ethanol),
        Strategy::Mixed => {
            return format!(
                "Sugar (${:.2}/ha) and ethanol (${:.2}/ha) are within ${:.0}/ha of each other \
                 (difference ${:.2}/ha); splitting cane between both products balances market risk.",
                sugar, ethanol, STRATEGY_THRESHOLD, difference
            )
        }
    };

    let margin = (winner_profit - loser_profit).abs();
    let relative = if loser_profit != 0.0 {
        format!(" ({:.1}% above {})", margin / loser_profit.abs() * 100.0, loser)
    } else {
        String::new()
    };

    format!(
        "{} production earns ${:.2}/ha more{}: {} ${:.2}/ha vs {} ${:.2}/ha.",
        winner,
        margin,
        relative,
        winner.to_lowercase(),
        winner_profit,
        loser,
        loser_profit
    )
}

/// Compare both production paths and recommend one.
pub fn recommend(conditions: &ProductionConditions) -> DecisionResult {
    let b = economics::evaluate(conditions);

    let sugar = round_to(b.sugar_profit, 2);
    let ethanol = round_to(b.ethanol_profit, 2);
    let difference = round_to(ethanol - sugar, 2);
    let strategy = Strategy::from_difference(difference);

    DecisionResult {
        recommendation: strategy,
        sugar_profit_per_hectare: sugar,
        ethanol_profit_per_hectare: ethanol,
        profit_difference: difference,
        confidence: round_to(confidence(difference), 2),
        reasoning: reasoning(strategy, sugar, ethanol, difference),
        sugar_production_tons: round_to(b.sugar_tons, 4),
        ethanol_production_liters: round_to(b.ethanol_liters, 4),
        byproduct_revenue_sugar: round_to(b.byproduct_revenue_sugar, 2),
        byproduct_revenue_ethanol: round_to(b.byproduct_revenue_ethanol, 2),
    }
}

/// Validate named inputs and recommend.
pub fn recommend_from_map(inputs: &Scenario) -> Result<DecisionResult> {
    let conditions = ProductionConditions::from_map(inputs)?;
    Ok(recommend(&conditions))
}
