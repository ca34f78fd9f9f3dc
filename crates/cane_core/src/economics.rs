//! Closed-form physical and economic model of a cane harvest
//!
//! The synthetic generator labels rows with these formulas and the decision
//! engine evaluates them directly, so both paths share one raw-material model:
//! the same cane yield, brix, temperature and rainfall feed both products.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of sucrose recovered as crystal sugar
pub const EXTRACTION_EFFICIENCY: f64 = 0.85;
/// Liters of ethanol per ton of fermentable sugar
pub const ETHANOL_LITERS_PER_TON_SUGAR: f64 = 650.0;
/// Tons of bagasse per ton of cane
pub const BAGASSE_PER_TON_CANE: f64 = 0.28;
/// Tons of molasses per ton of cane (sugar path only)
pub const MOLASSES_PER_TON_CANE: f64 = 0.04;
/// Temperature with no weather penalty (°C)
pub const OPTIMAL_TEMPERATURE: f64 = 26.0;
/// Rainfall with no weather penalty (mm)
pub const OPTIMAL_RAINFALL_MM: f64 = 1200.0;
/// Profit gap per hectare beyond which one product is preferred
pub const STRATEGY_THRESHOLD: f64 = 500.0;

/// Production strategy label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Sugar,
    Ethanol,
    Mixed,
}

impl Strategy {
    /// Classify a signed `ethanol - sugar` profit difference.
    pub fn from_difference(profit_difference: f64) -> Self {
        if profit_difference > STRATEGY_THRESHOLD {
            Strategy::Ethanol
        } else if profit_difference < -STRATEGY_THRESHOLD {
            Strategy::Sugar
        } else {
            Strategy::Mixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sugar => "sugar",
            Strategy::Ethanol => "ethanol",
            Strategy::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plantation, market and processing inputs for one hectare of cane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionConditions {
    pub cane_yield_tons_per_hectare: f64,
    pub sugar_content_brix: f64,
    pub avg_temp_plantation: f64,
    #[serde(default = "default_rainfall")]
    pub rainfall_mm: f64,
    pub sugar_price_per_kg: f64,
    pub ethanol_price_per_liter: f64,
    pub fermentation_efficiency: f64,
    pub plantation_cost_per_hectare: f64,
    pub sugar_processing_cost_per_ton_cane: f64,
    pub ethanol_processing_cost_per_ton_cane: f64,
    pub bagasse_value_per_ton: f64,
    pub molasses_value_per_ton: f64,
    /// Informational; not used by the profit formulas
    #[serde(default)]
    pub ccs_quality: Option<f64>,
    /// Informational; not used by the profit formulas
    #[serde(default)]
    pub harvest_month: Option<u8>,
}

fn default_rainfall() -> f64 {
    OPTIMAL_RAINFALL_MM
}

/// Per-hectare production and profit figures for both products
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitBreakdown {
    pub sugar_tons: f64,
    pub ethanol_liters: f64,
    pub bagasse_tons: f64,
    pub molasses_tons: f64,
    pub sugar_revenue: f64,
    pub ethanol_revenue: f64,
    pub byproduct_revenue_sugar: f64,
    pub byproduct_revenue_ethanol: f64,
    pub sugar_processing_cost: f64,
    pub ethanol_processing_cost: f64,
    pub weather_penalty: f64,
    pub sugar_profit: f64,
    pub ethanol_profit: f64,
}

impl ProfitBreakdown {
    /// Signed `ethanol - sugar` profit gap
    pub fn profit_difference(&self) -> f64 {
        self.ethanol_profit - self.sugar_profit
    }
}

/// Combined temperature and rainfall penalty per hectare.
///
/// Temperature contributes up to 15 and rainfall up to 10 currency units.
pub fn weather_penalty(avg_temp: f64, rainfall_mm: f64) -> f64 {
    let temp = ((avg_temp - OPTIMAL_TEMPERATURE).abs() * 2.0).clamp(0.0, 15.0);
    let rain = ((rainfall_mm - OPTIMAL_RAINFALL_MM).abs() * 0.01).clamp(0.0, 10.0);
    temp + rain
}

/// Evaluate both production paths for the given conditions.
pub fn evaluate(c: &ProductionConditions) -> ProfitBreakdown {
    let sugar_fraction = c.sugar_content_brix / 100.0;

    let sugar_tons = c.cane_yield_tons_per_hectare * sugar_fraction * EXTRACTION_EFFICIENCY;
    let ethanol_liters = c.cane_yield_tons_per_hectare
        * sugar_fraction
        * c.fermentation_efficiency
        * ETHANOL_LITERS_PER_TON_SUGAR;
    let bagasse_tons = c.cane_yield_tons_per_hectare * BAGASSE_PER_TON_CANE;
    let molasses_tons = c.cane_yield_tons_per_hectare * MOLASSES_PER_TON_CANE;

    let sugar_revenue = sugar_tons * 1000.0 * c.sugar_price_per_kg;
    let ethanol_revenue = ethanol_liters * c.ethanol_price_per_liter;
    let bagasse_revenue = bagasse_tons * c.bagasse_value_per_ton;
    let byproduct_revenue_sugar = bagasse_revenue + molasses_tons * c.molasses_value_per_ton;
    let byproduct_revenue_ethanol = bagasse_revenue;

    let sugar_processing_cost =
        c.cane_yield_tons_per_hectare * c.sugar_processing_cost_per_ton_cane;
    let ethanol_processing_cost =
        c.cane_yield_tons_per_hectare * c.ethanol_processing_cost_per_ton_cane;

    let penalty = weather_penalty(c.avg_temp_plantation, c.rainfall_mm);

    let sugar_profit = sugar_revenue + byproduct_revenue_sugar
        - sugar_processing_cost
        - c.plantation_cost_per_hectare
        - penalty;
    let ethanol_profit = ethanol_revenue + byproduct_revenue_ethanol
        - ethanol_processing_cost
        - c.plantation_cost_per_hectare
        - penalty;

    ProfitBreakdown {
        sugar_tons,
        ethanol_liters,
        bagasse_tons,
        molasses_tons,
        sugar_revenue,
        ethanol_revenue,
        byproduct_revenue_sugar,
        byproduct_revenue_ethanol,
        sugar_processing_cost,
        ethanol_processing_cost,
        weather_penalty: penalty,
        sugar_profit,
        ethanol_profit,
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
pub(crate) fn reference_conditions() -> ProductionConditions {
    ProductionConditions {
        cane_yield_tons_per_hectare: 80.0,
        sugar_content_brix: 14.0,
        avg_temp_plantation: 26.0,
        rainfall_mm: 1200.0,
        sugar_price_per_kg: 0.60,
        ethanol_price_per_liter: 0.60,
        fermentation_efficiency: 0.90,
        plantation_cost_per_hectare: 2000.0,
        sugar_processing_cost_per_ton_cane: 45.0,
        ethanol_processing_cost_per_ton_cane: 65.0,
        bagasse_value_per_ton: 25.0,
        molasses_value_per_ton: 100.0,
        ccs_quality: Some(11.5),
        harvest_month: Some(7),
    }
}
