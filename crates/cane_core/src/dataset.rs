//! Synthetic harvest dataset generation
//!
//! Produces one unified table of plantation, market and processing
//! attributes per simulated harvest. Every row is drawn from its own RNG,
//! seeded from `(seed, row_index)`, so a row never depends on its neighbours
//! or on the requested sample count. The sugar-only and ethanol-only views
//! used for training are narrowed projections of this table.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::deterministic::row_seed;
use crate::economics::{self, round_to, ProductionConditions, Strategy};
use crate::errors::{CoreError, Result};
use crate::frame::Frame;

/// Default base seed for generation
pub const DEFAULT_SEED: u64 = 42;
/// Largest sample count accepted by the generator
pub const MAX_SAMPLES: usize = 1_000_000;

pub const SUGAR_TARGET: &str = "sugar_profit_per_hectare";
pub const ETHANOL_TARGET: &str = "ethanol_profit_per_hectare";
pub const HARVEST_MONTH: &str = "harvest_month";
pub const HARVEST_DATE: &str = "harvest_date";

/// One simulated harvest record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    // Shared plantation conditions
    pub cane_yield_tons_per_hectare: f64,
    pub sugar_content_brix: f64,
    pub ccs_quality: f64,
    pub avg_temp_plantation: f64,
    pub rainfall_mm: f64,
    pub harvest_month: u8,
    pub plantation_cost_per_hectare: f64,

    // Market
    pub sugar_price_per_kg: f64,
    pub ethanol_price_per_liter: f64,
    pub crude_oil_price: f64,
    pub gasoline_price: f64,
    pub bagasse_value_per_ton: f64,
    pub molasses_value_per_ton: f64,

    // Processing
    pub sugar_processing_cost_per_ton_cane: f64,
    pub ethanol_processing_cost_per_ton_cane: f64,
    pub fermentation_efficiency: f64,

    // Derived
    pub sugar_tons_per_hectare: f64,
    pub ethanol_liters_per_hectare: f64,
    pub bagasse_tons_per_hectare: f64,
    pub molasses_tons_per_hectare: f64,
    pub byproduct_revenue_sugar: f64,
    pub byproduct_revenue_ethanol: f64,
    pub weather_penalty: f64,
    pub sugar_profit_per_hectare: f64,
    pub ethanol_profit_per_hectare: f64,
    pub profit_difference: f64,
    pub optimal_strategy: Strategy,
}

impl SampleRow {
    /// Inputs of this row as decision-engine conditions
    pub fn conditions(&self) -> ProductionConditions {
        ProductionConditions {
            cane_yield_tons_per_hectare: self.cane_yield_tons_per_hectare,
            sugar_content_brix: self.sugar_content_brix,
            avg_temp_plantation: self.avg_temp_plantation,
            rainfall_mm: self.rainfall_mm,
            sugar_price_per_kg: self.sugar_price_per_kg,
            ethanol_price_per_liter: self.ethanol_price_per_liter,
            fermentation_efficiency: self.fermentation_efficiency,
            plantation_cost_per_hectare: self.plantation_cost_per_hectare,
            sugar_processing_cost_per_ton_cane: self.sugar_processing_cost_per_ton_cane,
            ethanol_processing_cost_per_ton_cane: self.ethanol_processing_cost_per_ton_cane,
            bagasse_value_per_ton: self.bagasse_value_per_ton,
            molasses_value_per_ton: self.molasses_value_per_ton,
            ccs_quality: Some(self.ccs_quality),
            harvest_month: Some(self.harvest_month),
        }
    }
}

/// Which projection of the unified table to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetView {
    Unified,
    Sugar,
    Ethanol,
}

/// Draw from Normal(mean, std_dev) using the Box-Muller transform.
fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // gen::<f64>() is in [0, 1); shift to (0, 1] so ln() stays finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Seeded generator for unified harvest datasets
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    seed: u64,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SyntheticGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate `num_samples` independent rows.
    pub fn generate(&self, num_samples: usize) -> Result<UnifiedDataset> {
        if num_samples == 0 {
            return Err(CoreError::DataGeneration(
                "num_samples must be at least 1".to_string(),
            ));
        }
        if num_samples > MAX_SAMPLES {
            return Err(CoreError::DataGeneration(format!(
                "num_samples {} exceeds maximum of {}",
                num_samples, MAX_SAMPLES
            )));
        }

        debug!(seed = self.seed, num_samples, "Generating synthetic harvest data");
        let rows = (0..num_samples).map(|i| self.sample_row(i)).collect();
        Ok(UnifiedDataset { rows })
    }

    /// Draw row `index`; a pure function of `(seed, index)`.
    pub fn sample_row(&self, index: usize) -> SampleRow {
        let mut rng = StdRng::seed_from_u64(row_seed(self.seed, index));

        let cane_yield = round_to(sample_normal(&mut rng, 80.0, 10.0).clamp(50.0, 120.0), 2);
        let brix = round_to(sample_normal(&mut rng, 14.0, 1.5).clamp(10.0, 18.0), 2);
        let ccs = round_to(sample_normal(&mut rng, 11.5, 1.0).clamp(9.0, 14.0), 2);
        let temp = round_to(sample_normal(&mut rng, 26.0, 2.0), 2);
        let rainfall = round_to(sample_normal(&mut rng, 1200.0, 200.0).clamp(600.0, 2000.0), 2);
        let month: u8 = rng.gen_range(1..=12);
        let plantation_cost = round_to(rng.gen_range(1800.0..2500.0), 2);

        let sugar_price = round_to(rng.gen_range(0.35..0.65), 2);
        let ethanol_price = round_to(rng.gen_range(0.40..0.80), 2);
        let crude_oil = round_to(rng.gen_range(60.0..100.0), 2);
        let gasoline = round_to(rng.gen_range(2.0..3.5), 2);
        let bagasse_value = round_to(rng.gen_range(15.0..35.0), 2);
        let molasses_value = round_to(rng.gen_range(80.0..150.0), 2);

        let sugar_cost = round_to(rng.gen_range(35.0..55.0), 2);
        let ethanol_cost = round_to(rng.gen_range(50.0..80.0), 2);
        let fermentation = round_to(rng.gen_range(0.85..0.95), 3);

        let sugar_jitter = sample_normal(&mut rng, 1.0, 0.05).clamp(0.92, 1.08);
        let ethanol_jitter = sample_normal(&mut rng, 1.0, 0.05).clamp(0.92, 1.08);

        let conditions = ProductionConditions {
            cane_yield_tons_per_hectare: cane_yield,
            sugar_content_brix: brix,
            avg_temp_plantation: temp,
            rainfall_mm: rainfall,
            sugar_price_per_kg: sugar_price,
            ethanol_price_per_liter: ethanol_price,
            fermentation_efficiency: fermentation,
            plantation_cost_per_hectare: plantation_cost,
            sugar_processing_cost_per_ton_cane: sugar_cost,
            ethanol_processing_cost_per_ton_cane: ethanol_cost,
            bagasse_value_per_ton: bagasse_value,
            molasses_value_per_ton: molasses_value,
            ccs_quality: Some(ccs),
            harvest_month: Some(month),
        };
        let b = economics::evaluate(&conditions);

        let sugar_profit = round_to(b.sugar_profit * sugar_jitter, 2);
        let ethanol_profit = round_to(b.ethanol_profit * ethanol_jitter, 2);
        let profit_difference = round_to(ethanol_profit - sugar_profit, 2);

        SampleRow {
            cane_yield_tons_per_hectare: cane_yield,
            sugar_content_brix: brix,
            ccs_quality: ccs,
            avg_temp_plantation: temp,
            rainfall_mm: rainfall,
            harvest_month: month,
            plantation_cost_per_hectare: plantation_cost,
            sugar_price_per_kg: sugar_price,
            ethanol_price_per_liter: ethanol_price,
            crude_oil_price: crude_oil,
            gasoline_price: gasoline,
            bagasse_value_per_ton: bagasse_value,
            molasses_value_per_ton: molasses_value,
            sugar_processing_cost_per_ton_cane: sugar_cost,
            ethanol_processing_cost_per_ton_cane: ethanol_cost,
            fermentation_efficiency: fermentation,
            sugar_tons_per_hectare: round_to(b.sugar_tons, 2),
            ethanol_liters_per_hectare: round_to(b.ethanol_liters, 2),
            bagasse_tons_per_hectare: round_to(b.bagasse_tons, 2),
            molasses_tons_per_hectare: round_to(b.molasses_tons, 2),
            byproduct_revenue_sugar: round_to(b.byproduct_revenue_sugar, 2),
            byproduct_revenue_ethanol: round_to(b.byproduct_revenue_ethanol, 2),
            weather_penalty: round_to(b.weather_penalty, 2),
            sugar_profit_per_hectare: sugar_profit,
            ethanol_profit_per_hectare: ethanol_profit,
            profit_difference,
            optimal_strategy: Strategy::from_difference(profit_difference),
        }
    }
}

/// Generate a unified dataset with the default seed.
pub fn generate(num_samples: usize) -> Result<UnifiedDataset> {
    SyntheticGenerator::default().generate(num_samples)
}

/// Unified per-sample table from which all training views derive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDataset {
    pub rows: Vec<SampleRow>,
}

impl UnifiedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count of rows labelled `(sugar, ethanol, mixed)`
    pub fn strategy_counts(&self) -> (usize, usize, usize) {
        self.rows
            .iter()
            .fold((0, 0, 0), |(s, e, m), row| match row.optimal_strategy {
                Strategy::Sugar => (s + 1, e, m),
                Strategy::Ethanol => (s, e + 1, m),
                Strategy::Mixed => (s, e, m + 1),
            })
    }

    /// Select a projection by name.
    pub fn view(&self, view: DatasetView) -> Result<Frame> {
        match view {
            DatasetView::Unified => self.to_frame(),
            DatasetView::Sugar => self.sugar_view(),
            DatasetView::Ethanol => self.ethanol_view(),
        }
    }

    /// All numeric columns of the unified table.
    pub fn to_frame(&self) -> Result<Frame> {
        let r = &self.rows;
        Frame::new()
            .with_column("cane_yield_tons_per_hectare", collect(r, |x| x.cane_yield_tons_per_hectare))?
            .with_column("sugar_content_brix", collect(r, |x| x.sugar_content_brix))?
            .with_column("ccs_quality", collect(r, |x| x.ccs_quality))?
            .with_column("avg_temp_plantation", collect(r, |x| x.avg_temp_plantation))?
            .with_column("rainfall_mm", collect(r, |x| x.rainfall_mm))?
            .with_column(HARVEST_MONTH, collect(r, |x| f64::from(x.harvest_month)))?
            .with_column("plantation_cost_per_hectare", collect(r, |x| x.plantation_cost_per_hectare))?
            .with_column("sugar_price_per_kg", collect(r, |x| x.sugar_price_per_kg))?
            .with_column("ethanol_price_per_liter", collect(r, |x| x.ethanol_price_per_liter))?
            .with_column("crude_oil_price", collect(r, |x| x.crude_oil_price))?
            .with_column("gasoline_price", collect(r, |x| x.gasoline_price))?
            .with_column("bagasse_value_per_ton", collect(r, |x| x.bagasse_value_per_ton))?
            .with_column("molasses_value_per_ton", collect(r, |x| x.molasses_value_per_ton))?
            .with_column(
                "sugar_processing_cost_per_ton_cane",
                collect(r, |x| x.sugar_processing_cost_per_ton_cane),
            )?
            .with_column(
                "ethanol_processing_cost_per_ton_cane",
                collect(r, |x| x.ethanol_processing_cost_per_ton_cane),
            )?
            .with_column("fermentation_efficiency", collect(r, |x| x.fermentation_efficiency))?
            .with_column("sugar_tons_per_hectare", collect(r, |x| x.sugar_tons_per_hectare))?
            .with_column("ethanol_liters_per_hectare", collect(r, |x| x.ethanol_liters_per_hectare))?
            .with_column("bagasse_tons_per_hectare", collect(r, |x| x.bagasse_tons_per_hectare))?
            .with_column("molasses_tons_per_hectare", collect(r, |x| x.molasses_tons_per_hectare))?
            .with_column("byproduct_revenue_sugar", collect(r, |x| x.byproduct_revenue_sugar))?
            .with_column("byproduct_revenue_ethanol", collect(r, |x| x.byproduct_revenue_ethanol))?
            .with_column("weather_penalty", collect(r, |x| x.weather_penalty))?
            .with_column(SUGAR_TARGET, collect(r, |x| x.sugar_profit_per_hectare))?
            .with_column(ETHANOL_TARGET, collect(r, |x| x.ethanol_profit_per_hectare))?
            .with_column("profit_difference", collect(r, |x| x.profit_difference))
    }

    /// Sugar-path projection; `sugar_price` is expressed per ton.
    pub fn sugar_view(&self) -> Result<Frame> {
        let r = &self.rows;
        Frame::new()
            .with_column("sugar_price", collect(r, |x| round_to(x.sugar_price_per_kg * 1000.0, 2)))?
            .with_column("molasses_value", collect(r, |x| x.molasses_value_per_ton))?
            .with_column("bagasse_value", collect(r, |x| x.bagasse_value_per_ton))?
            .with_column("avg_temp_plantation", collect(r, |x| x.avg_temp_plantation))?
            .with_column("rainfall_mm", collect(r, |x| x.rainfall_mm))?
            .with_column("ccs_quality", collect(r, |x| x.ccs_quality))?
            .with_column("sugar_content_brix", collect(r, |x| x.sugar_content_brix))?
            .with_column("cane_yield_tons_per_hectare", collect(r, |x| x.cane_yield_tons_per_hectare))?
            .with_column("plantation_cost_per_hectare", collect(r, |x| x.plantation_cost_per_hectare))?
            .with_column("sugar_processing_cost", collect(r, |x| x.sugar_processing_cost_per_ton_cane))?
            .with_column(HARVEST_MONTH, collect(r, |x| f64::from(x.harvest_month)))?
            .with_column("sugar_tons_per_hectare", collect(r, |x| x.sugar_tons_per_hectare))?
            .with_column("weather_penalty", collect(r, |x| x.weather_penalty))?
            .with_column(SUGAR_TARGET, collect(r, |x| x.sugar_profit_per_hectare))
    }

    /// Ethanol-path projection.
    pub fn ethanol_view(&self) -> Result<Frame> {
        let r = &self.rows;
        Frame::new()
            .with_column("ethanol_price", collect(r, |x| x.ethanol_price_per_liter))?
            .with_column("crude_oil_price", collect(r, |x| x.crude_oil_price))?
            .with_column("gasoline_price", collect(r, |x| x.gasoline_price))?
            .with_column("fermentation_efficiency", collect(r, |x| x.fermentation_efficiency))?
            .with_column("bagasse_value", collect(r, |x| x.bagasse_value_per_ton))?
            .with_column("avg_temp_plantation", collect(r, |x| x.avg_temp_plantation))?
            .with_column("rainfall_mm", collect(r, |x| x.rainfall_mm))?
            .with_column("ccs_quality", collect(r, |x| x.ccs_quality))?
            .with_column("sugar_content_brix", collect(r, |x| x.sugar_content_brix))?
            .with_column("cane_yield_tons_per_hectare", collect(r, |x| x.cane_yield_tons_per_hectare))?
            .with_column("plantation_cost_per_hectare", collect(r, |x| x.plantation_cost_per_hectare))?
            .with_column("ethanol_processing_cost", collect(r, |x| x.ethanol_processing_cost_per_ton_cane))?
            .with_column(HARVEST_MONTH, collect(r, |x| f64::from(x.harvest_month)))?
            .with_column("ethanol_liters_per_hectare", collect(r, |x| x.ethanol_liters_per_hectare))?
            .with_column("weather_penalty", collect(r, |x| x.weather_penalty))?
            .with_column(ETHANOL_TARGET, collect(r, |x| x.ethanol_profit_per_hectare))
    }

    /// Write the unified table, including the strategy label, as CSV.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        let frame = self.to_frame()?;
        let mut header = frame.names().join(",");
        header.push_str(",optimal_strategy");
        writeln!(writer, "{}", header)?;
        for (i, row) in self.rows.iter().enumerate() {
            let values: Vec<String> = frame.row(i).iter().map(f64::to_string).collect();
            writeln!(writer, "{},{}", values.join(","), row.optimal_strategy)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the CSV export to a file, creating parent directories.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

fn collect(rows: &[SampleRow], f: impl Fn(&SampleRow) -> f64) -> Vec<f64> {
    rows.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_reproducible() {
        let a = generate(50).unwrap();
        let b = generate(50).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = SyntheticGenerator::new(1).generate(10).unwrap();
        let b = SyntheticGenerator::new(2).generate(10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rows_are_prefix_stable() {
        let small = generate(10).unwrap();
        let large = generate(40).unwrap();
        assert_eq!(small.rows[..], large.rows[..10]);
    }

    #[test]
    fn test_rejects_invalid_sample_counts() {
        assert!(matches!(generate(0), Err(CoreError::DataGeneration(_))));
        assert!(matches!(
            generate(MAX_SAMPLES + 1),
            Err(CoreError::DataGeneration(_))
        ));
    }

    #[test]
    fn test_fields_within_bounds() {
        let data = generate(500).unwrap();
        for row in &data.rows {
            assert!((1..=12).contains(&row.harvest_month));
            assert!((50.0..=120.0).contains(&row.cane_yield_tons_per_hectare));
            assert!((10.0..=18.0).contains(&row.sugar_content_brix));
            assert!((9.0..=14.0).contains(&row.ccs_quality));
            assert!((600.0..=2000.0).contains(&row.rainfall_mm));
            assert!((0.85..=0.95).contains(&row.fermentation_efficiency));
            assert!((0.35..=0.65).contains(&row.sugar_price_per_kg));
            assert!(row.weather_penalty >= 0.0 && row.weather_penalty <= 25.0);
        }
    }

    #[test]
    fn test_strategy_matches_threshold_rule() {
        let data = generate(1000).unwrap();
        for row in &data.rows {
            assert_eq!(
                row.optimal_strategy,
                Strategy::from_difference(row.profit_difference)
            );
            let diff = round_to(row.ethanol_profit_per_hectare - row.sugar_profit_per_hectare, 2);
            assert!((row.profit_difference - diff).abs() < 1e-9);
        }
    }

    #[test]
    fn test_profits_follow_own_fields() {
        let data = generate(300).unwrap();
        for row in &data.rows {
            let b = economics::evaluate(&row.conditions());
            // jitter is bounded to ±8%, plus rounding slack
            let sugar_band = b.sugar_profit.abs() * 0.08 + 0.01;
            let ethanol_band = b.ethanol_profit.abs() * 0.08 + 0.01;
            assert!((row.sugar_profit_per_hectare - b.sugar_profit).abs() <= sugar_band);
            assert!((row.ethanol_profit_per_hectare - b.ethanol_profit).abs() <= ethanol_band);
        }
    }

    #[test]
    fn test_views_have_expected_columns() {
        let data = generate(5).unwrap();
        let sugar = data.sugar_view().unwrap();
        assert!(sugar.contains("sugar_price"));
        assert!(sugar.contains(SUGAR_TARGET));
        assert!(!sugar.contains(ETHANOL_TARGET));
        assert_eq!(sugar.n_rows(), 5);

        let prices = sugar.column("sugar_price").unwrap();
        for (price, row) in prices.iter().zip(&data.rows) {
            assert!((price - row.sugar_price_per_kg * 1000.0).abs() < 1e-6);
        }

        let ethanol = data.ethanol_view().unwrap();
        assert!(ethanol.contains("crude_oil_price"));
        assert!(ethanol.contains(ETHANOL_TARGET));
        assert!(!ethanol.contains(SUGAR_TARGET));

        let unified = data.to_frame().unwrap();
        assert_eq!(unified.n_columns(), 26);
    }

    #[test]
    fn test_write_csv_includes_label() {
        let data = generate(3).unwrap();
        let mut buf = Vec::new();
        data.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("optimal_strategy"));
    }
}
