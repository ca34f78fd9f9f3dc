//! Single-scenario prediction against a persisted artifact
//!
//! A [`Predictor`] owns at most one cached [`ModelArtifact`], loaded lazily on
//! first use. Scenario inputs are aligned to the stored schema by name:
//! columns the scenario does not supply are filled with zero and extra
//! scenario fields are ignored. This keeps inference working across schema
//! drift at the cost of silently degraded predictions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::artifact::ModelArtifact;
use crate::dataset::{SampleRow, HARVEST_MONTH};
use crate::economics::round_to;
use crate::errors::{CoreError, Result};
use crate::features::{month_column, month_indicators};

/// Default artifact location
pub const DEFAULT_MODEL_PATH: &str = "models/sugar_profit_random_forest.json";

/// Named numeric inputs for one prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    values: BTreeMap<String, f64>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sugar-view inputs of a generated row
    pub fn sugar_from_row(row: &SampleRow) -> Self {
        Scenario::new()
            .with("sugar_price", round_to(row.sugar_price_per_kg * 1000.0, 2))
            .with("molasses_value", row.molasses_value_per_ton)
            .with("bagasse_value", row.bagasse_value_per_ton)
            .with("avg_temp_plantation", row.avg_temp_plantation)
            .with("rainfall_mm", row.rainfall_mm)
            .with("ccs_quality", row.ccs_quality)
            .with("sugar_content_brix", row.sugar_content_brix)
            .with("cane_yield_tons_per_hectare", row.cane_yield_tons_per_hectare)
            .with("plantation_cost_per_hectare", row.plantation_cost_per_hectare)
            .with("sugar_processing_cost", row.sugar_processing_cost_per_ton_cane)
            .with(HARVEST_MONTH, f64::from(row.harvest_month))
    }

    /// Ethanol-view inputs of a generated row
    pub fn ethanol_from_row(row: &SampleRow) -> Self {
        Scenario::new()
            .with("ethanol_price", row.ethanol_price_per_liter)
            .with("crude_oil_price", row.crude_oil_price)
            .with("gasoline_price", row.gasoline_price)
            .with("fermentation_efficiency", row.fermentation_efficiency)
            .with("bagasse_value", row.bagasse_value_per_ton)
            .with("avg_temp_plantation", row.avg_temp_plantation)
            .with("rainfall_mm", row.rainfall_mm)
            .with("ccs_quality", row.ccs_quality)
            .with("sugar_content_brix", row.sugar_content_brix)
            .with("cane_yield_tons_per_hectare", row.cane_yield_tons_per_hectare)
            .with("plantation_cost_per_hectare", row.plantation_cost_per_hectare)
            .with("ethanol_processing_cost", row.ethanol_processing_cost_per_ton_cane)
            .with(HARVEST_MONTH, f64::from(row.harvest_month))
    }
}

impl FromIterator<(String, f64)> for Scenario {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, f64>> for Scenario {
    fn from(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }
}

/// Align a scenario onto an ordered schema.
///
/// Every `month_N` column starts at zero and the one matching
/// `harvest_month` is set; all other schema columns take the scenario value
/// or zero when absent.
pub fn align_to_schema(scenario: &Scenario, columns: &[String]) -> Vec<f64> {
    let mut expanded: BTreeMap<String, f64> = scenario
        .iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    let indicators = month_indicators(scenario.get(HARVEST_MONTH).unwrap_or(0.0));
    for (i, value) in indicators.iter().enumerate() {
        expanded.insert(month_column(i + 1), *value);
    }

    columns
        .iter()
        .map(|c| expanded.get(c).copied().unwrap_or(0.0))
        .collect()
}

/// Lazily-loading model wrapper
#[derive(Debug)]
pub struct Predictor {
    model_path: PathBuf,
    artifact: Option<ModelArtifact>,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

impl Predictor {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            artifact: None,
        }
    }

    /// Wrap an artifact that is already in memory.
    pub fn from_artifact<P: Into<PathBuf>>(model_path: P, artifact: ModelArtifact) -> Self {
        Self {
            model_path: model_path.into(),
            artifact: Some(artifact),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    /// (Re)load the artifact from disk.
    ///
    /// The cached artifact is replaced only when loading succeeds.
    #[instrument(skip(self), fields(path = %self.model_path.display()))]
    pub fn load(&mut self) -> Result<&ModelArtifact> {
        let artifact = ModelArtifact::load(&self.model_path)?;
        Ok(self.artifact.insert(artifact))
    }

    /// Cached artifact, loading it on first use.
    pub fn artifact(&mut self) -> Result<&ModelArtifact> {
        match self.artifact {
            Some(ref artifact) => Ok(artifact),
            None => self.load(),
        }
    }

    pub fn feature_columns(&mut self) -> Result<&[String]> {
        Ok(self.artifact()?.columns.as_slice())
    }

    /// Predict the target for one scenario.
    pub fn predict(&mut self, scenario: &Scenario) -> Result<f64> {
        let artifact = self.artifact()?;
        let row = align_to_schema(scenario, &artifact.columns);

        let ignored = scenario
            .iter()
            .filter(|(k, _)| *k != HARVEST_MONTH && !artifact.columns.iter().any(|c| c == k))
            .count();
        if ignored > 0 {
            debug!(ignored, "Scenario fields not in model schema were dropped");
        }

        let prediction = artifact.model.predict(&row);
        if !prediction.is_finite() {
            warn!(prediction, "Model produced a non-finite prediction");
            return Err(CoreError::Integrity(format!(
                "non-finite prediction {} from {}",
                prediction,
                self.model_path.display()
            )));
        }
        Ok(prediction)
    }

    /// Predict several scenarios with the same artifact.
    pub fn predict_batch(&mut self, scenarios: &[Scenario]) -> Result<Vec<f64>> {
        scenarios.iter().map(|s| self.predict(s)).collect()
    }
}
