//! Configuration for generation, training and model storage
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `CANE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::dataset::{DEFAULT_SEED, MAX_SAMPLES};
use crate::errors::{CoreError, Result};
use crate::model::ModelKind;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaneConfig {
    pub paths: PathsConfig,
    pub generator: GeneratorConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `<target>_<kind>.json` artifacts
    pub model_dir: PathBuf,
}

/// Synthetic dataset settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub num_samples: usize,
}

/// Default hyperparameters for the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_kind: ModelKind,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features considered per split
    pub max_features: f64,
    pub learning_rate: f64,
    pub ridge_lambda: f64,
    pub max_bins: usize,
    pub test_ratio: f64,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `cane_trainer=debug`
    pub level: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            num_samples: 5000,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_kind: ModelKind::RandomForest,
            n_estimators: 100,
            max_depth: 10,
            min_samples_leaf: 1,
            max_features: 1.0,
            learning_rate: 0.1,
            ridge_lambda: 1e-6,
            max_bins: 64,
            test_ratio: 0.2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{} has invalid value `{}`", key, raw)))
}

impl CaneConfig {
    /// Parse a TOML document; missing sections and fields keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from: {}", path.display());
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Defaults, then `path` if given, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CANE_*` overrides read through `lookup`.
    ///
    /// Returns the dotted names of the settings that were overridden.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(val) = lookup("CANE_MODEL_DIR") {
            self.paths.model_dir = PathBuf::from(val);
            applied.push("paths.model_dir".to_string());
        }
        if let Some(val) = lookup("CANE_SEED") {
            self.generator.seed = parse_env("CANE_SEED", &val)?;
            applied.push("generator.seed".to_string());
        }
        if let Some(val) = lookup("CANE_NUM_SAMPLES") {
            self.generator.num_samples = parse_env("CANE_NUM_SAMPLES", &val)?;
            applied.push("generator.num_samples".to_string());
        }
        if let Some(val) = lookup("CANE_N_ESTIMATORS") {
            self.training.n_estimators = parse_env("CANE_N_ESTIMATORS", &val)?;
            applied.push("training.n_estimators".to_string());
        }
        if let Some(val) = lookup("CANE_MAX_DEPTH") {
            self.training.max_depth = parse_env("CANE_MAX_DEPTH", &val)?;
            applied.push("training.max_depth".to_string());
        }
        if let Some(val) = lookup("CANE_LOG_LEVEL") {
            self.logging.level = val;
            applied.push("logging.level".to_string());
        }

        if !applied.is_empty() {
            info!(?applied, "Environment configuration overrides applied");
        }
        Ok(applied)
    }

    /// Artifact path for a target stem and model kind.
    pub fn model_path(&self, target_stem: &str, kind: ModelKind) -> PathBuf {
        self.paths
            .model_dir
            .join(format!("{}_{}.json", target_stem, kind))
    }

    /// Check settings that would make training misbehave.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.generator.num_samples < 5 {
            warnings.push("num_samples below 5, training will be rejected".to_string());
        }
        if self.generator.num_samples > MAX_SAMPLES {
            warnings.push(format!("num_samples exceeds maximum of {}", MAX_SAMPLES));
        }
        if self.training.n_estimators == 0 {
            warnings.push("n_estimators is 0, ensembles will be empty".to_string());
        }
        if self.training.max_depth == 0 {
            warnings.push("max_depth is 0, trees will be single leaves".to_string());
        }
        if self.training.min_samples_leaf == 0 {
            warnings.push("min_samples_leaf should be at least 1".to_string());
        }
        if !(self.training.max_features > 0.0 && self.training.max_features <= 1.0) {
            warnings.push("max_features should be in (0, 1]".to_string());
        }
        if self.training.learning_rate <= 0.0 {
            warnings.push("learning_rate should be positive".to_string());
        }
        if self.training.ridge_lambda < 0.0 {
            warnings.push("ridge_lambda should not be negative".to_string());
        }
        if self.training.max_bins < 2 {
            warnings.push("max_bins below 2 disables splitting".to_string());
        }
        if !(self.training.test_ratio > 0.0 && self.training.test_ratio < 1.0) {
            warnings.push("test_ratio should be between 0 and 1".to_string());
        }

        if warnings.is_empty() {
            info!("Configuration validation passed");
        } else {
            warn!("Configuration validation warnings: {:?}", warnings);
        }
        warnings
    }
}
