//! Profit model training and evaluation
//!
//! A training run generates a fresh synthetic dataset, prepares the view for
//! one target, splits it with a hash-ordered shuffle, fits the requested
//! regressor and persists it together with its feature schema.

use cane_core::config::CaneConfig;
use cane_core::dataset::{DatasetView, SampleRow, SyntheticGenerator, DEFAULT_SEED};
use cane_core::deterministic::train_test_split;
use cane_core::features::{prepare, PreparedFeatures};
use cane_core::model::{ModelKind, Regressor};
use cane_core::predictor::DEFAULT_MODEL_PATH;
use cane_core::{ModelArtifact, Predictor, Scenario, ETHANOL_TARGET, SUGAR_TARGET};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, instrument, warn};

use crate::cart::TreeConfig;
use crate::ensemble::{fit_boosting, fit_forest};
use crate::errors::{Result, TrainerError};
use crate::linear::fit_linear;
use crate::metrics::RegressionMetrics;

/// Smallest dataset a training run accepts
pub const MIN_TRAINING_SAMPLES: usize = 5;
/// Train/test R² gap above which a run is flagged as overfit
pub const OVERFIT_GAP: f64 = 0.1;
/// Seed for evaluation datasets, distinct from the training default
pub const EVALUATION_SEED: u64 = DEFAULT_SEED + 1000;

/// Which profit column a model predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingTarget {
    Sugar,
    Ethanol,
}

impl TrainingTarget {
    pub fn column(&self) -> &'static str {
        match self {
            TrainingTarget::Sugar => SUGAR_TARGET,
            TrainingTarget::Ethanol => ETHANOL_TARGET,
        }
    }

    pub fn view(&self) -> DatasetView {
        match self {
            TrainingTarget::Sugar => DatasetView::Sugar,
            TrainingTarget::Ethanol => DatasetView::Ethanol,
        }
    }

    /// Artifact file name prefix
    pub fn file_stem(&self) -> &'static str {
        match self {
            TrainingTarget::Sugar => "sugar_profit",
            TrainingTarget::Ethanol => "ethanol_profit",
        }
    }

    /// Model inputs for one generated row
    pub fn scenario(&self, row: &SampleRow) -> Scenario {
        match self {
            TrainingTarget::Sugar => Scenario::sugar_from_row(row),
            TrainingTarget::Ethanol => Scenario::ethanol_from_row(row),
        }
    }

    /// Label of one generated row
    pub fn label(&self, row: &SampleRow) -> f64 {
        match self {
            TrainingTarget::Sugar => row.sugar_profit_per_hectare,
            TrainingTarget::Ethanol => row.ethanol_profit_per_hectare,
        }
    }
}

impl fmt::Display for TrainingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingTarget::Sugar => f.write_str("sugar"),
            TrainingTarget::Ethanol => f.write_str("ethanol"),
        }
    }
}

impl FromStr for TrainingTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sugar" | "sugar_profit" | SUGAR_TARGET => Ok(TrainingTarget::Sugar),
            "ethanol" | "ethanol_profit" | ETHANOL_TARGET => Ok(TrainingTarget::Ethanol),
            other => Err(format!("unknown target `{}`", other)),
        }
    }
}

/// Hyperparameters shared by all model kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features considered per split
    pub max_features: f64,
    /// Boosting only
    pub learning_rate: f64,
    /// Linear only
    pub ridge_lambda: f64,
    pub max_bins: usize,
    pub seed: u64,
    pub test_ratio: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_leaf: 1,
            max_features: 1.0,
            learning_rate: 0.1,
            ridge_lambda: 1e-6,
            max_bins: 64,
            seed: DEFAULT_SEED,
            test_ratio: 0.2,
        }
    }
}

impl TrainingParams {
    pub fn from_config(config: &CaneConfig) -> Self {
        let t = &config.training;
        Self {
            n_estimators: t.n_estimators,
            max_depth: t.max_depth,
            min_samples_leaf: t.min_samples_leaf,
            max_features: t.max_features,
            learning_rate: t.learning_rate,
            ridge_lambda: t.ridge_lambda,
            max_bins: t.max_bins,
            seed: config.generator.seed,
            test_ratio: t.test_ratio,
        }
    }

    pub fn validate(&self, kind: ModelKind) -> Result<()> {
        let invalid = |msg: &str| Err(TrainerError::Training(msg.to_string()));

        if kind != ModelKind::Linear {
            if self.n_estimators == 0 {
                return invalid("n_estimators must be at least 1");
            }
            if self.max_depth == 0 {
                return invalid("max_depth must be at least 1");
            }
            if self.min_samples_leaf == 0 {
                return invalid("min_samples_leaf must be at least 1");
            }
            if !(self.max_features > 0.0 && self.max_features <= 1.0) {
                return invalid("max_features must be in (0, 1]");
            }
            if self.max_bins < 2 {
                return invalid("max_bins must be at least 2");
            }
        }
        if kind == ModelKind::GradientBoosting
            && !(self.learning_rate > 0.0 && self.learning_rate.is_finite())
        {
            return invalid("learning_rate must be positive");
        }
        if kind == ModelKind::Linear && !(self.ridge_lambda >= 0.0 && self.ridge_lambda.is_finite()) {
            return invalid("ridge_lambda must be non-negative");
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return invalid("test_ratio must be between 0 and 1");
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_bins: self.max_bins,
            max_features: self.max_features,
        }
    }
}

/// One training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub num_samples: usize,
    pub model_kind: ModelKind,
    pub target: TrainingTarget,
    pub params: TrainingParams,
    /// Defaults to `models/<target>_<kind>.json`
    pub model_path: Option<PathBuf>,
}

impl Default for TrainingRequest {
    fn default() -> Self {
        Self {
            num_samples: 5000,
            model_kind: ModelKind::RandomForest,
            target: TrainingTarget::Sugar,
            params: TrainingParams::default(),
            model_path: None,
        }
    }
}

impl TrainingRequest {
    /// Request built from configuration defaults.
    pub fn from_config(config: &CaneConfig, target: TrainingTarget) -> Self {
        let kind = config.training.model_kind;
        Self {
            num_samples: config.generator.num_samples,
            model_kind: kind,
            target,
            params: TrainingParams::from_config(config),
            model_path: Some(config.model_path(target.file_stem(), kind)),
        }
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        match &self.model_path {
            Some(path) => path.clone(),
            None => default_model_path(self.target, self.model_kind),
        }
    }
}

/// `models/<target>_<kind>.json`
pub fn default_model_path(target: TrainingTarget, kind: ModelKind) -> PathBuf {
    let default = Path::new(DEFAULT_MODEL_PATH);
    let dir = default.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}_{}.json", target.file_stem(), kind))
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub model_path: PathBuf,
    pub model_type: ModelKind,
    pub target: String,
    pub mse_test: f64,
    pub rmse_test: f64,
    pub mae_test: f64,
    pub r2_test: f64,
    pub r2_train: f64,
    pub overfit_warning: bool,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub model_hash: String,
}

/// Scores of a stored model on freshly generated data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_samples: usize,
}

/// Fit a regressor on a prepared training partition.
pub fn fit(kind: ModelKind, data: &PreparedFeatures, params: &TrainingParams) -> Result<Regressor> {
    if data.is_empty() {
        return Err(TrainerError::Training("training partition is empty".to_string()));
    }

    let model = match kind {
        ModelKind::RandomForest => Regressor::RandomForest(fit_forest(
            &data.rows,
            &data.target,
            params.n_estimators,
            &params.tree_config(),
            params.seed,
        )),
        ModelKind::GradientBoosting => Regressor::GradientBoosting(fit_boosting(
            &data.rows,
            &data.target,
            params.n_estimators,
            params.learning_rate,
            &params.tree_config(),
            params.seed,
        )),
        ModelKind::Linear => {
            Regressor::Linear(fit_linear(&data.rows, &data.target, params.ridge_lambda)?)
        }
    };
    Ok(model)
}

/// Generate, fit, score and persist a model.
#[instrument(skip(request), fields(kind = %request.model_kind, target = %request.target))]
pub fn train(request: &TrainingRequest) -> Result<TrainingMetrics> {
    if request.num_samples < MIN_TRAINING_SAMPLES {
        return Err(TrainerError::Training(format!(
            "need at least {} samples, got {}",
            MIN_TRAINING_SAMPLES, request.num_samples
        )));
    }
    let params = &request.params;
    params.validate(request.model_kind)?;

    let dataset = SyntheticGenerator::new(params.seed).generate(request.num_samples)?;
    let frame = dataset.view(request.target.view())?;
    let prepared = prepare(&frame, request.target.column())?;

    let (train_idx, test_idx) = train_test_split(prepared.len(), params.test_ratio, params.seed);
    let train_set = prepared.subset(&train_idx);
    let test_set = prepared.subset(&test_idx);

    info!(
        n_train = train_set.len(),
        n_test = test_set.len(),
        n_features = prepared.n_features(),
        "Prepared training data"
    );

    let model = fit(request.model_kind, &train_set, params).map_err(|err| {
        error!(%err, "Model fit failed");
        err
    })?;

    let train_scores =
        RegressionMetrics::compute(&train_set.target, &model.predict_batch(&train_set.rows));
    let test_scores =
        RegressionMetrics::compute(&test_set.target, &model.predict_batch(&test_set.rows));

    let overfit_warning = train_scores.r2 - test_scores.r2 > OVERFIT_GAP;
    if overfit_warning {
        warn!(
            r2_train = train_scores.r2,
            r2_test = test_scores.r2,
            "Model may be overfitting"
        );
    }

    let artifact = ModelArtifact::new(model, prepared.columns.clone(), request.target.column())?;
    let model_path = request.resolved_model_path();
    artifact.save(&model_path).map_err(|err| {
        error!(%err, path = %model_path.display(), "Failed to persist model");
        err
    })?;

    info!(
        r2_test = test_scores.r2,
        rmse_test = test_scores.rmse,
        path = %model_path.display(),
        "Training complete"
    );

    Ok(TrainingMetrics {
        model_path,
        model_type: request.model_kind,
        target: request.target.column().to_string(),
        mse_test: test_scores.mse,
        rmse_test: test_scores.rmse,
        mae_test: test_scores.mae,
        r2_test: test_scores.r2,
        r2_train: train_scores.r2,
        overfit_warning,
        n_train: train_set.len(),
        n_test: test_set.len(),
        n_features: prepared.n_features(),
        model_hash: artifact.model_hash,
    })
}

/// Score a stored model on a freshly generated dataset.
pub fn evaluate(
    predictor: &mut Predictor,
    target: TrainingTarget,
    num_samples: usize,
) -> Result<EvaluationMetrics> {
    evaluate_with_seed(predictor, target, num_samples, EVALUATION_SEED)
}

/// [`evaluate`] with an explicit generator seed.
#[instrument(skip(predictor), fields(path = %predictor.model_path().display()))]
pub fn evaluate_with_seed(
    predictor: &mut Predictor,
    target: TrainingTarget,
    num_samples: usize,
    seed: u64,
) -> Result<EvaluationMetrics> {
    let artifact_target = predictor.artifact()?.target.clone();
    if artifact_target != target.column() {
        warn!(
            artifact_target = %artifact_target,
            requested = %target.column(),
            "Evaluating a model against a different target than it was trained on"
        );
    }

    let dataset = SyntheticGenerator::new(seed).generate(num_samples)?;
    let scenarios: Vec<Scenario> = dataset.rows.iter().map(|r| target.scenario(r)).collect();
    let actual: Vec<f64> = dataset.rows.iter().map(|r| target.label(r)).collect();
    let predicted = predictor.predict_batch(&scenarios)?;

    let scores = RegressionMetrics::compute(&actual, &predicted);
    info!(r2 = scores.r2, rmse = scores.rmse, n_samples = num_samples, "Evaluation complete");

    Ok(EvaluationMetrics {
        mse: scores.mse,
        rmse: scores.rmse,
        mae: scores.mae,
        r2: scores.r2,
        n_samples: num_samples,
    })
}
