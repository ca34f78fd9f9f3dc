//! Integration tests for the cane profit trainer
//!
//! Covers the train → persist → load → predict round trip and the
//! reproducibility of training runs.

use anyhow::Result;
use cane_core::dataset::SyntheticGenerator;
use cane_core::model::ModelKind;
use cane_core::{ModelArtifact, Predictor, Scenario};
use cane_trainer::{
    evaluate, train, JobStatus, TrainingJobs, TrainingParams, TrainingRequest, TrainingTarget,
};
use std::path::PathBuf;
use tempfile::tempdir;

fn forest_request(target: TrainingTarget, path: PathBuf) -> TrainingRequest {
    TrainingRequest {
        num_samples: 1000,
        model_kind: ModelKind::RandomForest,
        target,
        params: TrainingParams {
            n_estimators: 20,
            max_depth: 8,
            ..TrainingParams::default()
        },
        model_path: Some(path),
    }
}

#[test]
fn test_round_trip_prediction_tracks_target() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("models/sugar_profit_random_forest.json");

    let metrics = train(&forest_request(TrainingTarget::Sugar, path.clone()))?;
    assert_eq!(metrics.model_type, ModelKind::RandomForest);
    assert_eq!(metrics.n_train, 800);
    assert_eq!(metrics.n_test, 200);
    assert!(metrics.r2_test > 0.5, "r2_test {}", metrics.r2_test);

    let mut predictor = Predictor::new(&path);
    let data = SyntheticGenerator::default().generate(50)?;
    let total_error: f64 = data
        .rows
        .iter()
        .map(|row| {
            let prediction = predictor.predict(&Scenario::sugar_from_row(row)).unwrap();
            (prediction - row.sugar_profit_per_hectare).abs()
        })
        .sum();
    let mean_error = total_error / data.len() as f64;

    assert!(
        mean_error < 2.0 * metrics.rmse_test,
        "mean error {} vs rmse {}",
        mean_error,
        metrics.rmse_test
    );
    Ok(())
}

#[test]
fn test_sparse_scenario_predicts_finite_value() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("sugar.json");
    train(&forest_request(TrainingTarget::Sugar, path.clone()))?;

    let scenario = Scenario::new()
        .with("sugar_price", 800.0)
        .with("ethanol_price", 0.45)
        .with("harvest_month", 9.0);
    let prediction = Predictor::new(&path).predict(&scenario)?;
    assert!(prediction.is_finite());
    Ok(())
}

#[test]
fn test_training_is_reproducible() -> Result<()> {
    let dir = tempdir()?;
    let first = dir.path().join("a.json");
    let second = dir.path().join("b.json");

    let mut request = forest_request(TrainingTarget::Ethanol, first.clone());
    request.num_samples = 300;
    request.params.n_estimators = 5;
    let m1 = train(&request)?;
    request.model_path = Some(second.clone());
    let m2 = train(&request)?;

    assert_eq!(m1.model_hash, m2.model_hash);
    assert_eq!(m1.r2_test, m2.r2_test);

    let a1 = ModelArtifact::load(&first)?;
    let a2 = ModelArtifact::load(&second)?;
    assert_eq!(a1.model, a2.model);
    assert_eq!(a1.columns, a2.columns);
    Ok(())
}

#[test]
fn test_retraining_overwrites_artifact() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("model.json");

    let mut request = forest_request(TrainingTarget::Sugar, path.clone());
    request.num_samples = 200;
    request.params.n_estimators = 3;
    train(&request)?;

    request.model_kind = ModelKind::Linear;
    let metrics = train(&request)?;

    let artifact = ModelArtifact::load(&path)?;
    assert_eq!(artifact.model_kind, ModelKind::Linear);
    assert_eq!(artifact.model_hash, metrics.model_hash);
    Ok(())
}

#[test]
fn test_evaluate_on_fresh_data() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("linear.json");
    let mut request = forest_request(TrainingTarget::Ethanol, path.clone());
    request.model_kind = ModelKind::Linear;
    train(&request)?;

    let mut predictor = Predictor::new(&path);
    let scores = evaluate(&mut predictor, TrainingTarget::Ethanol, 200)?;
    assert_eq!(scores.n_samples, 200);
    assert!(scores.r2 > 0.5, "r2 {}", scores.r2);
    assert!(scores.rmse >= scores.mae);
    Ok(())
}

#[tokio::test]
async fn test_background_job_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("job.json");
    let mut request = forest_request(TrainingTarget::Sugar, path.clone());
    request.num_samples = 200;
    request.params.n_estimators = 3;

    let jobs = TrainingJobs::new();
    let id = jobs.submit(request)?;
    assert!(jobs.status(id).is_some());

    let metrics = jobs.wait(id).await?;
    assert_eq!(metrics.model_path, path);
    assert!(matches!(jobs.status(id), Some(JobStatus::Completed(_))));
    assert!(Predictor::new(&path).load().is_ok());
    Ok(())
}
