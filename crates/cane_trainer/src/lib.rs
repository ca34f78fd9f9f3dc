//! Cane profit model trainer
//!
//! Fits random forest, gradient boosting and linear regressors on the
//! synthetic harvest data from `cane-core`, persists them as hashed artifacts
//! and runs training in background jobs.

pub mod cart;
pub mod ensemble;
pub mod errors;
pub mod jobs;
pub mod linear;
pub mod metrics;
pub mod trainer;

pub use errors::TrainerError;
pub use jobs::{JobId, JobStatus, TrainingJobs};
pub use metrics::RegressionMetrics;
pub use trainer::{
    evaluate, evaluate_with_seed, fit, train, EvaluationMetrics, TrainingMetrics, TrainingParams,
    TrainingRequest, TrainingTarget,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
