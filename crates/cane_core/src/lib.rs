//! Sugar cane production strategy engine
//!
//! Estimates per-hectare profitability of turning harvested cane into sugar
//! or ethanol and recommends a strategy.
//!
//! Modules:
//! - `economics`: Shared physical and economic formulas
//! - `dataset`: Seeded synthetic harvest generator and its table views
//! - `frame`: Minimal named-column numeric table
//! - `features`: Feature preparation (month indicators, auxiliary drops)
//! - `model`: Serializable regressors and inference
//! - `artifact`: Canonical JSON model artifacts with BLAKE3 hashes
//! - `predictor`: Lazily-loading single-scenario predictor
//! - `decision`: Deterministic sugar vs ethanol decision engine
//! - `config`: TOML plus environment configuration
//! - `deterministic`: Hash-based seeding and train/test splitting

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod decision;
pub mod deterministic;
pub mod economics;
pub mod errors;
pub mod features;
pub mod frame;
pub mod model;
pub mod predictor;

pub use artifact::{ModelArtifact, ARTIFACT_VERSION};
pub use config::CaneConfig;
pub use dataset::{
    generate, DatasetView, SampleRow, SyntheticGenerator, UnifiedDataset, ETHANOL_TARGET,
    SUGAR_TARGET,
};
pub use decision::{recommend, recommend_from_map, DecisionResult};
pub use economics::{ProductionConditions, Strategy};
pub use errors::{CoreError, Result};
pub use features::{prepare, PreparedFeatures};
pub use frame::Frame;
pub use model::{ModelKind, Regressor};
pub use predictor::{Predictor, Scenario};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
