//! Error types for the cane core crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating data, preparing features,
/// loading models or evaluating production decisions.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid sample count or generator parameters
    #[error("data generation failed: {0}")]
    DataGeneration(String),

    /// Feature preparation could not find the label column
    #[error("target column `{0}` not found in frame")]
    MissingTarget(String),

    /// Prediction requested before a model was trained or saved
    #[error("model not found at {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Decision engine is missing a required physical or market input
    #[error("missing required condition `{0}`")]
    MissingCondition(String),

    /// Stored model hash does not match the model body
    #[error("model integrity check failed: {0}")]
    Integrity(String),

    /// Column length mismatch or duplicate column in a frame
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Configuration could not be parsed or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cane core operations
pub type Result<T> = std::result::Result<T, CoreError>;
