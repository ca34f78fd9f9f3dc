use cane_core::CoreError;
use thiserror::Error;

/// Errors returned by the trainers and the job runner.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("training error: {0}")]
    Training(String),

    #[error("job error: {0}")]
    Job(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
