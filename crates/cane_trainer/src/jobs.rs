//! Background training jobs
//!
//! Each submitted [`TrainingRequest`] runs on the tokio blocking pool. The
//! registry keeps a `watch` receiver per job so callers can poll the latest
//! [`JobStatus`] or await completion.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::{Result, TrainerError};
use crate::trainer::{train, TrainingMetrics, TrainingRequest};

pub type JobId = Uuid;

/// Lifecycle of a training job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed(TrainingMetrics),
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed(_) | JobStatus::Failed(_))
    }
}

/// Registry of submitted training jobs
#[derive(Debug, Clone, Default)]
pub struct TrainingJobs {
    jobs: Arc<RwLock<HashMap<JobId, watch::Receiver<JobStatus>>>>,
}

impl TrainingJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request on the blocking pool of the current runtime.
    pub fn submit(&self, request: TrainingRequest) -> Result<JobId> {
        self.submit_with(request, train)
    }

    fn submit_with<F>(&self, request: TrainingRequest, run: F) -> Result<JobId>
    where
        F: FnOnce(&TrainingRequest) -> Result<TrainingMetrics> + Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|err| TrainerError::Job(format!("no tokio runtime: {}", err)))?;

        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(JobStatus::Pending);
        self.jobs.write().insert(id, rx);

        info!(
            job = %id,
            kind = %request.model_kind,
            target = %request.target,
            "Training job submitted"
        );

        handle.spawn_blocking(move || {
            tx.send_replace(JobStatus::Running);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(&request)));
            let status = match outcome {
                Ok(Ok(metrics)) => {
                    info!(job = %id, r2_test = metrics.r2_test, "Training job completed");
                    JobStatus::Completed(metrics)
                }
                Ok(Err(err)) => {
                    error!(job = %id, %err, "Training job failed");
                    JobStatus::Failed(err.to_string())
                }
                Err(payload) => {
                    let message = format!("training panicked: {}", panic_message(payload.as_ref()));
                    error!(job = %id, %message, "Training job failed");
                    JobStatus::Failed(message)
                }
            };
            tx.send_replace(status);
        });

        Ok(id)
    }

    /// Latest status, or `None` for an unknown id.
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.read().get(&id).map(|rx| rx.borrow().clone())
    }

    /// All known jobs and their latest status
    pub fn list(&self) -> Vec<(JobId, JobStatus)> {
        self.jobs
            .read()
            .iter()
            .map(|(id, rx)| (*id, rx.borrow().clone()))
            .collect()
    }

    /// Forget a job and return its last status.
    pub fn remove(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.write().remove(&id).map(|rx| rx.borrow().clone())
    }

    /// Drop every finished job, returning how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, rx| !rx.borrow().is_finished());
        before - jobs.len()
    }

    /// Wait for a job to finish and return its metrics.
    pub async fn wait(&self, id: JobId) -> Result<TrainingMetrics> {
        let mut rx = self
            .jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| TrainerError::Job(format!("unknown job {}", id)))?;

        let status = rx
            .wait_for(JobStatus::is_finished)
            .await
            .map_err(|_| TrainerError::Job(format!("job {} stopped without a result", id)))?
            .clone();

        match status {
            JobStatus::Completed(metrics) => Ok(metrics),
            JobStatus::Failed(message) => Err(TrainerError::Training(message)),
            JobStatus::Pending | JobStatus::Running => Err(TrainerError::Job(format!(
                "job {} reported an unfinished state",
                id
            ))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::TrainingParams;
    use cane_core::model::ModelKind;
    use tempfile::tempdir;

    #[test]
    fn test_submit_outside_runtime_fails() {
        let jobs = TrainingJobs::new();
        assert!(matches!(
            jobs.submit(TrainingRequest::default()),
            Err(TrainerError::Job(_))
        ));
        assert!(jobs.list().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let jobs = TrainingJobs::new();
        let id = Uuid::new_v4();
        assert!(jobs.status(id).is_none());
        assert!(matches!(jobs.wait(id).await, Err(TrainerError::Job(_))));
    }

    #[tokio::test]
    async fn test_failed_job_reports_message() {
        let dir = tempdir().unwrap();
        let jobs = TrainingJobs::new();
        let id = jobs
            .submit(TrainingRequest {
                num_samples: 2,
                model_path: Some(dir.path().join("never.json")),
                ..TrainingRequest::default()
            })
            .unwrap();

        assert!(matches!(jobs.wait(id).await, Err(TrainerError::Training(_))));
        assert!(matches!(jobs.status(id), Some(JobStatus::Failed(_))));
    }

    #[tokio::test]
    async fn test_completed_job() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("linear.json");
        let jobs = TrainingJobs::new();
        let id = jobs
            .submit(TrainingRequest {
                num_samples: 100,
                model_kind: ModelKind::Linear,
                params: TrainingParams::default(),
                model_path: Some(path.clone()),
                ..TrainingRequest::default()
            })
            .unwrap();

        let metrics = jobs.wait(id).await.unwrap();
        assert_eq!(metrics.model_path, path);
        assert!(path.exists());
        assert!(matches!(jobs.status(id), Some(JobStatus::Completed(_))));
    }

    #[tokio::test]
    async fn test_panicking_job_ends_failed() {
        let jobs = TrainingJobs::new();
        let id = jobs
            .submit_with(TrainingRequest::default(), |_| panic!("split exploded"))
            .unwrap();

        let err = jobs.wait(id).await.unwrap_err();
        assert!(err.to_string().contains("split exploded"), "{}", err);
        match jobs.status(id) {
            Some(JobStatus::Failed(message)) => assert!(message.contains("panicked")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remove_and_prune() {
        let jobs = TrainingJobs::new();
        let failing = |_: &TrainingRequest| -> Result<TrainingMetrics> {
            Err(TrainerError::Training("no data".to_string()))
        };
        let first = jobs.submit_with(TrainingRequest::default(), failing).unwrap();
        let second = jobs.submit_with(TrainingRequest::default(), failing).unwrap();
        assert!(jobs.wait(first).await.is_err());
        assert!(jobs.wait(second).await.is_err());

        assert!(matches!(jobs.remove(first), Some(JobStatus::Failed(_))));
        assert!(jobs.status(first).is_none());
        assert!(jobs.remove(first).is_none());

        assert_eq!(jobs.prune_finished(), 1);
        assert!(jobs.list().is_empty());
    }
}
