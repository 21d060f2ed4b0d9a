//! Tracking backend abstraction

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{ExperimentRecord, RunRecord, RunStatus};
use crate::Result;

/// Write-side interface of an experiment-tracking backend.
///
/// Implemented by [`super::MemoryTracker`] (process-local, used in tests and
/// when no tracking URI is configured) and [`super::MlflowTracker`] (MLflow
/// 2.0 REST). Attributes logged onto a run are write-once per run; backends
/// are free to reject rewrites.
#[async_trait]
pub trait TrackingBackend: Send + Sync {
    /// Look up an experiment by name.
    async fn experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>>;

    /// Create a new experiment and return its ID.
    ///
    /// May fail if an experiment with the same name already exists; callers
    /// resolving a create race should re-read by name.
    async fn create_experiment(&self, name: &str) -> Result<String>;

    /// Open a new run under the given experiment, already in Running status.
    async fn create_run(
        &self,
        experiment_id: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord>;

    /// Log a batch of parameters onto a run.
    async fn log_params(&self, run_id: &str, params: &BTreeMap<String, String>) -> Result<()>;

    /// Log a batch of metrics onto a run.
    async fn log_metrics(&self, run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<()>;

    /// Set tags on a run.
    async fn set_tags(&self, run_id: &str, tags: &BTreeMap<String, String>) -> Result<()>;

    /// Store an artifact under the run.
    async fn log_artifact(&self, run_id: &str, key: &str, bytes: &[u8]) -> Result<()>;

    /// Close a run with its final status. Must be called exactly once per
    /// opened run.
    async fn close_run(&self, run_id: &str, status: RunStatus) -> Result<()>;
}

/// Get-or-create an experiment by name, returning its ID.
///
/// Idempotent: repeated or concurrent calls with the same name converge to
/// the same identifier. A lost create race falls back to a second lookup.
///
/// # Errors
///
/// Returns `Error::Tracking` if the backend is unreachable. No tracking can
/// proceed without an experiment ID, so this fails fast and lets the caller
/// decide whether that is fatal.
pub async fn ensure_experiment(backend: &dyn TrackingBackend, name: &str) -> Result<String> {
    if let Some(experiment) = backend.experiment_by_name(name).await? {
        return Ok(experiment.experiment_id().to_string());
    }

    match backend.create_experiment(name).await {
        Ok(id) => Ok(id),
        Err(create_err) => {
            // Lost a create race: another caller made it first.
            match backend.experiment_by_name(name).await? {
                Some(experiment) => Ok(experiment.experiment_id().to_string()),
                None => Err(create_err),
            }
        }
    }
}
