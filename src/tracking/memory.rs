//! In-memory tracking backend using `DashMap`.
//!
//! This is the fallback backend when no tracking URI is configured - data
//! is lost on process restart. It is also what the test suites run against.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    ArtifactRecord, ExperimentRecord, MetricRecord, RunRecord, RunStatus, TrackingBackend,
};
use crate::{Error, Result};

/// Process-local tracking store.
///
/// Thread-safe via lock-free concurrent hashmaps. Experiments are keyed by
/// name so get-or-create is naturally idempotent; runs, params, metrics,
/// tags, and artifacts are keyed by run ID.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    experiments: DashMap<String, ExperimentRecord>,
    runs: DashMap<String, RunRecord>,
    params: DashMap<String, BTreeMap<String, String>>,
    tags: DashMap<String, BTreeMap<String, String>>,
    metrics: DashMap<String, Vec<MetricRecord>>,
    artifacts: DashMap<String, Vec<ArtifactRecord>>,
}

impl MemoryTracker {
    /// Create a new empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of runs in the store.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get a snapshot of a run by ID.
    #[must_use]
    pub fn run(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).map(|r| r.value().clone())
    }

    /// Get all runs recorded under an experiment.
    #[must_use]
    pub fn runs_for_experiment(&self, experiment_id: &str) -> Vec<RunRecord> {
        self.runs
            .iter()
            .filter(|r| r.experiment_id() == experiment_id)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Get the parameters logged onto a run.
    #[must_use]
    pub fn params_for_run(&self, run_id: &str) -> BTreeMap<String, String> {
        self.params.get(run_id).map(|p| p.value().clone()).unwrap_or_default()
    }

    /// Get the metrics logged onto a run, in logging order.
    #[must_use]
    pub fn metrics_for_run(&self, run_id: &str) -> Vec<MetricRecord> {
        self.metrics.get(run_id).map(|m| m.value().clone()).unwrap_or_default()
    }

    /// Get the tags set on a run.
    #[must_use]
    pub fn tags_for_run(&self, run_id: &str) -> BTreeMap<String, String> {
        self.tags.get(run_id).map(|t| t.value().clone()).unwrap_or_default()
    }

    /// Get the artifacts stored under a run.
    #[must_use]
    pub fn artifacts_for_run(&self, run_id: &str) -> Vec<ArtifactRecord> {
        self.artifacts
            .get(run_id)
            .map(|a| a.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TrackingBackend for MemoryTracker {
    async fn experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        Ok(self.experiments.get(name).map(|e| e.value().clone()))
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        let entry = self
            .experiments
            .entry(name.to_string())
            .or_insert_with(|| ExperimentRecord::new(Uuid::new_v4().to_string(), name));
        Ok(entry.experiment_id().to_string())
    }

    async fn create_run(
        &self,
        experiment_id: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord> {
        let run_id = Uuid::new_v4().to_string();
        let mut run = RunRecord::new(run_id.clone(), experiment_id);
        if let Some(parent) = parent_run_id {
            run = run.with_parent(parent);
        }
        run.start();
        self.runs.insert(run_id, run.clone());
        Ok(run)
    }

    async fn log_params(&self, run_id: &str, params: &BTreeMap<String, String>) -> Result<()> {
        let mut entry = self.params.entry(run_id.to_string()).or_default();
        for (key, value) in params {
            if entry.contains_key(key) {
                return Err(Error::Tracking(format!(
                    "param {key} already logged for run {run_id}"
                )));
            }
            entry.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn log_metrics(&self, run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<()> {
        let mut entry = self.metrics.entry(run_id.to_string()).or_default();
        for (key, value) in metrics {
            entry.push(MetricRecord::new(run_id, key.clone(), *value));
        }
        Ok(())
    }

    async fn set_tags(&self, run_id: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let mut entry = self.tags.entry(run_id.to_string()).or_default();
        entry.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn log_artifact(&self, run_id: &str, key: &str, bytes: &[u8]) -> Result<()> {
        self.artifacts
            .entry(run_id.to_string())
            .or_default()
            .push(ArtifactRecord::new(run_id, key, bytes.len() as u64));
        Ok(())
    }

    async fn close_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::Tracking(format!("unknown run {run_id}")))?;
        if run.is_closed() {
            return Err(Error::Tracking(format!("run {run_id} already closed")));
        }
        run.complete(status);
        Ok(())
    }
}
