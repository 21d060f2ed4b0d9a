//! MLflow REST tracking backend
//!
//! Speaks the MLflow 2.0 REST wire (`experiments/get-by-name`,
//! `experiments/create`, `runs/create`, `runs/log-batch`, `runs/update`)
//! against a configured tracking URI. Every call carries the client's
//! per-request timeout; a silent backend is a tracking failure, not an
//! indefinite suspension.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ExperimentRecord, RunRecord, RunStatus, TrackingBackend};
use crate::{Error, Result};

/// Tracking backend client for an MLflow server.
#[derive(Debug, Clone)]
pub struct MlflowTracker {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct KeyValue {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct MetricEntry {
    key: String,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Debug, Deserialize)]
struct ExperimentBody {
    experiment_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentBody,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunBody,
}

impl MlflowTracker {
    /// Create a tracker for the given MLflow tracking URI.
    ///
    /// # Errors
    ///
    /// Returns `Error::Tracking` if the HTTP client cannot be constructed.
    pub fn new(tracking_uri: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Tracking(format!("tracking client init failed: {e}")))?;
        Ok(Self {
            client,
            base_url: tracking_uri.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{path}", self.base_url)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Tracking(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Tracking(format!("{path}: {status}: {detail}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Tracking(format!("{path}: invalid response: {e}")))
    }

    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Tracking(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Tracking(format!("{path}: {status}: {detail}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackingBackend for MlflowTracker {
    async fn experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        let response = self
            .client
            .get(self.endpoint("experiments/get-by-name"))
            .query(&[("experiment_name", name)])
            .send()
            .await
            .map_err(|e| Error::Tracking(format!("experiments/get-by-name: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Tracking(format!(
                "experiments/get-by-name: {status}: {detail}"
            )));
        }
        let body: GetExperimentResponse = response
            .json()
            .await
            .map_err(|e| Error::Tracking(format!("experiments/get-by-name: {e}")))?;
        Ok(Some(ExperimentRecord::new(
            body.experiment.experiment_id,
            body.experiment.name,
        )))
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        let body: CreateExperimentResponse = self
            .post("experiments/create", &serde_json::json!({ "name": name }))
            .await?;
        Ok(body.experiment_id)
    }

    async fn create_run(
        &self,
        experiment_id: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord> {
        let mut tags = Vec::new();
        if let Some(parent) = parent_run_id {
            tags.push(KeyValue {
                key: "mlflow.parentRunId".to_string(),
                value: parent.to_string(),
            });
        }
        let body: CreateRunResponse = self
            .post(
                "runs/create",
                &serde_json::json!({
                    "experiment_id": experiment_id,
                    "start_time": Utc::now().timestamp_millis(),
                    "tags": tags,
                }),
            )
            .await?;

        let mut run = RunRecord::new(body.run.info.run_id, experiment_id);
        if let Some(parent) = parent_run_id {
            run = run.with_parent(parent);
        }
        run.start();
        Ok(run)
    }

    async fn log_params(&self, run_id: &str, params: &BTreeMap<String, String>) -> Result<()> {
        let params: Vec<KeyValue> = params
            .iter()
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        self
            .post_unit(
                "runs/log-batch",
                &serde_json::json!({ "run_id": run_id, "params": params }),
            )
            .await?;
        Ok(())
    }

    async fn log_metrics(&self, run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let metrics: Vec<MetricEntry> = metrics
            .iter()
            .map(|(k, v)| MetricEntry {
                key: k.clone(),
                value: *v,
                timestamp: now,
                step: 0,
            })
            .collect();
        self
            .post_unit(
                "runs/log-batch",
                &serde_json::json!({ "run_id": run_id, "metrics": metrics }),
            )
            .await?;
        Ok(())
    }

    async fn set_tags(&self, run_id: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let tags: Vec<KeyValue> = tags
            .iter()
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        self
            .post_unit(
                "runs/log-batch",
                &serde_json::json!({ "run_id": run_id, "tags": tags }),
            )
            .await?;
        Ok(())
    }

    async fn log_artifact(&self, run_id: &str, key: &str, bytes: &[u8]) -> Result<()> {
        // Requires the server to run with --serve-artifacts.
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{run_id}/{key}",
            self.base_url
        );
        let response = self
            .client
            .put(url)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::Tracking(format!("artifact upload: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Tracking(format!("artifact upload: {status}")));
        }
        Ok(())
    }

    async fn close_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let status = match status {
            RunStatus::Success => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Pending | RunStatus::Running => "RUNNING",
        };
        self
            .post_unit(
                "runs/update",
                &serde_json::json!({
                    "run_id": run_id,
                    "status": status,
                    "end_time": Utc::now().timestamp_millis(),
                }),
            )
            .await?;
        Ok(())
    }
}
