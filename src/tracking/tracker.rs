//! Inference tracking wrapper
//!
//! [`InferenceTracker::track`] turns an ordinary provider call into a tracked
//! unit of work: open a run, log the call's parameters, time the call, log
//! result-derived metrics and fixed tags, close the run. Two guarantees hold
//! on every exit path:
//!
//! 1. An opened run is closed exactly once, whether the wrapped call
//!    succeeds, fails, or panics.
//! 2. The wrapped call's error propagates unmodified. Tracking writes are
//!    best-effort: a failing backend is logged at `warn` and never replaces
//!    the primary outcome.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use super::{ensure_experiment, RunStatus, TrackingBackend};
use crate::Result;

tokio::task_local! {
    /// Run ID of the innermost active run for the current logical request.
    static CURRENT_RUN: Option<String>;
}

/// Closes the run as `Failed` if dropped while still armed.
///
/// The normal success/failure paths disarm the guard and close the run
/// themselves; the guard only fires when the wrapped future unwinds, so
/// a panicking call cannot leave a run open.
struct OpenRunGuard {
    backend: Arc<dyn TrackingBackend>,
    run_id: String,
    armed: bool,
}

impl OpenRunGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OpenRunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(run_id = %self.run_id, "run left open: no runtime on unwind");
            return;
        };
        let backend = Arc::clone(&self.backend);
        let run_id = std::mem::take(&mut self.run_id);
        handle.spawn(async move {
            if let Err(e) = backend.close_run(&run_id, RunStatus::Failed).await {
                warn!(%run_id, error = %e, "failed to close run after panic");
            }
        });
    }
}

/// Metrics derived from a wrapped call's result.
///
/// Implementations must be total: a result with an unexpected shape (empty
/// collections, missing scores) yields zero/default metrics, never an error.
pub trait TrackedOutcome {
    /// Result-derived metrics to log onto the run.
    fn run_metrics(&self) -> BTreeMap<String, f64>;
}

/// Cross-cutting wrapper that records each inference call as a tracking run.
///
/// Holds the backend handle and the experiment ID resolved once at startup.
/// Cheap to clone; intended to be created per service and shared via the
/// application state.
#[derive(Clone)]
pub struct InferenceTracker {
    backend: Arc<dyn TrackingBackend>,
    experiment_id: String,
    service_version: String,
}

impl InferenceTracker {
    /// Resolve the experiment and build a tracker for it.
    ///
    /// Runs the idempotent get-or-create once; the experiment ID is cached
    /// for the process lifetime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Tracking` if the backend is unreachable. The caller
    /// decides whether that is fatal to startup.
    pub async fn init(
        backend: Arc<dyn TrackingBackend>,
        experiment_name: &str,
        service_version: &str,
    ) -> Result<Self> {
        let experiment_id = ensure_experiment(backend.as_ref(), experiment_name).await?;
        debug!(experiment_name, %experiment_id, "tracking experiment ready");
        Ok(Self {
            backend,
            experiment_id,
            service_version: service_version.to_string(),
        })
    }

    /// Get the resolved experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Run `f` as a tracked unit of work.
    ///
    /// Opens a run (nested under the current run if one is active for this
    /// task), logs `params` plus the fixed parameter set, invokes `f`,
    /// measures wall-clock elapsed time, logs result-derived metrics and
    /// fixed tags, closes the run, and returns `f`'s result unchanged.
    ///
    /// If even opening the run fails, `f` still executes untracked.
    ///
    /// # Errors
    ///
    /// Propagates `f`'s error unmodified; never fails for tracking reasons.
    pub async fn track<T, F, Fut>(&self, mut params: BTreeMap<String, String>, f: F) -> Result<T>
    where
        T: TrackedOutcome,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let parent = CURRENT_RUN.try_with(Clone::clone).ok().flatten();

        let run = match self
            .backend
            .create_run(&self.experiment_id, parent.as_deref())
            .await
        {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "failed to open tracking run; proceeding untracked");
                return f().await;
            }
        };
        let run_id = run.run_id().to_string();
        let mut guard = OpenRunGuard {
            backend: Arc::clone(&self.backend),
            run_id: run_id.clone(),
            armed: true,
        };

        params.insert(
            "service_version".to_string(),
            self.service_version.clone(),
        );
        params.insert("timestamp".to_string(), Utc::now().to_rfc3339());
        if let Err(e) = self.backend.log_params(&run_id, &params).await {
            warn!(%run_id, error = %e, "failed to log run params");
        }

        let start = Instant::now();
        let result = CURRENT_RUN.scope(Some(run_id.clone()), f()).await;
        let elapsed = start.elapsed().as_secs_f64();
        guard.disarm();

        match result {
            Ok(outcome) => {
                let mut metrics = outcome.run_metrics();
                metrics.insert("inference_time".to_string(), elapsed);
                if let Err(e) = self.backend.log_metrics(&run_id, &metrics).await {
                    warn!(%run_id, error = %e, "failed to log run metrics");
                }

                let tags = BTreeMap::from([
                    ("environment".to_string(), "production".to_string()),
                    ("service_version".to_string(), self.service_version.clone()),
                    ("api_version".to_string(), "1.0".to_string()),
                ]);
                if let Err(e) = self.backend.set_tags(&run_id, &tags).await {
                    warn!(%run_id, error = %e, "failed to set run tags");
                }

                if let Err(e) = self.backend.close_run(&run_id, RunStatus::Success).await {
                    warn!(%run_id, error = %e, "failed to close run");
                }
                Ok(outcome)
            }
            Err(primary) => {
                // Close the run, then surface the original error untouched.
                if let Err(e) = self.backend.close_run(&run_id, RunStatus::Failed).await {
                    warn!(%run_id, error = %e, "failed to close run after failure");
                }
                Err(primary)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{MemoryTracker, RunRecord};
    use crate::Error;

    #[derive(Debug)]
    struct Outcome {
        confidences: Vec<f64>,
    }

    impl TrackedOutcome for Outcome {
        fn run_metrics(&self) -> BTreeMap<String, f64> {
            let count = self.confidences.len();
            let average = if count == 0 {
                0.0
            } else {
                self.confidences.iter().sum::<f64>() / count as f64
            };
            BTreeMap::from([
                ("number_of_objects".to_string(), count as f64),
                ("average_confidence".to_string(), average),
            ])
        }
    }

    fn tracker_pair() -> (Arc<MemoryTracker>, Arc<dyn TrackingBackend>) {
        let backend = Arc::new(MemoryTracker::new());
        let dyn_backend: Arc<dyn TrackingBackend> = backend.clone();
        (backend, dyn_backend)
    }

    #[tokio::test]
    async fn test_successful_call_closes_run() {
        let (store, backend) = tracker_pair();
        let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
            .await
            .unwrap();

        let result = tracker
            .track(BTreeMap::new(), || async {
                Ok(Outcome {
                    confidences: vec![90.0, 80.0],
                })
            })
            .await
            .unwrap();

        assert_eq!(result.confidences.len(), 2);
        let runs = store.runs_for_experiment(tracker.experiment_id());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status(), RunStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_call_closes_run_and_propagates_error() {
        let (store, backend) = tracker_pair();
        let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
            .await
            .unwrap();

        let err = tracker
            .track::<Outcome, _, _>(BTreeMap::new(), || async {
                Err(Error::Provider("ThrottlingException".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("ThrottlingException"));

        let runs = store.runs_for_experiment(tracker.experiment_id());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status(), RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_zero_items_average_defaults_to_zero() {
        let (store, backend) = tracker_pair();
        let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
            .await
            .unwrap();

        tracker
            .track(BTreeMap::new(), || async {
                Ok(Outcome {
                    confidences: vec![],
                })
            })
            .await
            .unwrap();

        let runs = store.runs_for_experiment(tracker.experiment_id());
        let metrics = store.metrics_for_run(runs[0].run_id());
        let average = metrics
            .iter()
            .find(|m| m.key() == "average_confidence")
            .unwrap();
        assert!(average.value().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_fixed_params_logged() {
        let (store, backend) = tracker_pair();
        let tracker = InferenceTracker::init(backend, "exp", "aws-rekognition-1.0")
            .await
            .unwrap();

        let params = BTreeMap::from([("confidence_threshold".to_string(), "50".to_string())]);
        tracker
            .track(params, || async {
                Ok(Outcome {
                    confidences: vec![],
                })
            })
            .await
            .unwrap();

        let runs = store.runs_for_experiment(tracker.experiment_id());
        let logged = store.params_for_run(runs[0].run_id());
        assert_eq!(
            logged.get("confidence_threshold").map(String::as_str),
            Some("50")
        );
        assert_eq!(
            logged.get("service_version").map(String::as_str),
            Some("aws-rekognition-1.0")
        );
        assert!(logged.contains_key("timestamp"));
    }

    #[tokio::test]
    async fn test_panicking_call_still_closes_run() {
        let (store, backend) = tracker_pair();
        let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
            .await
            .unwrap();
        let experiment_id = tracker.experiment_id().to_string();

        let handle = tokio::spawn(async move {
            tracker
                .track::<Outcome, _, _>(BTreeMap::new(), || async {
                    panic!("provider wire decode blew up")
                })
                .await
        });
        assert!(handle.await.is_err());

        // The close runs on a task spawned from the unwind path.
        let mut closed = None;
        for _ in 0..100 {
            let runs = store.runs_for_experiment(&experiment_id);
            if runs.first().is_some_and(RunRecord::is_closed) {
                closed = Some(runs[0].status());
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(closed, Some(RunStatus::Failed));
    }

    #[tokio::test]
    async fn test_nested_track_links_parent_run() {
        let (store, backend) = tracker_pair();
        let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
            .await
            .unwrap();
        let inner = tracker.clone();

        tracker
            .track(BTreeMap::new(), || async move {
                inner
                    .track(BTreeMap::new(), || async {
                        Ok(Outcome {
                            confidences: vec![],
                        })
                    })
                    .await
            })
            .await
            .unwrap();

        let runs = store.runs_for_experiment(tracker.experiment_id());
        assert_eq!(runs.len(), 2);
        let nested: Vec<_> = runs.iter().filter(|r| r.parent_run_id().is_some()).collect();
        assert_eq!(nested.len(), 1);
    }
}
