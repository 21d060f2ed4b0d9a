//! Tracking schema and wrapper invariants

use std::collections::BTreeMap;
use std::sync::Arc;

use mirada::tracking::{
    ensure_experiment, ExperimentRecord, InferenceTracker, MemoryTracker, MetricRecord, RunRecord,
    RunStatus, TrackedOutcome, TrackingBackend,
};
use mirada::Error;

// =============================================================================
// Record tests
// =============================================================================

#[test]
fn test_experiment_record_creation() {
    let record = ExperimentRecord::new("exp-001", "comprehend_nlp_analysis");
    assert_eq!(record.experiment_id(), "exp-001");
    assert_eq!(record.name(), "comprehend_nlp_analysis");
    assert!(record.created_at().timestamp() > 0);
}

#[test]
fn test_experiment_record_serialization() {
    let record = ExperimentRecord::new("exp-003", "Serialization Test");

    let json = serde_json::to_string(&record).expect("serialization failed");
    let deserialized: ExperimentRecord =
        serde_json::from_str(&json).expect("deserialization failed");

    assert_eq!(record.experiment_id(), deserialized.experiment_id());
    assert_eq!(record.name(), deserialized.name());
    assert_eq!(record.created_at(), deserialized.created_at());
}

#[test]
fn test_run_record_lifecycle() {
    let mut run = RunRecord::new("run-001", "exp-001");
    assert_eq!(run.status(), RunStatus::Pending);

    run.start();
    assert_eq!(run.status(), RunStatus::Running);
    assert!(run.started_at().is_some());
    assert!(run.ended_at().is_none());

    run.complete(RunStatus::Success);
    assert!(run.is_closed());
    assert!(run.ended_at().unwrap() >= run.started_at().unwrap());
}

#[test]
fn test_metric_record_roundtrip() {
    let metric = MetricRecord::new("run-001", "inference_time", 0.137);
    let json = serde_json::to_string(&metric).unwrap();
    let back: MetricRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(metric, back);
}

// =============================================================================
// Initializer tests
// =============================================================================

#[tokio::test]
async fn test_ensure_experiment_creates_once() {
    let tracker = MemoryTracker::new();

    let first = ensure_experiment(&tracker, "rekognition_object_detection")
        .await
        .unwrap();
    let second = ensure_experiment(&tracker, "rekognition_object_detection")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(tracker.experiment_count(), 1);
}

#[tokio::test]
async fn test_ensure_experiment_concurrent_converges() {
    let tracker = Arc::new(MemoryTracker::new());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            ensure_experiment(tracker.as_ref(), "shared").await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(tracker.experiment_count(), 1);
}

// =============================================================================
// Wrapper invariants
// =============================================================================

#[derive(Debug)]
struct Labels(Vec<f64>);

impl TrackedOutcome for Labels {
    fn run_metrics(&self) -> BTreeMap<String, f64> {
        let average = if self.0.is_empty() {
            0.0
        } else {
            self.0.iter().sum::<f64>() / self.0.len() as f64
        };
        BTreeMap::from([
            ("number_of_objects".to_string(), self.0.len() as f64),
            ("average_confidence".to_string(), average),
        ])
    }
}

#[tokio::test]
async fn test_run_closed_exactly_once_on_failure() {
    let store = Arc::new(MemoryTracker::new());
    let tracker = InferenceTracker::init(store.clone(), "exp", "test-1.0")
        .await
        .unwrap();

    let err = tracker
        .track::<Labels, _, _>(BTreeMap::new(), || async {
            Err(Error::Provider("AccessDeniedException".into()))
        })
        .await
        .unwrap_err();

    // The original error is observable, not replaced by a tracking error.
    assert!(matches!(err, Error::Provider(_)));
    assert!(err.to_string().contains("AccessDeniedException"));

    let runs = store.runs_for_experiment(tracker.experiment_id());
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status(), RunStatus::Failed);
    assert!(runs[0].ended_at().is_some());
}

#[tokio::test]
async fn test_result_returned_unchanged() {
    let store = Arc::new(MemoryTracker::new());
    let tracker = InferenceTracker::init(store.clone(), "exp", "test-1.0")
        .await
        .unwrap();

    let labels = tracker
        .track(BTreeMap::new(), || async { Ok(Labels(vec![97.2, 61.0])) })
        .await
        .unwrap();
    assert_eq!(labels.0, vec![97.2, 61.0]);
}

#[tokio::test]
async fn test_metrics_and_tags_logged_on_success() {
    let store = Arc::new(MemoryTracker::new());
    let tracker = InferenceTracker::init(store.clone(), "exp", "aws-rekognition-1.0")
        .await
        .unwrap();

    tracker
        .track(BTreeMap::new(), || async { Ok(Labels(vec![80.0, 60.0])) })
        .await
        .unwrap();

    let runs = store.runs_for_experiment(tracker.experiment_id());
    let run_id = runs[0].run_id();

    let metrics = store.metrics_for_run(run_id);
    let keys: Vec<&str> = metrics.iter().map(MetricRecord::key).collect();
    assert!(keys.contains(&"inference_time"));
    assert!(keys.contains(&"number_of_objects"));
    assert!(keys.contains(&"average_confidence"));

    let average = metrics
        .iter()
        .find(|m| m.key() == "average_confidence")
        .unwrap();
    assert!((average.value() - 70.0).abs() < f64::EPSILON);

    let tags = store.tags_for_run(run_id);
    assert_eq!(tags.get("environment").map(String::as_str), Some("production"));
    assert_eq!(tags.get("api_version").map(String::as_str), Some("1.0"));
}

// =============================================================================
// Backend-outage invariants
// =============================================================================

/// Backend whose run-side writes always fail. Experiment lookup succeeds so
/// the wrapper can initialize; everything after that returns a tracking error.
struct OutageTracker {
    fail_open: bool,
}

#[async_trait::async_trait]
impl TrackingBackend for OutageTracker {
    async fn experiment_by_name(&self, name: &str) -> mirada::Result<Option<ExperimentRecord>> {
        Ok(Some(ExperimentRecord::new("exp-outage", name)))
    }

    async fn create_experiment(&self, _name: &str) -> mirada::Result<String> {
        Err(Error::Tracking("experiments/create: 503".to_string()))
    }

    async fn create_run(
        &self,
        experiment_id: &str,
        _parent_run_id: Option<&str>,
    ) -> mirada::Result<RunRecord> {
        if self.fail_open {
            return Err(Error::Tracking("runs/create: 503".to_string()));
        }
        let mut run = RunRecord::new("run-outage", experiment_id);
        run.start();
        Ok(run)
    }

    async fn log_params(
        &self,
        _run_id: &str,
        _params: &BTreeMap<String, String>,
    ) -> mirada::Result<()> {
        Err(Error::Tracking("runs/log-batch: 503".to_string()))
    }

    async fn log_metrics(
        &self,
        _run_id: &str,
        _metrics: &BTreeMap<String, f64>,
    ) -> mirada::Result<()> {
        Err(Error::Tracking("runs/log-batch: 503".to_string()))
    }

    async fn set_tags(
        &self,
        _run_id: &str,
        _tags: &BTreeMap<String, String>,
    ) -> mirada::Result<()> {
        Err(Error::Tracking("runs/log-batch: 503".to_string()))
    }

    async fn log_artifact(&self, _run_id: &str, _key: &str, _bytes: &[u8]) -> mirada::Result<()> {
        Err(Error::Tracking("artifact upload: 503".to_string()))
    }

    async fn close_run(&self, _run_id: &str, _status: RunStatus) -> mirada::Result<()> {
        Err(Error::Tracking("runs/update: 503".to_string()))
    }
}

#[tokio::test]
async fn test_tracking_write_failures_never_fail_the_call() {
    let backend = Arc::new(OutageTracker { fail_open: false });
    let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
        .await
        .unwrap();

    // Params, metrics, tags, and close all fail; the result is untouched.
    let labels = tracker
        .track(BTreeMap::new(), || async { Ok(Labels(vec![88.5])) })
        .await
        .unwrap();
    assert_eq!(labels.0, vec![88.5]);

    // A provider error still comes back unchanged, not wrapped in a
    // tracking error from the failing close.
    let err = tracker
        .track::<Labels, _, _>(BTreeMap::new(), || async {
            Err(Error::Provider("ThrottlingException".to_string()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider(_)));
    assert!(err.to_string().contains("ThrottlingException"));
}

#[tokio::test]
async fn test_run_open_failure_runs_call_untracked() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let backend = Arc::new(OutageTracker { fail_open: true });
    let tracker = InferenceTracker::init(backend, "exp", "test-1.0")
        .await
        .unwrap();

    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let labels = tracker
        .track(BTreeMap::new(), move || async move {
            flag.store(true, Ordering::SeqCst);
            Ok(Labels(vec![42.0]))
        })
        .await
        .unwrap();

    assert!(invoked.load(Ordering::SeqCst));
    assert_eq!(labels.0, vec![42.0]);
}

#[tokio::test]
async fn test_artifact_logged_through_backend() {
    let store = MemoryTracker::new();
    let exp = store.create_experiment("exp").await.unwrap();
    let run = store.create_run(&exp, None).await.unwrap();

    store
        .log_artifact(run.run_id(), "request.png", b"png-bytes")
        .await
        .unwrap();

    let artifacts = store.artifacts_for_run(run.run_id());
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].key(), "request.png");
    assert_eq!(artifacts[0].size_bytes(), 9);
}
