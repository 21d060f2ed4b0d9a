//! Experiment tracking
//!
//! Records every inference call as a run in an experiment-tracking backend.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< params / tags [write-once]
//!                              ├──< MetricRecord (N)
//!                              └──< ArtifactRecord (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use mirada::tracking::{InferenceTracker, MemoryTracker, TrackedOutcome};
//!
//! struct Labels(Vec<f64>);
//!
//! impl TrackedOutcome for Labels {
//!     fn run_metrics(&self) -> BTreeMap<String, f64> {
//!         BTreeMap::from([("number_of_objects".to_string(), self.0.len() as f64)])
//!     }
//! }
//!
//! # async fn example() -> mirada::Result<()> {
//! let backend = Arc::new(MemoryTracker::new());
//! let tracker = InferenceTracker::init(backend, "demo", "demo-1.0").await?;
//! let labels = tracker
//!     .track(BTreeMap::new(), || async { Ok(Labels(vec![97.2])) })
//!     .await?;
//! assert_eq!(labels.0.len(), 1);
//! # Ok(())
//! # }
//! ```

mod backend;
mod memory;
mod mlflow;
mod record;
mod tracker;

pub use backend::{ensure_experiment, TrackingBackend};
pub use memory::MemoryTracker;
pub use mlflow::MlflowTracker;
pub use record::{ArtifactRecord, ExperimentRecord, MetricRecord, RunRecord, RunStatus};
pub use tracker::{InferenceTracker, TrackedOutcome};
