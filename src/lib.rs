//! # Mirada: Cloud NLP/Vision Inference Gateway
//!
//! Mirada is a thin async HTTP gateway in front of managed NLP/vision APIs
//! (sentiment, entities, key phrases, object labels). Every inference call is
//! recorded as a run in an MLflow-compatible experiment-tracking backend, and
//! process-wide counters are exposed in Prometheus format for scraping.
//!
//! ## Design Principles
//!
//! - **Tracking is observability, not correctness**: a tracking-backend
//!   failure never fails the inference request it decorates
//! - **Validate before dispatch**: caller mistakes are rejected before any
//!   remote call is issued
//! - **One run per inference, closed on every exit path**
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mirada::tracking::{InferenceTracker, MemoryTracker};
//!
//! # async fn example() -> mirada::Result<()> {
//! let backend = Arc::new(MemoryTracker::new());
//! let tracker = InferenceTracker::init(backend, "comprehend_nlp_analysis", "aws-comprehend-1.0").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod provider;
pub mod tracking;

pub use error::{Error, Result};
