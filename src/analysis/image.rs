//! Image-label service (Rekognition)

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::{DetectedObject, ImageAnalysis};
use crate::metrics::GatewayMetrics;
use crate::provider::VisionProvider;
use crate::tracking::InferenceTracker;
use crate::{Error, Result};

/// Service version reported in results and tracking runs.
pub const MODEL_VERSION: &str = "aws-rekognition-1.0";

/// Object-label detection service.
#[derive(Clone)]
pub struct ImageLabelService {
    provider: Arc<dyn VisionProvider>,
    tracker: InferenceTracker,
    metrics: Arc<GatewayMetrics>,
}

impl ImageLabelService {
    /// Build the service from its collaborators.
    #[must_use]
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        tracker: InferenceTracker,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            provider,
            tracker,
            metrics,
        }
    }

    /// Detect object labels in `image`, keeping labels at or above
    /// `confidence_threshold` (percent).
    ///
    /// The threshold is validated before any dispatch: an out-of-range
    /// value is a caller-facing error, not a provider error. One provider
    /// call, recorded as one tracking run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unprocessable` for a threshold outside [0, 100] and
    /// `Error::Provider` if the provider call fails.
    pub async fn detect_objects(
        &self,
        image: &[u8],
        confidence_threshold: f64,
    ) -> Result<ImageAnalysis> {
        if !(0.0..=100.0).contains(&confidence_threshold) {
            return Err(Error::Unprocessable(format!(
                "confidence_threshold must be in [0, 100], got {confidence_threshold}"
            )));
        }

        let params = BTreeMap::from([(
            "confidence_threshold".to_string(),
            confidence_threshold.to_string(),
        )]);

        let analysis = self
            .tracker
            .track(params, || self.call_provider(image, confidence_threshold))
            .await?;

        info!(
            objects = analysis.objects.len(),
            confidence_threshold,
            inference_time = analysis.inference_time,
            "object detection complete"
        );
        Ok(analysis)
    }

    async fn call_provider(&self, image: &[u8], confidence_threshold: f64) -> Result<ImageAnalysis> {
        let start = Instant::now();
        let response = self
            .provider
            .detect_labels(image, confidence_threshold)
            .await?;
        let inference_time = start.elapsed().as_secs_f64();
        self.metrics.observe_provider_latency(inference_time);

        Ok(ImageAnalysis {
            objects: response
                .labels
                .into_iter()
                .map(|label| DetectedObject {
                    name: label.name,
                    confidence: label.confidence,
                    parents: label.parents.into_iter().map(|p| p.name).collect(),
                })
                .collect(),
            inference_time,
            model_version: MODEL_VERSION.to_string(),
        })
    }
}
