//! Normalized analysis results and the detection services
//!
//! The gateway owns its result shape, decoupled from the provider's raw
//! response shape: the services translate wire responses into the types
//! here, and these types serialize verbatim as the HTTP 200 bodies.

mod image;
mod text;

pub use image::{ImageLabelService, MODEL_VERSION as IMAGE_MODEL_VERSION};
pub use text::{TextAnalysisService, MODEL_VERSION as TEXT_MODEL_VERSION};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tracking::TrackedOutcome;

/// Per-class sentiment scores, normalized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    /// Confidence the text is positive.
    pub positive: f64,
    /// Confidence the text is negative.
    pub negative: f64,
    /// Confidence the text is neutral.
    pub neutral: f64,
    /// Confidence the text is mixed.
    pub mixed: f64,
}

/// Dominant sentiment plus its per-class scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    /// Dominant class: POSITIVE, NEGATIVE, NEUTRAL, or MIXED.
    pub sentiment: String,
    /// Per-class confidence scores.
    pub scores: SentimentScores,
}

/// One detected entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Entity text as it appears in the input.
    pub text: String,
    /// Entity type (PERSON, ORGANIZATION, ...).
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Detection confidence in [0, 1].
    pub score: f64,
}

/// One detected key phrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPhrase {
    /// Key phrase text.
    pub text: String,
    /// Detection confidence in [0, 1].
    pub score: f64,
}

/// Normalized text-analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextAnalysis {
    /// Dominant sentiment and scores.
    pub sentiment: Sentiment,
    /// Detected entities in input order.
    pub entities: Vec<Entity>,
    /// Detected key phrases in input order.
    pub key_phrases: Vec<KeyPhrase>,
    /// Wall-clock provider time, in seconds.
    pub inference_time: f64,
    /// Model identifier, fixed per service.
    pub model_version: String,
}

/// One detected object label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Label name.
    pub name: String,
    /// Detection confidence in [0, 100].
    pub confidence: f64,
    /// Parent category names. May be empty.
    pub parents: Vec<String>,
}

/// Normalized object-detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Detected objects ordered by confidence.
    pub objects: Vec<DetectedObject>,
    /// Wall-clock provider time, in seconds.
    pub inference_time: f64,
    /// Model identifier, fixed per service.
    pub model_version: String,
}

impl TrackedOutcome for TextAnalysis {
    fn run_metrics(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("sentiment_score".to_string(), self.sentiment.scores.positive),
            ("entities_count".to_string(), self.entities.len() as f64),
            (
                "key_phrases_count".to_string(),
                self.key_phrases.len() as f64,
            ),
        ])
    }
}

impl TrackedOutcome for ImageAnalysis {
    fn run_metrics(&self) -> BTreeMap<String, f64> {
        let count = self.objects.len();
        // Zero detections must derive zero metrics, not a division error.
        let average = if count == 0 {
            0.0
        } else {
            self.objects.iter().map(|o| o.confidence).sum::<f64>() / count as f64
        };
        BTreeMap::from([
            ("number_of_objects".to_string(), count as f64),
            ("average_confidence".to_string(), average),
        ])
    }
}
