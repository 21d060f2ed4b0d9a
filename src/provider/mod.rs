//! Cloud provider clients
//!
//! The provider is an opaque remote capability: given text and a locale it
//! returns sentiment, entities, and key phrases; given image bytes and a
//! confidence floor it returns labels. The traits here are the seam the
//! detection services depend on, so the HTTP clients can be swapped for
//! stubs in tests.
//!
//! Wire shapes mirror the AWS JSON 1.1 protocol (Comprehend, Rekognition).
//! Normalization into the gateway's own result shape happens one layer up,
//! in [`crate::analysis`].

mod comprehend;
mod rekognition;

pub use comprehend::ComprehendClient;
pub use rekognition::RekognitionClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-class sentiment scores as returned by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentScore {
    /// Confidence the text is positive.
    pub positive: f64,
    /// Confidence the text is negative.
    pub negative: f64,
    /// Confidence the text is neutral.
    pub neutral: f64,
    /// Confidence the text is mixed.
    pub mixed: f64,
}

/// `DetectSentiment` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentResponse {
    /// Dominant sentiment class (POSITIVE, NEGATIVE, NEUTRAL, MIXED).
    pub sentiment: String,
    /// Per-class confidence scores.
    #[serde(default)]
    pub sentiment_score: SentimentScore,
}

/// One detected entity on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireEntity {
    /// Entity text as it appears in the input.
    pub text: String,
    /// Entity type (PERSON, ORGANIZATION, ...).
    #[serde(rename = "Type")]
    pub entity_type: String,
    /// Detection confidence in [0, 1].
    pub score: f64,
}

/// `DetectEntities` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntitiesResponse {
    /// Detected entities in input order.
    #[serde(default)]
    pub entities: Vec<WireEntity>,
}

/// One detected key phrase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireKeyPhrase {
    /// Key phrase text.
    pub text: String,
    /// Detection confidence in [0, 1].
    pub score: f64,
}

/// `DetectKeyPhrases` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPhrasesResponse {
    /// Detected key phrases in input order.
    #[serde(default)]
    pub key_phrases: Vec<WireKeyPhrase>,
}

/// Parent category of a detected label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireParent {
    /// Parent category name.
    pub name: String,
}

/// One detected label on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireLabel {
    /// Label name.
    pub name: String,
    /// Detection confidence in [0, 100].
    pub confidence: f64,
    /// Parent categories, outermost last. May be empty.
    #[serde(default)]
    pub parents: Vec<WireParent>,
}

/// `DetectLabels` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelsResponse {
    /// Detected labels ordered by confidence.
    #[serde(default)]
    pub labels: Vec<WireLabel>,
}

/// Text analysis capability (sentiment, entities, key phrases).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Detect the dominant sentiment of `text`.
    async fn detect_sentiment(&self, text: &str, language: &str) -> Result<SentimentResponse>;

    /// Detect named entities in `text`.
    async fn detect_entities(&self, text: &str, language: &str) -> Result<EntitiesResponse>;

    /// Detect key phrases in `text`.
    async fn detect_key_phrases(&self, text: &str, language: &str) -> Result<KeyPhrasesResponse>;
}

/// Object-label detection capability.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Detect labels in `image`, dropping anything below `min_confidence`
    /// (percent, [0, 100]).
    async fn detect_labels(&self, image: &[u8], min_confidence: f64) -> Result<LabelsResponse>;
}
