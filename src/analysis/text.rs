//! Text-analysis service (Comprehend)

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::{Entity, KeyPhrase, Sentiment, SentimentScores, TextAnalysis};
use crate::metrics::GatewayMetrics;
use crate::provider::TextProvider;
use crate::tracking::InferenceTracker;
use crate::Result;

/// Service version reported in results and tracking runs.
pub const MODEL_VERSION: &str = "aws-comprehend-1.0";

/// Text-analysis detection service.
///
/// Holds one provider handle and exposes one operation. Stateless per call;
/// the interesting behavior is the tracking wrapper and the normalization
/// from wire shape to [`TextAnalysis`].
#[derive(Clone)]
pub struct TextAnalysisService {
    provider: Arc<dyn TextProvider>,
    tracker: InferenceTracker,
    metrics: Arc<GatewayMetrics>,
}

impl TextAnalysisService {
    /// Build the service from its collaborators.
    #[must_use]
    pub fn new(
        provider: Arc<dyn TextProvider>,
        tracker: InferenceTracker,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            provider,
            tracker,
            metrics,
        }
    }

    /// Analyze `text`: sentiment, entities, and key phrases in one result.
    ///
    /// Issues three independent provider calls against the same input.
    /// All three must succeed; any single failure fails the whole
    /// operation with no partial result. The call is recorded as one
    /// tracking run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` if any provider call fails or returns an
    /// unexpected shape.
    pub async fn analyze_text(&self, text: &str, language: &str) -> Result<TextAnalysis> {
        let params = BTreeMap::from([
            ("language".to_string(), language.to_string()),
            ("text_length".to_string(), text.chars().count().to_string()),
        ]);

        let analysis = self
            .tracker
            .track(params, || self.call_provider(text, language))
            .await?;

        self.metrics.record_sentiment(
            &analysis.sentiment.sentiment,
            dominant_score(&analysis.sentiment),
        );
        self.metrics.record_entities(analysis.entities.len());
        info!(
            sentiment = %analysis.sentiment.sentiment,
            entities = analysis.entities.len(),
            key_phrases = analysis.key_phrases.len(),
            inference_time = analysis.inference_time,
            "text analysis complete"
        );
        Ok(analysis)
    }

    async fn call_provider(&self, text: &str, language: &str) -> Result<TextAnalysis> {
        let start = Instant::now();

        let sentiment = self.provider.detect_sentiment(text, language).await?;
        let entities = self.provider.detect_entities(text, language).await?;
        let key_phrases = self.provider.detect_key_phrases(text, language).await?;

        let inference_time = start.elapsed().as_secs_f64();
        self.metrics.observe_provider_latency(inference_time);

        Ok(TextAnalysis {
            sentiment: Sentiment {
                sentiment: sentiment.sentiment,
                scores: SentimentScores {
                    positive: sentiment.sentiment_score.positive,
                    negative: sentiment.sentiment_score.negative,
                    neutral: sentiment.sentiment_score.neutral,
                    mixed: sentiment.sentiment_score.mixed,
                },
            },
            entities: entities
                .entities
                .into_iter()
                .map(|e| Entity {
                    text: e.text,
                    entity_type: e.entity_type,
                    score: e.score,
                })
                .collect(),
            key_phrases: key_phrases
                .key_phrases
                .into_iter()
                .map(|p| KeyPhrase {
                    text: p.text,
                    score: p.score,
                })
                .collect(),
            inference_time,
            model_version: MODEL_VERSION.to_string(),
        })
    }
}

/// Score of the dominant sentiment class.
fn dominant_score(sentiment: &Sentiment) -> f64 {
    match sentiment.sentiment.as_str() {
        "NEGATIVE" => sentiment.scores.negative,
        "NEUTRAL" => sentiment.scores.neutral,
        "MIXED" => sentiment.scores.mixed,
        _ => sentiment.scores.positive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        EntitiesResponse, KeyPhrasesResponse, SentimentResponse, SentimentScore,
    };
    use crate::tracking::MemoryTracker;
    use async_trait::async_trait;

    struct StubText;

    #[async_trait]
    impl TextProvider for StubText {
        async fn detect_sentiment(&self, _: &str, _: &str) -> Result<SentimentResponse> {
            Ok(SentimentResponse {
                sentiment: "NEUTRAL".to_string(),
                sentiment_score: SentimentScore {
                    positive: 0.1,
                    negative: 0.1,
                    neutral: 0.7,
                    mixed: 0.1,
                },
            })
        }

        async fn detect_entities(&self, _: &str, _: &str) -> Result<EntitiesResponse> {
            Ok(EntitiesResponse { entities: vec![] })
        }

        async fn detect_key_phrases(&self, _: &str, _: &str) -> Result<KeyPhrasesResponse> {
            Ok(KeyPhrasesResponse { key_phrases: vec![] })
        }
    }

    #[tokio::test]
    async fn test_text_length_param_counts_chars_not_bytes() {
        let store = Arc::new(MemoryTracker::new());
        let tracker = InferenceTracker::init(store.clone(), "exp", MODEL_VERSION)
            .await
            .unwrap();
        let service = TextAnalysisService::new(
            Arc::new(StubText),
            tracker.clone(),
            Arc::new(GatewayMetrics::new()),
        );

        // 5 chars, 6 bytes in UTF-8.
        let text = "señor";
        assert_eq!(text.len(), 6);
        service.analyze_text(text, "es").await.unwrap();

        let runs = store.runs_for_experiment(tracker.experiment_id());
        let params = store.params_for_run(runs[0].run_id());
        assert_eq!(params.get("text_length").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_dominant_score_follows_class() {
        let sentiment = Sentiment {
            sentiment: "NEGATIVE".to_string(),
            scores: SentimentScores {
                positive: 0.1,
                negative: 0.8,
                neutral: 0.05,
                mixed: 0.05,
            },
        };
        assert!((dominant_score(&sentiment) - 0.8).abs() < f64::EPSILON);
    }
}
