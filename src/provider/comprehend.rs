//! Comprehend HTTP client (AWS JSON 1.1 target dispatch)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{EntitiesResponse, KeyPhrasesResponse, SentimentResponse, TextProvider};
use crate::{Error, Result};

const TARGET_PREFIX: &str = "Comprehend_20171126";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// HTTP client for the Comprehend text-analysis API.
///
/// Dispatches operations through the `X-Amz-Target` header against a
/// configurable endpoint, so the same client works against the real
/// regional endpoint, a signing proxy, or localstack.
#[derive(Debug, Clone)]
pub struct ComprehendClient {
    client: Client,
    endpoint: String,
}

impl ComprehendClient {
    /// Create a client for the given endpoint with a per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be constructed.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("comprehend client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn call<R: DeserializeOwned>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<R> {
        debug!(operation, "comprehend call");
        let response = self
            .client
            .post(self.endpoint.as_str())
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header("Content-Type", AMZ_JSON)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("{operation}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("{operation}: {status}: {detail}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{operation}: unexpected response shape: {e}")))
    }
}

#[async_trait]
impl TextProvider for ComprehendClient {
    async fn detect_sentiment(&self, text: &str, language: &str) -> Result<SentimentResponse> {
        self.call(
            "DetectSentiment",
            serde_json::json!({ "Text": text, "LanguageCode": language }),
        )
        .await
    }

    async fn detect_entities(&self, text: &str, language: &str) -> Result<EntitiesResponse> {
        self.call(
            "DetectEntities",
            serde_json::json!({ "Text": text, "LanguageCode": language }),
        )
        .await
    }

    async fn detect_key_phrases(&self, text: &str, language: &str) -> Result<KeyPhrasesResponse> {
        self.call(
            "DetectKeyPhrases",
            serde_json::json!({ "Text": text, "LanguageCode": language }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_response_wire_shape() {
        let raw = r#"{
            "Sentiment": "POSITIVE",
            "SentimentScore": {
                "Positive": 0.93, "Negative": 0.01, "Neutral": 0.05, "Mixed": 0.01
            }
        }"#;
        let parsed: SentimentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.sentiment, "POSITIVE");
        assert!((parsed.sentiment_score.positive - 0.93).abs() < f64::EPSILON);
    }

    #[test]
    fn test_entities_response_missing_list_defaults_empty() {
        let parsed: EntitiesResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.entities.is_empty());
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client =
            ComprehendClient::new("http://localhost:4566/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint, "http://localhost:4566");
    }
}
