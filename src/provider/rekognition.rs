//! Rekognition HTTP client (AWS JSON 1.1 target dispatch)

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use tracing::debug;

use super::{LabelsResponse, VisionProvider};
use crate::{Error, Result};

const TARGET: &str = "RekognitionService.DetectLabels";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// HTTP client for the Rekognition label-detection API.
#[derive(Debug, Clone)]
pub struct RekognitionClient {
    client: Client,
    endpoint: String,
}

impl RekognitionClient {
    /// Create a client for the given endpoint with a per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be constructed.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("rekognition client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VisionProvider for RekognitionClient {
    async fn detect_labels(&self, image: &[u8], min_confidence: f64) -> Result<LabelsResponse> {
        debug!(image_bytes = image.len(), min_confidence, "rekognition call");

        // Blobs travel base64-encoded in the AWS JSON protocol.
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "Image": { "Bytes": encoded },
            "MinConfidence": min_confidence,
        });

        let response = self
            .client
            .post(self.endpoint.as_str())
            .header("X-Amz-Target", TARGET)
            .header("Content-Type", AMZ_JSON)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("DetectLabels: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("DetectLabels: {status}: {detail}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("DetectLabels: unexpected response shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_response_wire_shape() {
        let raw = r#"{
            "Labels": [
                {
                    "Name": "Dog",
                    "Confidence": 97.2,
                    "Parents": [{"Name": "Pet"}, {"Name": "Animal"}]
                },
                {"Name": "Sky", "Confidence": 61.0}
            ],
            "LabelModelVersion": "3.0"
        }"#;
        let parsed: LabelsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.labels.len(), 2);
        assert_eq!(parsed.labels[0].parents.len(), 2);
        assert!(parsed.labels[1].parents.is_empty());
    }

    #[test]
    fn test_labels_response_missing_list_defaults_empty() {
        let parsed: LabelsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.labels.is_empty());
    }
}
