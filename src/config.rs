//! Process configuration loaded from the environment
//!
//! Everything externally supplied lives here: bind address, provider region
//! and endpoints, tracking URI and experiment names. Parse failures are
//! configuration errors and fatal at startup.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Default AWS region when `AWS_REGION` is unset.
pub const DEFAULT_REGION: &str = "eu-west-1";

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Cloud provider settings shared by both clients.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// AWS region used to derive the default service endpoints.
    pub region: String,
    /// Override for the Comprehend endpoint (tests, signing proxies).
    pub comprehend_endpoint: Option<String>,
    /// Override for the Rekognition endpoint.
    pub rekognition_endpoint: Option<String>,
    /// Per-call timeout. A silent provider is a provider failure, not an
    /// indefinite suspension.
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Resolved Comprehend endpoint URL.
    #[must_use]
    pub fn comprehend_url(&self) -> String {
        self.comprehend_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://comprehend.{}.amazonaws.com", self.region))
    }

    /// Resolved Rekognition endpoint URL.
    #[must_use]
    pub fn rekognition_url(&self) -> String {
        self.rekognition_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rekognition.{}.amazonaws.com", self.region))
    }
}

/// Experiment-tracking settings.
#[derive(Debug, Clone)]
pub struct TrackingSettings {
    /// MLflow tracking URI. `None` selects the in-memory backend.
    pub uri: Option<String>,
    /// Experiment name for text analysis runs.
    pub text_experiment: String,
    /// Experiment name for object detection runs.
    pub image_experiment: String,
}

/// Top-level settings bundle.
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Provider client settings.
    pub provider: ProviderSettings,
    /// Tracking backend settings.
    pub tracking: TrackingSettings,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let port = parse_var("MIRADA_PORT", 8080_u16)?;
        let timeout_secs = parse_var("MIRADA_PROVIDER_TIMEOUT_SECS", 30_u64)?;

        Ok(Self {
            server: ServerSettings {
                host: env::var("MIRADA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
            },
            provider: ProviderSettings {
                region: env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string()),
                comprehend_endpoint: env::var("MIRADA_COMPREHEND_ENDPOINT").ok(),
                rekognition_endpoint: env::var("MIRADA_REKOGNITION_ENDPOINT").ok(),
                timeout: Duration::from_secs(timeout_secs),
            },
            tracking: TrackingSettings {
                uri: env::var("MLFLOW_TRACKING_URI").ok(),
                text_experiment: env::var("MIRADA_TEXT_EXPERIMENT")
                    .unwrap_or_else(|_| "comprehend_nlp_analysis".to_string()),
                image_experiment: env::var("MIRADA_IMAGE_EXPERIMENT")
                    .unwrap_or_else(|_| "rekognition_object_detection".to_string()),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {name}: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_follow_region() {
        let provider = ProviderSettings {
            region: "us-east-1".to_string(),
            comprehend_endpoint: None,
            rekognition_endpoint: None,
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            provider.comprehend_url(),
            "https://comprehend.us-east-1.amazonaws.com"
        );
        assert_eq!(
            provider.rekognition_url(),
            "https://rekognition.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn test_endpoint_override_wins() {
        let provider = ProviderSettings {
            region: "us-east-1".to_string(),
            comprehend_endpoint: Some("http://localhost:4566".to_string()),
            rekognition_endpoint: None,
            timeout: Duration::from_secs(30),
        };
        assert_eq!(provider.comprehend_url(), "http://localhost:4566");
    }
}
