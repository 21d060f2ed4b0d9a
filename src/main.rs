//! Gateway entry point: logging, configuration, wiring, serve.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mirada::analysis::{ImageLabelService, TextAnalysisService};
use mirada::config::Settings;
use mirada::http::{run_server, AppState};
use mirada::metrics::GatewayMetrics;
use mirada::provider::{ComprehendClient, RekognitionClient};
use mirada::tracking::{InferenceTracker, MemoryTracker, MlflowTracker, TrackingBackend};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "configuration is invalid");
            std::process::exit(1);
        }
    };

    let backend: Arc<dyn TrackingBackend> = match &settings.tracking.uri {
        Some(uri) => match MlflowTracker::new(uri, settings.provider.timeout) {
            Ok(tracker) => {
                info!(%uri, "tracking runs to MLflow");
                Arc::new(tracker)
            }
            Err(e) => {
                error!(error = %e, "tracking backend init failed");
                std::process::exit(1);
            }
        },
        None => {
            warn!("MLFLOW_TRACKING_URI not set; runs are kept in memory only");
            Arc::new(MemoryTracker::new())
        }
    };

    let state = match build_state(&settings, backend).await {
        Ok(state) => state,
        Err(e) => {
            // An unreachable tracking backend means no run can ever be
            // recorded; refuse to start rather than serve untracked.
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    run_server(&settings.server, state).await
}

async fn build_state(settings: &Settings, backend: Arc<dyn TrackingBackend>) -> mirada::Result<AppState> {
    let metrics = Arc::new(GatewayMetrics::new());

    let comprehend = Arc::new(ComprehendClient::new(
        &settings.provider.comprehend_url(),
        settings.provider.timeout,
    )?);
    let rekognition = Arc::new(RekognitionClient::new(
        &settings.provider.rekognition_url(),
        settings.provider.timeout,
    )?);

    let text_tracker = InferenceTracker::init(
        Arc::clone(&backend),
        &settings.tracking.text_experiment,
        mirada::analysis::TEXT_MODEL_VERSION,
    )
    .await?;
    let image_tracker = InferenceTracker::init(
        backend,
        &settings.tracking.image_experiment,
        mirada::analysis::IMAGE_MODEL_VERSION,
    )
    .await?;

    Ok(AppState {
        text_service: TextAnalysisService::new(comprehend, text_tracker, Arc::clone(&metrics)),
        image_service: ImageLabelService::new(rekognition, image_tracker, Arc::clone(&metrics)),
        metrics,
    })
}
