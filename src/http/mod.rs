//! HTTP surface
//!
//! Request validation, dispatch to the detection services, and
//! response/error mapping. All shared state lives in [`AppState`] and is
//! injected per worker; there are no module-level singletons.

mod handlers;

pub use handlers::{analyze, detect, health, scrape_metrics, AnalyzeRequest, DetectQuery};

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::analysis::{ImageLabelService, TextAnalysisService};
use crate::config::ServerSettings;
use crate::metrics::GatewayMetrics;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Text-analysis detection service.
    pub text_service: TextAnalysisService,
    /// Object-detection service.
    pub image_service: ImageLabelService,
    /// Process-wide metric registry.
    pub metrics: Arc<GatewayMetrics>,
}

/// Mount the gateway's routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/analyze", web::post().to(analyze))
        .route("/detect", web::post().to(detect))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(scrape_metrics));
}

/// Bind and run the HTTP server until shutdown.
///
/// # Errors
///
/// Returns the bind or runtime error from the underlying server.
pub async fn run_server(settings: &ServerSettings, state: AppState) -> std::io::Result<()> {
    let bind = (settings.host.clone(), settings.port);
    info!(host = %settings.host, port = settings.port, "starting gateway");

    let data = web::Data::new(state);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}
