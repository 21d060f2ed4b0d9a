//! Request handlers

use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use serde::Deserialize;
use tracing::warn;

use super::AppState;
use crate::{Error, Result};

/// Maximum accepted text length, in characters.
const MAX_TEXT_CHARS: usize = 5000;

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Text to analyze, 1..=5000 non-whitespace characters.
    pub text: String,
    /// Locale code forwarded to the provider.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// Query parameters of `POST /detect`.
#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    /// Minimum label confidence, percent in [0, 100].
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

const fn default_threshold() -> f64 {
    50.0
}

/// `POST /analyze` - sentiment, entities, and key phrases for a text.
///
/// # Errors
///
/// 400 for empty/whitespace-only or oversized text, 500 on provider failure.
pub async fn analyze(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse> {
    state.metrics.record_request("analyze");
    let _guard = state.metrics.begin_request();
    let start = Instant::now();

    let result = analyze_inner(&state, &body).await;

    state
        .metrics
        .observe_request_latency(start.elapsed().as_secs_f64());
    finish(&state, result)
}

async fn analyze_inner(state: &AppState, body: &AnalyzeRequest) -> Result<HttpResponse> {
    if body.text.trim().is_empty() {
        return Err(Error::Validation("text must not be empty".to_string()));
    }
    let chars = body.text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(Error::Validation(format!(
            "text exceeds {MAX_TEXT_CHARS} characters (got {chars})"
        )));
    }
    state.metrics.set_text_length(chars);

    let analysis = state
        .text_service
        .analyze_text(&body.text, &body.language)
        .await?;
    Ok(HttpResponse::Ok().json(analysis))
}

/// `POST /detect` - object labels for an uploaded image.
///
/// Multipart body with an image file field; optional query parameter
/// `confidence_threshold` (default 50.0).
///
/// # Errors
///
/// 422 for an out-of-range threshold or a missing file field, 400 for a
/// non-image content type, 500 on provider failure.
pub async fn detect(
    state: web::Data<AppState>,
    query: web::Query<DetectQuery>,
    payload: Multipart,
) -> Result<HttpResponse> {
    state.metrics.record_request("detect");
    let _guard = state.metrics.begin_request();
    let start = Instant::now();

    let result = detect_inner(&state, query.confidence_threshold, payload).await;

    state
        .metrics
        .observe_request_latency(start.elapsed().as_secs_f64());
    finish(&state, result)
}

async fn detect_inner(
    state: &AppState,
    confidence_threshold: f64,
    payload: Multipart,
) -> Result<HttpResponse> {
    // Reject a bad threshold before touching the body.
    if !(0.0..=100.0).contains(&confidence_threshold) {
        return Err(Error::Unprocessable(format!(
            "confidence_threshold must be in [0, 100], got {confidence_threshold}"
        )));
    }

    let image = read_image_field(payload).await?;
    let analysis = state
        .image_service
        .detect_objects(&image, confidence_threshold)
        .await?;
    Ok(HttpResponse::Ok().json(analysis))
}

/// Pull the image file field out of the multipart payload.
async fn read_image_field(mut payload: Multipart) -> Result<Vec<u8>> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| Error::Unprocessable(format!("malformed multipart body: {e}")))?
    {
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();
        if !is_file {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.essence_str().starts_with("image/"));
        if !is_image {
            return Err(Error::Validation("file must be an image".to_string()));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| Error::Unprocessable(format!("failed to read upload: {e}")))?
        {
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(Error::Unprocessable(
        "multipart file field is required".to_string(),
    ))
}

/// `GET /health` - fixed liveness response, no dependency probes.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

/// `GET /metrics` - Prometheus text exposition of the metric registry.
pub async fn scrape_metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(state.metrics.render())
}

/// Count the error by kind before handing it to the response mapper.
fn finish(state: &AppState, result: Result<HttpResponse>) -> Result<HttpResponse> {
    match result {
        Ok(response) => Ok(response),
        Err(e) => {
            state.metrics.record_error(e.kind());
            if matches!(e, Error::Provider(_) | Error::Http(_) | Error::Tracking(_)) {
                warn!(error = %e, "request failed");
            }
            Err(e)
        }
    }
}
