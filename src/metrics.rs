//! Operational metrics
//!
//! Process-wide monotonic counters, gauges, and histograms mutated on the
//! request path and read by the `/metrics` scrape handler. Everything is an
//! atomic; there is no locking and no persistence across restarts.
//!
//! Rendered in the Prometheus text exposition format.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Error-kind labels tracked by `errors_total`.
const ERROR_KINDS: [&str; 5] = ["validation", "unprocessable", "provider", "tracking", "config"];

/// Sentiment classes tracked by `sentiment_total`.
const SENTIMENT_CLASSES: [&str; 4] = ["POSITIVE", "NEGATIVE", "NEUTRAL", "MIXED"];

/// Latency histogram bucket bounds, in seconds.
const LATENCY_BOUNDS: [f64; 8] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// Confidence histogram bucket bounds (provider scores are in [0, 1]).
const CONFIDENCE_BOUNDS: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 0.9];

/// Fixed-bucket histogram backed by atomics.
///
/// The sum is kept in micro-units so observation stays a pair of atomic
/// adds; six decimal places is plenty for latency and confidence data.
#[derive(Debug)]
struct Histogram {
    bounds: &'static [f64],
    buckets: Vec<AtomicU64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new(bounds: &'static [f64]) -> Self {
        Self {
            bounds,
            buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, value: f64) {
        for (bound, bucket) in self.bounds.iter().zip(&self.buckets) {
            if value <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        self.sum_micros
            .fetch_add((value.max(0.0) * 1e6) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn render(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} histogram");
        for (bound, bucket) in self.bounds.iter().zip(&self.buckets) {
            let _ = writeln!(
                out,
                "{name}_bucket{{le=\"{bound}\"}} {}",
                bucket.load(Ordering::Relaxed)
            );
        }
        let count = self.count.load(Ordering::Relaxed);
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
        #[allow(clippy::cast_precision_loss)]
        let sum = self.sum_micros.load(Ordering::Relaxed) as f64 / 1e6;
        let _ = writeln!(out, "{name}_sum {sum}");
        let _ = writeln!(out, "{name}_count {count}");
    }
}

/// Process-wide metric registry for the gateway.
///
/// Shared via `Arc` between the HTTP handlers, the detection services, and
/// the scrape endpoint.
#[derive(Debug)]
pub struct GatewayMetrics {
    analyze_requests: AtomicU64,
    detect_requests: AtomicU64,
    errors: [AtomicU64; ERROR_KINDS.len()],
    active_requests: AtomicI64,
    text_length: AtomicU64,
    request_latency: Histogram,
    provider_latency: Histogram,
    sentiment_confidence: Histogram,
    entities_sum: AtomicU64,
    entities_count: AtomicU64,
    sentiment_classes: [AtomicU64; SENTIMENT_CLASSES.len()],
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayMetrics {
    /// Create a fresh registry with all series at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyze_requests: AtomicU64::new(0),
            detect_requests: AtomicU64::new(0),
            errors: Default::default(),
            active_requests: AtomicI64::new(0),
            text_length: AtomicU64::new(0),
            request_latency: Histogram::new(&LATENCY_BOUNDS),
            provider_latency: Histogram::new(&LATENCY_BOUNDS),
            sentiment_confidence: Histogram::new(&CONFIDENCE_BOUNDS),
            entities_sum: AtomicU64::new(0),
            entities_count: AtomicU64::new(0),
            sentiment_classes: Default::default(),
        }
    }

    /// Count one inbound request for the given endpoint.
    pub fn record_request(&self, endpoint: &str) {
        match endpoint {
            "analyze" => self.analyze_requests.fetch_add(1, Ordering::Relaxed),
            _ => self.detect_requests.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Count one failed request by error kind.
    pub fn record_error(&self, kind: &str) {
        if let Some(idx) = ERROR_KINDS.iter().position(|k| *k == kind) {
            self.errors[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Track an in-flight request; the gauge drops when the guard does.
    #[must_use]
    pub fn begin_request(self: &Arc<Self>) -> InFlightGuard {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            metrics: Arc::clone(self),
        }
    }

    /// Record the length of the last analyzed text.
    pub fn set_text_length(&self, len: usize) {
        self.text_length.store(len as u64, Ordering::Relaxed);
    }

    /// Observe end-to-end request latency, in seconds.
    pub fn observe_request_latency(&self, seconds: f64) {
        self.request_latency.observe(seconds);
    }

    /// Observe a single provider call's latency, in seconds.
    pub fn observe_provider_latency(&self, seconds: f64) {
        self.provider_latency.observe(seconds);
    }

    /// Record the dominant sentiment class and its confidence score.
    pub fn record_sentiment(&self, class: &str, confidence: f64) {
        if let Some(idx) = SENTIMENT_CLASSES.iter().position(|c| *c == class) {
            self.sentiment_classes[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.sentiment_confidence.observe(confidence);
    }

    /// Record how many entities one text produced.
    pub fn record_entities(&self, count: usize) {
        self.entities_sum.fetch_add(count as u64, Ordering::Relaxed);
        self.entities_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Current in-flight request count.
    #[must_use]
    pub fn active_requests(&self) -> i64 {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Render the full registry in Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(2048);

        let _ = writeln!(out, "# HELP mirada_requests_total Inbound requests by endpoint");
        let _ = writeln!(out, "# TYPE mirada_requests_total counter");
        let _ = writeln!(
            out,
            "mirada_requests_total{{endpoint=\"analyze\"}} {}",
            self.analyze_requests.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "mirada_requests_total{{endpoint=\"detect\"}} {}",
            self.detect_requests.load(Ordering::Relaxed)
        );

        let _ = writeln!(out, "# HELP mirada_errors_total Failed requests by error kind");
        let _ = writeln!(out, "# TYPE mirada_errors_total counter");
        for (kind, counter) in ERROR_KINDS.iter().zip(&self.errors) {
            let _ = writeln!(
                out,
                "mirada_errors_total{{kind=\"{kind}\"}} {}",
                counter.load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(out, "# HELP mirada_active_requests Requests currently in flight");
        let _ = writeln!(out, "# TYPE mirada_active_requests gauge");
        let _ = writeln!(
            out,
            "mirada_active_requests {}",
            self.active_requests.load(Ordering::Relaxed)
        );

        let _ = writeln!(out, "# HELP mirada_text_length Length of the last analyzed text");
        let _ = writeln!(out, "# TYPE mirada_text_length gauge");
        let _ = writeln!(
            out,
            "mirada_text_length {}",
            self.text_length.load(Ordering::Relaxed)
        );

        self.request_latency.render(
            &mut out,
            "mirada_request_latency_seconds",
            "End-to-end request latency",
        );
        self.provider_latency.render(
            &mut out,
            "mirada_provider_latency_seconds",
            "Cloud provider call latency",
        );
        self.sentiment_confidence.render(
            &mut out,
            "mirada_sentiment_confidence",
            "Confidence of the dominant sentiment class",
        );

        let _ = writeln!(out, "# HELP mirada_entities_per_text Entities detected per text");
        let _ = writeln!(out, "# TYPE mirada_entities_per_text summary");
        let _ = writeln!(
            out,
            "mirada_entities_per_text_sum {}",
            self.entities_sum.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "mirada_entities_per_text_count {}",
            self.entities_count.load(Ordering::Relaxed)
        );

        let _ = writeln!(out, "# HELP mirada_sentiment_total Analyzed texts by sentiment class");
        let _ = writeln!(out, "# TYPE mirada_sentiment_total counter");
        for (class, counter) in SENTIMENT_CLASSES.iter().zip(&self.sentiment_classes) {
            let _ = writeln!(
                out,
                "mirada_sentiment_total{{class=\"{class}\"}} {}",
                counter.load(Ordering::Relaxed)
            );
        }

        out
    }
}

/// RAII guard for the `active_requests` gauge.
#[derive(Debug)]
pub struct InFlightGuard {
    metrics: Arc<GatewayMetrics>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.active_requests.fetch_sub(1, Ordering::Relaxed);
    }
}
