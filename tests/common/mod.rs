//! Fake exporter for integration tests
//!
//! Serves `/-/healthy` and a content-negotiated `/metrics` over a real socket.
//! Text and protobuf bodies come from the `prometheus` crate's own encoders;
//! the OpenMetrics body is supplied by the test.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, ProtobufEncoder, Registry,
    TextEncoder,
};
use prost::Message;
use scrapecheck::exposition::{
    OPENMETRICS_CONTENT_TYPE, PROMETHEUS_TEXT_CONTENT_TYPE, PROTOBUF_CONTENT_TYPE, proto,
};
use std::sync::Arc;

/// The same logical data as [`sample_registry`], hand-written as OpenMetrics
pub const SAMPLE_OPENMETRICS: &str = "\
# TYPE requests counter
# HELP requests Requests served.
requests_total{method=\"get\"} 7.0
# TYPE jvm_threads_current gauge
# HELP jvm_threads_current Current thread count.
jvm_threads_current 12.0
# TYPE request_duration_seconds histogram
# HELP request_duration_seconds Request latency.
request_duration_seconds_bucket{le=\"0.1\"} 0
request_duration_seconds_bucket{le=\"1.0\"} 2
request_duration_seconds_bucket{le=\"+Inf\"} 2
request_duration_seconds_sum 0.75
request_duration_seconds_count 2
# TYPE gc_pause_seconds summary
# HELP gc_pause_seconds GC pause time.
gc_pause_seconds{quantile=\"0.5\"} 0.01
gc_pause_seconds{quantile=\"0.99\"} 0.25
gc_pause_seconds_sum 1.5
gc_pause_seconds_count 40
# EOF
";

/// Summary family appended to the Prometheus text body; the `prometheus`
/// crate cannot register summaries, so this is written out by hand
pub const SUMMARY_TEXT: &str = "\
# HELP gc_pause_seconds GC pause time.
# TYPE gc_pause_seconds summary
gc_pause_seconds{quantile=\"0.50\"} 0.01
gc_pause_seconds{quantile=\"0.99\"} 0.25
gc_pause_seconds_sum 1.5
gc_pause_seconds_count 40
";

/// The [`SUMMARY_TEXT`] family as a protobuf `MetricFamily`
pub fn summary_family() -> proto::MetricFamily {
    let quantile = |q: f64, value: f64| proto::Quantile {
        quantile: Some(q),
        value: Some(value),
    };
    proto::MetricFamily {
        name: Some("gc_pause_seconds".to_string()),
        help: Some("GC pause time.".to_string()),
        r#type: Some(proto::MetricType::Summary as i32),
        metric: vec![proto::Metric {
            summary: Some(proto::Summary {
                sample_count: Some(40),
                sample_sum: Some(1.5),
                quantile: vec![quantile(0.5, 0.01), quantile(0.99, 0.25)],
            }),
            ..Default::default()
        }],
        unit: None,
    }
}

/// A counter, a gauge and a two-bucket histogram with exact float values
pub fn sample_registry() -> Registry {
    let registry = Registry::new();

    let requests = IntCounterVec::new(
        Opts::new("requests_total", "Requests served."),
        &["method"],
    )
    .unwrap();
    requests.with_label_values(&["get"]).inc_by(7);

    let threads = Gauge::new("jvm_threads_current", "Current thread count.").unwrap();
    threads.set(12.0);

    let latency = Histogram::with_opts(
        HistogramOpts::new("request_duration_seconds", "Request latency.").buckets(vec![0.1, 1.0]),
    )
    .unwrap();
    latency.observe(0.25);
    latency.observe(0.5);

    registry.register(Box::new(requests)).unwrap();
    registry.register(Box::new(threads)).unwrap();
    registry.register(Box::new(latency)).unwrap();
    registry
}

/// A registry exposing one mixed-case gauge, as a misconfigured JMX bridge would
pub fn mixed_case_registry() -> Registry {
    let registry = Registry::new();
    let gauge = Gauge::new("FOO_BAR", "Copied verbatim from a JMX attribute.").unwrap();
    gauge.set(2.0);
    registry.register(Box::new(gauge)).unwrap();
    registry
}

pub const MIXED_CASE_OPENMETRICS: &str = "\
# TYPE FOO_BAR gauge
FOO_BAR 2.0
# EOF
";

/// Bodies served by one fake exporter, one per format
#[derive(Clone)]
pub struct ExposedBodies {
    pub text: Vec<u8>,
    pub openmetrics: Vec<u8>,
    pub protobuf: Vec<u8>,
    pub healthy: bool,
}

impl ExposedBodies {
    pub fn from_registry(registry: &Registry, openmetrics: &str) -> Self {
        let families = registry.gather();

        let mut text = Vec::new();
        TextEncoder::new().encode(&families, &mut text).unwrap();
        let mut protobuf = Vec::new();
        ProtobufEncoder::new().encode(&families, &mut protobuf).unwrap();

        Self {
            text,
            openmetrics: openmetrics.as_bytes().to_vec(),
            protobuf,
            healthy: true,
        }
    }

    /// Append the hand-written summary family to the text and protobuf bodies
    pub fn with_summary(mut self) -> Self {
        self.text.extend_from_slice(SUMMARY_TEXT.as_bytes());
        summary_family()
            .encode_length_delimited(&mut self.protobuf)
            .unwrap();
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }
}

async fn healthy(State(bodies): State<Arc<ExposedBodies>>) -> impl IntoResponse {
    if bodies.healthy {
        (StatusCode::OK, "Exporter is healthy.\n")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting\n")
    }
}

async fn metrics(State(bodies): State<Arc<ExposedBodies>>, headers: HeaderMap) -> impl IntoResponse {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if accept.contains("application/openmetrics-text") {
        (
            [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
            bodies.openmetrics.clone(),
        )
    } else if accept.contains("application/vnd.google.protobuf") {
        (
            [(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)],
            bodies.protobuf.clone(),
        )
    } else {
        (
            [(header::CONTENT_TYPE, PROMETHEUS_TEXT_CONTENT_TYPE)],
            bodies.text.clone(),
        )
    }
}

/// Start a fake exporter on an ephemeral port and return its base URL
pub async fn spawn_exporter(bodies: ExposedBodies) -> String {
    let app = Router::new()
        .route("/-/healthy", get(healthy))
        .route("/metrics", get(metrics))
        .with_state(Arc::new(bodies));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Convenience: a conformant exporter serving [`sample_registry`]
pub async fn spawn_sample_exporter() -> String {
    spawn_exporter(sample_bodies()).await
}

/// Bodies for [`sample_registry`] plus the summary family, in all three formats
pub fn sample_bodies() -> ExposedBodies {
    ExposedBodies::from_registry(&sample_registry(), SAMPLE_OPENMETRICS).with_summary()
}
