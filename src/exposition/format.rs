//! Content-type negotiation for the supported exposition formats
//!
//! Exactly three wire formats exist, so selection is a closed enum plus a
//! pure matching function over the `Content-Type` media type.

use serde::Serialize;
use std::fmt;

/// Media type sent for the classic Prometheus text format
pub const PROMETHEUS_TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Media type sent for OpenMetrics text
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Media type sent for length-delimited protobuf
pub const PROTOBUF_CONTENT_TYPE: &str =
    "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=delimited";

const PROTOBUF_MESSAGE: &str = "io.prometheus.client.MetricFamily";

/// A negotiated exposition format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsFormat {
    /// `text/plain; version=0.0.4`
    PrometheusText,
    /// `application/openmetrics-text; version=1.0.0`
    OpenMetrics,
    /// `application/vnd.google.protobuf; ...; encoding=delimited`
    Protobuf,
}

impl MetricsFormat {
    /// All formats, in the order the suite exercises them
    pub const ALL: [MetricsFormat; 3] = [
        MetricsFormat::OpenMetrics,
        MetricsFormat::PrometheusText,
        MetricsFormat::Protobuf,
    ];

    /// Select a format from a `Content-Type` header value
    ///
    /// Returns `None` for anything that is not one of the three recognized
    /// media types (or carries an unsupported version/encoding parameter).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let media = MediaType::parse(content_type)?;

        match media.essence.as_str() {
            "text/plain" => match media.param("version") {
                None | Some("0.0.4") => Some(Self::PrometheusText),
                Some(_) => None,
            },
            "application/openmetrics-text" => match media.param("version") {
                Some("1.0.0") | Some("0.0.1") => Some(Self::OpenMetrics),
                _ => None,
            },
            "application/vnd.google.protobuf" => {
                let proto_matches = media.param("proto") == Some(PROTOBUF_MESSAGE);
                let delimited = media
                    .param("encoding")
                    .is_some_and(|e| e.eq_ignore_ascii_case("delimited"));
                (proto_matches && delimited).then_some(Self::Protobuf)
            }
            _ => None,
        }
    }

    /// The media type to request via `Accept` for this format
    pub fn content_type(&self) -> &'static str {
        match self {
            MetricsFormat::PrometheusText => PROMETHEUS_TEXT_CONTENT_TYPE,
            MetricsFormat::OpenMetrics => OPENMETRICS_CONTENT_TYPE,
            MetricsFormat::Protobuf => PROTOBUF_CONTENT_TYPE,
        }
    }

    /// Short stable identifier, used for metric labels and test names
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsFormat::PrometheusText => "prometheus_text",
            MetricsFormat::OpenMetrics => "openmetrics",
            MetricsFormat::Protobuf => "protobuf",
        }
    }
}

impl fmt::Display for MetricsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricsFormat::PrometheusText => "Prometheus text",
            MetricsFormat::OpenMetrics => "OpenMetrics text",
            MetricsFormat::Protobuf => "delimited protobuf",
        };
        f.write_str(name)
    }
}

/// Minimal media type: lowercased essence plus `key=value` parameters
struct MediaType {
    essence: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();
        if essence.is_empty() {
            return None;
        }

        let params = parts
            .filter_map(|part| {
                let (key, value) = part.split_once('=')?;
                let value = value.trim().trim_matches('"');
                Some((key.trim().to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        Some(Self { essence, params })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
