//! Content-type dispatch over the three format parsers

use super::model::Metric;
use super::{MetricsFormat, openmetrics, protobuf, text};
use crate::error::{AppError, AppResult};
use crate::http::HttpResponse;

impl MetricsFormat {
    /// Parse a body already known to be in this format
    pub fn parse(&self, body: &[u8]) -> AppResult<Vec<Metric>> {
        match self {
            MetricsFormat::PrometheusText => text::parse(body),
            MetricsFormat::OpenMetrics => openmetrics::parse(body),
            MetricsFormat::Protobuf => protobuf::parse(body),
        }
    }
}

/// Turns negotiated exporter responses into [`Metric`] collections
///
/// Nothing is cached: every call re-parses the full body.
pub struct MetricsParser;

impl MetricsParser {
    /// Parse a response using its `Content-Type` header to pick the format
    ///
    /// # Errors
    ///
    /// - [`AppError::UnsupportedContentType`] if the header is missing or names
    ///   none of the supported formats
    /// - [`AppError::FormatViolation`] if the body is malformed
    pub fn parse_collection(response: &HttpResponse) -> AppResult<Vec<Metric>> {
        Self::parse(response.body(), response.content_type())
    }

    /// Parse a raw body with an explicitly declared content type
    pub fn parse(body: &[u8], content_type: Option<&str>) -> AppResult<Vec<Metric>> {
        let format = content_type
            .and_then(MetricsFormat::from_content_type)
            .ok_or_else(|| AppError::UnsupportedContentType {
                content_type: content_type.map(str::to_string),
            })?;

        let metrics = format.parse(body)?;

        tracing::debug!(
            format = format.as_str(),
            body_bytes = body.len(),
            samples = metrics.len(),
            "Parsed metrics body"
        );

        Ok(metrics)
    }
}
