//! Conformance assertions over exporter responses and parsed metrics
//!
//! Every check returns `Err(AppError::AssertionFailure)` carrying expected and
//! actual values instead of a bare `false`.

use crate::error::{AppError, AppResult};
use crate::exposition::{Metric, MetricsFormat};
use crate::http::HttpResponse;

/// Body served by a healthy exporter on `/-/healthy`
pub const HEALTHY_RESPONSE: &str = "Exporter is healthy.\n";

/// Assert a `/-/healthy` response: status 200 and the standard healthy body
pub fn assert_healthy_response(response: &HttpResponse) -> AppResult<()> {
    assert_healthy_response_with(response, HEALTHY_RESPONSE)
}

/// Assert a `/-/healthy` response against a configured healthy body
pub fn assert_healthy_response_with(response: &HttpResponse, expected: &str) -> AppResult<()> {
    assert_status_ok(response)?;

    let body = response.body_text();
    if body != expected {
        return Err(AppError::assertion("healthy response body", expected, body));
    }
    Ok(())
}

/// Assert the invariants every `/metrics` response must satisfy
///
/// Status 200, a `Content-Type` naming one of the three supported formats,
/// and a non-empty body. Returns the negotiated format.
pub fn assert_common_metrics_response(response: &HttpResponse) -> AppResult<MetricsFormat> {
    assert_status_ok(response)?;

    let content_type = response.content_type().ok_or_else(|| {
        AppError::assertion(
            "Content-Type header present",
            "a Content-Type header",
            "<missing>",
        )
    })?;

    let format = MetricsFormat::from_content_type(content_type).ok_or_else(|| {
        AppError::assertion(
            "supported Content-Type",
            "one of the Prometheus text, OpenMetrics or protobuf media types",
            content_type,
        )
    })?;

    if response.body().is_empty() {
        return Err(AppError::assertion(
            "non-empty metrics body",
            "at least one byte",
            "0 bytes",
        ));
    }

    Ok(format)
}

/// Assert that the exporter answered in the format that was requested
pub fn assert_negotiated_format(response: &HttpResponse, expected: MetricsFormat) -> AppResult<()> {
    let actual = response
        .content_type()
        .and_then(MetricsFormat::from_content_type);

    if actual != Some(expected) {
        return Err(AppError::assertion(
            "negotiated format",
            expected.content_type(),
            response.content_type().unwrap_or("<missing>"),
        ));
    }
    Ok(())
}

/// Assert that every metric name is already lowercase
///
/// Uses Unicode lowercasing, which does not depend on the process locale.
/// Catches exporters that copy mixed-case JMX attribute names verbatim.
pub fn assert_lowercase_names(metrics: &[Metric]) -> AppResult<()> {
    for metric in metrics {
        let lowercase = metric.name().to_lowercase();
        if metric.name() != lowercase {
            return Err(AppError::assertion(
                "lowercase metric name",
                lowercase,
                metric.name(),
            ));
        }
    }
    Ok(())
}

/// Assert that at least one sample was parsed
pub fn assert_non_empty(metrics: &[Metric]) -> AppResult<()> {
    if metrics.is_empty() {
        return Err(AppError::assertion(
            "metrics present",
            "at least one sample",
            "0 samples",
        ));
    }
    Ok(())
}

fn assert_status_ok(response: &HttpResponse) -> AppResult<()> {
    if response.status_code() != 200 {
        return Err(AppError::assertion(
            "status code",
            "200",
            response.status_code().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposition::{Labels, PROTOBUF_CONTENT_TYPE};

    fn failure_parts(err: AppError) -> (String, String, String) {
        match err {
            AppError::AssertionFailure {
                check,
                expected,
                actual,
            } => (check, expected, actual),
            other => panic!("expected assertion failure, got {:?}", other),
        }
    }

    #[test]
    fn test_healthy_response_passes() {
        let response = HttpResponse::new(200).with_body(HEALTHY_RESPONSE);
        assert!(assert_healthy_response(&response).is_ok());
    }

    #[test]
    fn test_healthy_response_wrong_body() {
        let response = HttpResponse::new(200).with_body("OK");
        let (check, expected, actual) = failure_parts(assert_healthy_response(&response).unwrap_err());
        assert_eq!(check, "healthy response body");
        assert_eq!(expected, HEALTHY_RESPONSE);
        assert_eq!(actual, "OK");
    }

    #[test]
    fn test_healthy_response_wrong_status() {
        let response = HttpResponse::new(503).with_body(HEALTHY_RESPONSE);
        let (_, expected, actual) = failure_parts(assert_healthy_response(&response).unwrap_err());
        assert_eq!(expected, "200");
        assert_eq!(actual, "503");
    }

    #[test]
    fn test_common_metrics_response_returns_format() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", PROTOBUF_CONTENT_TYPE)
            .with_body(vec![0u8]);
        assert_eq!(
            assert_common_metrics_response(&response).unwrap(),
            MetricsFormat::Protobuf
        );
    }

    #[test]
    fn test_common_metrics_response_missing_content_type() {
        let response = HttpResponse::new(200).with_body("up 1\n");
        let (check, _, actual) =
            failure_parts(assert_common_metrics_response(&response).unwrap_err());
        assert_eq!(check, "Content-Type header present");
        assert_eq!(actual, "<missing>");
    }

    #[test]
    fn test_common_metrics_response_unsupported_content_type() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_body("{}");
        let (_, _, actual) = failure_parts(assert_common_metrics_response(&response).unwrap_err());
        assert_eq!(actual, "application/json");
    }

    #[test]
    fn test_common_metrics_response_empty_body() {
        let response = HttpResponse::new(200).with_header("Content-Type", "text/plain");
        let (check, _, _) = failure_parts(assert_common_metrics_response(&response).unwrap_err());
        assert_eq!(check, "non-empty metrics body");
    }

    #[test]
    fn test_negotiated_format_mismatch() {
        let response = HttpResponse::new(200).with_header("Content-Type", "text/plain");
        assert!(assert_negotiated_format(&response, MetricsFormat::PrometheusText).is_ok());

        let (_, expected, actual) = failure_parts(
            assert_negotiated_format(&response, MetricsFormat::OpenMetrics).unwrap_err(),
        );
        assert_eq!(expected, MetricsFormat::OpenMetrics.content_type());
        assert_eq!(actual, "text/plain");
    }

    #[test]
    fn test_lowercase_names_reports_first_offender() {
        let metrics = vec![
            Metric::new("jvm_info", Labels::new(), 1.0),
            Metric::new("FOO_BAR", Labels::new(), 2.0),
        ];
        let (check, expected, actual) =
            failure_parts(assert_lowercase_names(&metrics).unwrap_err());
        assert_eq!(check, "lowercase metric name");
        assert_eq!(expected, "foo_bar");
        assert_eq!(actual, "FOO_BAR");
    }

    #[test]
    fn test_lowercase_names_ignores_label_case() {
        let mut labels = Labels::new();
        labels.insert("Attribute".to_string(), "HeapMemoryUsage".to_string());
        let metrics = vec![Metric::new("jvm_memory", labels, 1.0)];
        assert!(assert_lowercase_names(&metrics).is_ok());
    }

    #[test]
    fn test_non_empty() {
        assert!(assert_non_empty(&[]).is_err());
        assert!(assert_non_empty(&[Metric::new("up", Labels::new(), 1.0)]).is_ok());
    }
}
