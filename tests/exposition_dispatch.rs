//! Content-type dispatch and metric name casing checks

use proptest::prelude::*;
use scrapecheck::assertions::assert_lowercase_names;
use scrapecheck::error::{AppError, Location};
use scrapecheck::exposition::{
    MetricType, MetricsFormat, MetricsParser, OPENMETRICS_CONTENT_TYPE,
    PROMETHEUS_TEXT_CONTENT_TYPE, PROTOBUF_CONTENT_TYPE,
};
use scrapecheck::http::HttpResponse;

#[test]
fn test_plain_text_sample_parses_to_one_metric() {
    let response = HttpResponse::new(200)
        .with_header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
        .with_body("foo_bar{label=\"x\"} 1.0\n");

    let metrics = MetricsParser::parse_collection(&response).unwrap();

    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].name(), "foo_bar");
    assert_eq!(metrics[0].label("label"), Some("x"));
    assert_eq!(metrics[0].labels().len(), 1);
    assert_eq!(metrics[0].value(), 1.0);
    assert_eq!(metrics[0].metric_type(), None);
}

#[test]
fn test_mixed_case_name_fails_casing_check() {
    let metrics =
        MetricsParser::parse(b"FOO_BAR 2.0\n", Some(PROMETHEUS_TEXT_CONTENT_TYPE)).unwrap();

    match assert_lowercase_names(&metrics) {
        Err(AppError::AssertionFailure {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "foo_bar");
            assert_eq!(actual, "FOO_BAR");
        }
        other => panic!("expected assertion failure, got {:?}", other),
    }
}

#[test]
fn test_each_content_type_routes_to_its_parser() {
    // Only the OpenMetrics parser insists on the EOF marker
    let openmetrics = b"# TYPE up gauge\nup 1\n# EOF\n";
    let metrics = MetricsParser::parse(openmetrics, Some(OPENMETRICS_CONTENT_TYPE)).unwrap();
    assert_eq!(metrics[0].metric_type(), Some(MetricType::Gauge));

    let missing_eof = MetricsParser::parse(b"up 1\n", Some(OPENMETRICS_CONTENT_TYPE));
    assert!(matches!(
        missing_eof,
        Err(AppError::FormatViolation {
            format: MetricsFormat::OpenMetrics,
            ..
        })
    ));

    let text = MetricsParser::parse(b"up 1\n", Some(PROMETHEUS_TEXT_CONTENT_TYPE)).unwrap();
    assert_eq!(text.len(), 1);

    // 'u' = 0x75 reads as a 117-byte length prefix
    let not_protobuf = MetricsParser::parse(b"up 1\n", Some(PROTOBUF_CONTENT_TYPE));
    assert!(matches!(
        not_protobuf,
        Err(AppError::FormatViolation {
            format: MetricsFormat::Protobuf,
            location: Location::ByteOffset(0),
            ..
        })
    ));
}

#[test]
fn test_unknown_or_missing_content_type_is_rejected() {
    for content_type in [
        "application/json",
        "text/html; charset=utf-8",
        "text/plain; version=0.0.5",
        "application/openmetrics-text",
        "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=text",
    ] {
        let result = MetricsParser::parse(b"up 1\n", Some(content_type));
        assert!(
            matches!(
                result,
                Err(AppError::UnsupportedContentType { content_type: Some(ref ct) }) if ct == content_type
            ),
            "{} should be unsupported",
            content_type
        );
    }

    let missing = HttpResponse::new(200).with_body("up 1\n");
    assert!(matches!(
        MetricsParser::parse_collection(&missing),
        Err(AppError::UnsupportedContentType { content_type: None })
    ));
}

#[test]
fn test_violation_reports_line_number() {
    let err = MetricsParser::parse(
        b"up 1\nup{job=\"a\" 2\n",
        Some(PROMETHEUS_TEXT_CONTENT_TYPE),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        AppError::FormatViolation {
            location: Location::Line(2),
            ..
        }
    ));
}

proptest! {
    #[test]
    fn prop_lowercase_names_pass(name in "[a-z_][a-z0-9_]{0,24}") {
        let body = format!("{} 1\n", name);
        let metrics = MetricsParser::parse(body.as_bytes(), Some(PROMETHEUS_TEXT_CONTENT_TYPE)).unwrap();
        prop_assert!(assert_lowercase_names(&metrics).is_ok());
    }

    #[test]
    fn prop_any_uppercase_letter_fails(
        prefix in "[a-z_]{0,8}",
        upper in "[A-Z]",
        suffix in "[a-zA-Z0-9_]{0,8}",
    ) {
        let name = format!("{}{}{}", prefix, upper, suffix);
        let body = format!("{} 1\n", name);
        let metrics = MetricsParser::parse(body.as_bytes(), Some(PROMETHEUS_TEXT_CONTENT_TYPE)).unwrap();

        match assert_lowercase_names(&metrics) {
            Err(AppError::AssertionFailure { expected, actual, .. }) => {
                prop_assert_eq!(expected, name.to_lowercase());
                prop_assert_eq!(actual, name);
            }
            other => {
                prop_assert!(false, "expected assertion failure, got {:?}", other);
            }
        }
    }
}
