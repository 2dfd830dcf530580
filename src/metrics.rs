//! Prometheus self-instrumentation for scrapecheck
//!
//! This module tracks the harness itself, not the exporters under test:
//! - Test outcomes by test name
//! - Samples parsed and parse latency by exposition format
//! - Teardown actions that failed
//!
//! `scrapecheck run --metrics-file PATH` writes the gathered registry in
//! Prometheus text format when the run ends.

use crate::exposition::MetricsFormat;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Outcome label for a single conformance test
///
/// Restricted to a closed set so the `outcome` label cannot grow unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    /// The test never ran because argument setup failed
    Skipped,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Metrics collector for a conformance run
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    tests_total: IntCounterVec,
    samples_parsed: IntCounterVec,
    parse_duration: HistogramVec,
    teardown_failures: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: tests per class x 3 outcomes
        let tests_total = IntCounterVec::new(
            Opts::new(
                "scrapecheck_tests_total",
                "Conformance tests executed, by test name and outcome",
            ),
            &["test", "outcome"],
        )?;

        let samples_parsed = IntCounterVec::new(
            Opts::new(
                "scrapecheck_samples_parsed_total",
                "Samples decoded from exporter responses, by exposition format",
            ),
            &["format"],
        )?;

        // Text bodies from a JVM exporter parse in well under 50ms; the upper
        // buckets catch pathological bodies
        let parse_duration = HistogramVec::new(
            HistogramOpts::new(
                "scrapecheck_parse_duration_ms",
                "Time spent parsing one exporter response in milliseconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0]),
            &["format"],
        )?;

        let teardown_failures = IntCounter::new(
            "scrapecheck_teardown_failures_total",
            "Teardown actions that failed across all teardown passes",
        )?;

        registry.register(Box::new(tests_total.clone()))?;
        registry.register(Box::new(samples_parsed.clone()))?;
        registry.register(Box::new(parse_duration.clone()))?;
        registry.register(Box::new(teardown_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            tests_total,
            samples_parsed,
            parse_duration,
            teardown_failures,
        })
    }

    /// Record the outcome of one test for one argument
    pub fn record_test(&self, test: &str, outcome: Outcome) {
        self.tests_total
            .with_label_values(&[test, outcome.as_str()])
            .inc();
    }

    /// Record a successfully parsed response
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_ms` is negative or not finite; the
    /// histogram would otherwise silently absorb a corrupt observation.
    pub fn record_parse(
        &self,
        format: MetricsFormat,
        samples: usize,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Invalid parse duration: {} (must be finite and non-negative)",
                duration_ms
            )));
        }

        self.samples_parsed
            .with_label_values(&[format.as_str()])
            .inc_by(samples as u64);
        self.parse_duration
            .with_label_values(&[format.as_str()])
            .observe(duration_ms);
        Ok(())
    }

    /// Record failed actions from one teardown pass
    pub fn record_teardown_failures(&self, count: usize) {
        self.teardown_failures.inc_by(count as u64);
    }

    pub fn teardown_failures_count(&self) -> u64 {
        self.teardown_failures.get()
    }

    /// Sum of `scrapecheck_tests_total` for one outcome across all tests
    pub fn tests_count(&self, outcome: Outcome) -> u64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == "scrapecheck_tests_total")
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .filter(|m| {
                        m.label
                            .iter()
                            .any(|l| l.name() == "outcome" && l.value() == outcome.as_str())
                    })
                    .map(|m| m.counter.value.unwrap_or(0.0) as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Gather metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding harness metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Prometheus encoder produced invalid UTF-8 at byte {}",
                e.utf8_error().valid_up_to()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_registers_families() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_test("healthy", Outcome::Passed);
        metrics
            .record_parse(MetricsFormat::OpenMetrics, 3, 1.5)
            .expect("valid observation");

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|mf| mf.name().to_string())
            .collect();
        assert!(names.contains(&"scrapecheck_tests_total".to_string()));
        assert!(names.contains(&"scrapecheck_samples_parsed_total".to_string()));
        assert!(names.contains(&"scrapecheck_parse_duration_ms".to_string()));
        assert!(names.contains(&"scrapecheck_teardown_failures_total".to_string()));
    }

    #[test]
    fn test_tests_count_filters_by_outcome() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_test("healthy", Outcome::Passed);
        metrics.record_test("metrics", Outcome::Passed);
        metrics.record_test("metrics", Outcome::Failed);

        assert_eq!(metrics.tests_count(Outcome::Passed), 2);
        assert_eq!(metrics.tests_count(Outcome::Failed), 1);
        assert_eq!(metrics.tests_count(Outcome::Skipped), 0);
    }

    #[test]
    fn test_record_parse_rejects_invalid_durations() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        assert!(metrics.record_parse(MetricsFormat::Protobuf, 1, f64::NAN).is_err());
        assert!(metrics.record_parse(MetricsFormat::Protobuf, 1, -1.0).is_err());
        assert!(metrics.record_parse(MetricsFormat::Protobuf, 1, 0.0).is_ok());
    }

    #[test]
    fn test_gather_produces_text_format() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_teardown_failures(2);
        metrics
            .record_parse(MetricsFormat::PrometheusText, 10, 0.3)
            .expect("valid observation");

        let text = metrics.gather().expect("gather should succeed");
        assert!(text.contains("scrapecheck_teardown_failures_total 2"));
        assert!(text.contains("scrapecheck_samples_parsed_total{format=\"prometheus_text\"} 10"));
        assert_eq!(metrics.teardown_failures_count(), 2);
    }

    #[test]
    fn test_harness_metrics_parse_with_own_parser() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_test("healthy", Outcome::Passed);
        let text = metrics.gather().expect("gather should succeed");

        let parsed = crate::exposition::text::parse(text.as_bytes()).expect("own output parses");
        assert!(
            parsed
                .iter()
                .any(|m| m.name() == "scrapecheck_tests_total" && m.label("outcome") == Some("passed"))
        );
    }
}
