//! Drives a test class over its arguments with bounded parallelism
//!
//! Hook order per run: `prepare`, then for every argument (at most
//! `parallelism` at a time) `before_all`, each test, `after_all`, and finally
//! `conclude`. Failures are recorded in the [`SuiteReport`]; nothing here
//! aborts the run early except a failed `prepare`.

use crate::config::ExporterSpec;
use crate::error::AppResult;
use crate::metrics::{Metrics, Outcome};
use crate::trap::TeardownFailure;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;

/// A conformance test class: lifecycle hooks plus named tests
#[async_trait]
pub trait TestClass: Send + Sync {
    /// Per-argument state built before `before_all` and consumed by `after_all`
    type Context: Send + Sync;

    fn name(&self) -> &str;

    /// Test names in execution order
    fn tests(&self) -> &[&'static str];

    /// Class-level setup, once per run
    async fn prepare(&self) -> AppResult<()>;

    fn context(&self, argument: ExporterSpec) -> Self::Context;

    async fn before_all(&self, context: &mut Self::Context) -> AppResult<()>;

    async fn run_test(&self, test: &str, context: &Self::Context) -> AppResult<()>;

    /// Argument teardown; always called, even when `before_all` failed
    async fn after_all(&self, context: Self::Context) -> Result<(), TeardownFailure>;

    /// Class-level teardown; called only when `prepare` succeeded
    async fn conclude(&self) -> Result<(), TeardownFailure>;
}

/// Result of one test for one argument
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub test: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything that happened to one argument
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentReport {
    pub argument: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    pub tests: Vec<TestResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teardown_errors: Vec<String>,
}

impl ArgumentReport {
    pub fn is_success(&self) -> bool {
        self.setup_error.is_none()
            && self.teardown_errors.is_empty()
            && self.tests.iter().all(|t| t.outcome == Outcome::Passed)
    }
}

/// Report for a whole run of one test class
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepare_error: Option<String>,
    /// Arguments in the order they were supplied
    pub arguments: Vec<ArgumentReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conclude_errors: Vec<String>,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.prepare_error.is_none()
            && self.conclude_errors.is_empty()
            && self.arguments.iter().all(ArgumentReport::is_success)
    }

    /// Number of test results with `outcome`, across all arguments
    pub fn count(&self, outcome: Outcome) -> usize {
        self.arguments
            .iter()
            .flat_map(|a| &a.tests)
            .filter(|t| t.outcome == outcome)
            .count()
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.class)?;
        if let Some(error) = &self.prepare_error {
            writeln!(f, "  PREPARE FAILED: {}", error)?;
        }

        for argument in &self.arguments {
            writeln!(f, "  {}", argument.argument)?;
            if let Some(error) = &argument.setup_error {
                writeln!(f, "    SETUP FAILED: {}", error)?;
            }
            for result in &argument.tests {
                let tag = match result.outcome {
                    Outcome::Passed => "PASS",
                    Outcome::Failed => "FAIL",
                    Outcome::Skipped => "SKIP",
                };
                match &result.error {
                    Some(error) if result.outcome == Outcome::Failed => {
                        writeln!(f, "    {} {}: {}", tag, result.test, error)?
                    }
                    _ => writeln!(f, "    {} {}", tag, result.test)?,
                }
            }
            for error in &argument.teardown_errors {
                writeln!(f, "    TEARDOWN FAILED: {}", error)?;
            }
        }

        for error in &self.conclude_errors {
            writeln!(f, "  CONCLUDE FAILED: {}", error)?;
        }

        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.count(Outcome::Passed),
            self.count(Outcome::Failed),
            self.count(Outcome::Skipped)
        )
    }
}

/// Executes test classes and records outcomes in the harness metrics
pub struct Runner {
    parallelism: usize,
    metrics: Metrics,
}

impl Runner {
    /// `parallelism` of 0 is treated as 1
    pub fn new(parallelism: usize, metrics: Metrics) -> Self {
        Self {
            parallelism: parallelism.max(1),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn run<C: TestClass>(&self, class: &C, arguments: Vec<ExporterSpec>) -> SuiteReport {
        let mut report = SuiteReport {
            class: class.name().to_string(),
            prepare_error: None,
            arguments: Vec::with_capacity(arguments.len()),
            conclude_errors: Vec::new(),
        };

        tracing::info!(
            class = %class.name(),
            arguments = arguments.len(),
            parallelism = self.parallelism,
            "Starting test class"
        );

        if let Err(e) = class.prepare().await {
            tracing::error!(class = %class.name(), error = %e, "Test class preparation failed");
            report.prepare_error = Some(e.to_string());
            return report;
        }

        let mut results: Vec<(usize, ArgumentReport)> = stream::iter(arguments.into_iter().enumerate())
            .map(|(index, spec)| async move { (index, self.run_argument(class, spec).await) })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);
        report.arguments = results.into_iter().map(|(_, r)| r).collect();

        if let Err(failure) = class.conclude().await {
            self.metrics.record_teardown_failures(failure.len());
            report.conclude_errors = failure.failures().iter().map(ToString::to_string).collect();
        }

        tracing::info!(
            class = %class.name(),
            passed = report.count(Outcome::Passed),
            failed = report.count(Outcome::Failed),
            skipped = report.count(Outcome::Skipped),
            success = report.is_success(),
            "Test class finished"
        );
        report
    }

    async fn run_argument<C: TestClass>(&self, class: &C, spec: ExporterSpec) -> ArgumentReport {
        let argument = spec.name().to_string();
        let mut context = class.context(spec);
        let mut report = ArgumentReport {
            argument: argument.clone(),
            setup_error: None,
            tests: Vec::with_capacity(class.tests().len()),
            teardown_errors: Vec::new(),
        };

        match class.before_all(&mut context).await {
            Ok(()) => {
                for test in class.tests() {
                    let result = match class.run_test(test, &context).await {
                        Ok(()) => {
                            tracing::info!(argument = %argument, test = %test, "Test passed");
                            TestResult {
                                test: test.to_string(),
                                outcome: Outcome::Passed,
                                error: None,
                            }
                        }
                        Err(e) => {
                            tracing::warn!(argument = %argument, test = %test, error = %e, "Test failed");
                            TestResult {
                                test: test.to_string(),
                                outcome: Outcome::Failed,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    self.metrics.record_test(test, result.outcome);
                    report.tests.push(result);
                }
            }
            Err(e) => {
                tracing::error!(argument = %argument, error = %e, "Argument setup failed; skipping its tests");
                report.setup_error = Some(e.to_string());
                for test in class.tests() {
                    self.metrics.record_test(test, Outcome::Skipped);
                    report.tests.push(TestResult {
                        test: test.to_string(),
                        outcome: Outcome::Skipped,
                        error: None,
                    });
                }
            }
        }

        if let Err(failure) = class.after_all(context).await {
            self.metrics.record_teardown_failures(failure.len());
            report.teardown_errors = failure.failures().iter().map(ToString::to_string).collect();
        }

        report
    }
}
