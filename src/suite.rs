//! The lower-case-output-names conformance suite
//!
//! Each argument is one exporter. The suite checks the health endpoint, then
//! scrapes `/metrics` with and without an `Accept` header for every supported
//! format and asserts that every metric name comes out lowercase.

use crate::assertions::{
    assert_common_metrics_response, assert_healthy_response_with, assert_lowercase_names,
    assert_negotiated_format, assert_non_empty,
};
use crate::config::{Config, ExporterSpec, RunConfig};
use crate::environment::{
    ExporterTestEnvironment, HEALTHY_PATH, METRICS_PATH, Network, Provisioner,
    SharedResourceRegistry, StaticProvisioner,
};
use crate::error::{AppError, AppResult};
use crate::exposition::{MetricsFormat, MetricsParser};
use crate::http::HttpClient;
use crate::metrics::Metrics;
use crate::runner::TestClass;
use crate::trap::{TeardownFailure, Trap, TrapAggregator};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub const CLASS_NAME: &str = "lower_case_output_names";

/// Tests in execution order
pub const TESTS: &[&str] = &[
    "healthy",
    "metrics",
    "metrics_openmetrics_format",
    "metrics_prometheus_format",
    "metrics_prometheus_protobuf_format",
];

/// Per-argument state: what `before_all` managed to acquire
///
/// `after_all` tears down exactly what is recorded here, so a half-finished
/// setup is still cleaned up.
#[derive(Debug)]
pub struct ArgumentContext {
    spec: ExporterSpec,
    network: Option<Arc<Network>>,
    environment: Option<ExporterTestEnvironment>,
}

impl ArgumentContext {
    pub fn spec(&self) -> &ExporterSpec {
        &self.spec
    }

    pub fn environment(&self) -> Option<&ExporterTestEnvironment> {
        self.environment.as_ref()
    }
}

pub struct LowerCaseOutputNames {
    provisioner: Arc<dyn Provisioner>,
    networks: Arc<SharedResourceRegistry<Network>>,
    scope: String,
    client: HttpClient,
    run: RunConfig,
    metrics: Metrics,
}

impl LowerCaseOutputNames {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        client: HttpClient,
        run: RunConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            provisioner,
            networks: Arc::new(SharedResourceRegistry::new()),
            scope: CLASS_NAME.to_string(),
            client,
            run,
            metrics,
        }
    }

    /// Suite against already-running exporters, as named in `config`
    pub fn from_config(config: &Config, metrics: Metrics) -> AppResult<Self> {
        let client = HttpClient::new(config.run.request_timeout())?;
        Ok(Self::new(
            Arc::new(StaticProvisioner::new()),
            client,
            config.run.clone(),
            metrics,
        ))
    }

    /// References currently held on the shared network
    pub async fn network_refs(&self) -> usize {
        self.networks.ref_count(&self.scope).await
    }

    async fn acquire_network(&self) -> AppResult<Arc<Network>> {
        let provisioner = self.provisioner.clone();
        let name = format!("scrapecheck-{}", Uuid::new_v4().simple());
        self.networks
            .acquire(&self.scope, || async move {
                provisioner.create_network(&name).await
            })
            .await
    }

    /// Owned release of one network reference, suitable for a trap
    fn release_network(&self) -> impl Future<Output = AppResult<()>> + Send + 'static {
        let networks = self.networks.clone();
        let provisioner = self.provisioner.clone();
        let scope = self.scope.clone();
        async move {
            networks
                .release(&scope, |network| async move {
                    provisioner.destroy_network(&network).await
                })
                .await
                .map(|_| ())
        }
    }

    async fn test_healthy(&self, environment: &ExporterTestEnvironment) -> AppResult<()> {
        let response = self
            .client
            .send_request(&environment.url(HEALTHY_PATH))
            .await?;
        assert_healthy_response_with(&response, &self.run.healthy_response)
    }

    /// Scrape `/metrics`, optionally negotiating `requested`, and check names
    async fn test_metrics(
        &self,
        environment: &ExporterTestEnvironment,
        requested: Option<MetricsFormat>,
    ) -> AppResult<()> {
        let url = environment.url(METRICS_PATH);
        let response = match requested {
            Some(format) => {
                self.client
                    .send_request_with_accept(&url, format.content_type())
                    .await?
            }
            None => self.client.send_request(&url).await?,
        };

        let negotiated = assert_common_metrics_response(&response)?;
        if let Some(expected) = requested {
            assert_negotiated_format(&response, expected)?;
        }

        let started = Instant::now();
        let metrics = MetricsParser::parse_collection(&response)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Err(e) = self.metrics.record_parse(negotiated, metrics.len(), elapsed_ms) {
            tracing::warn!(error = %e, "Failed to record parse metrics");
        }

        tracing::debug!(
            exporter = %environment.spec().name(),
            format = negotiated.as_str(),
            samples = metrics.len(),
            "Scraped exporter"
        );

        assert_non_empty(&metrics)?;
        assert_lowercase_names(&metrics)
    }
}

#[async_trait]
impl TestClass for LowerCaseOutputNames {
    type Context = ArgumentContext;

    fn name(&self) -> &str {
        CLASS_NAME
    }

    fn tests(&self) -> &[&'static str] {
        TESTS
    }

    /// Take the class-scope network reference held until `conclude`
    async fn prepare(&self) -> AppResult<()> {
        let network = self.acquire_network().await?;
        tracing::info!(network = %network.name(), "Shared network ready");
        Ok(())
    }

    fn context(&self, argument: ExporterSpec) -> ArgumentContext {
        ArgumentContext {
            spec: argument,
            network: None,
            environment: None,
        }
    }

    async fn before_all(&self, context: &mut ArgumentContext) -> AppResult<()> {
        let network = self.acquire_network().await?;
        context.network = Some(network.clone());

        let environment =
            ExporterTestEnvironment::start(self.provisioner.as_ref(), context.spec.clone(), network)
                .await?;
        let ready = environment
            .wait_until_ready(
                &self.client,
                self.run.readiness_timeout(),
                self.run.readiness_poll_interval(),
            )
            .await;
        context.environment = Some(environment);
        ready
    }

    async fn run_test(&self, test: &str, context: &ArgumentContext) -> AppResult<()> {
        let environment = context.environment.as_ref().ok_or_else(|| {
            AppError::Internal(format!(
                "exporter environment for '{}' was never started",
                context.spec.name()
            ))
        })?;

        match test {
            "healthy" => self.test_healthy(environment).await,
            "metrics" => self.test_metrics(environment, None).await,
            "metrics_openmetrics_format" => {
                self.test_metrics(environment, Some(MetricsFormat::OpenMetrics))
                    .await
            }
            "metrics_prometheus_format" => {
                self.test_metrics(environment, Some(MetricsFormat::PrometheusText))
                    .await
            }
            "metrics_prometheus_protobuf_format" => {
                self.test_metrics(environment, Some(MetricsFormat::Protobuf))
                    .await
            }
            other => Err(AppError::Internal(format!("unknown test '{}'", other))),
        }
    }

    async fn after_all(&self, context: ArgumentContext) -> Result<(), TeardownFailure> {
        let ArgumentContext {
            spec,
            network,
            environment,
        } = context;

        let mut traps = TrapAggregator::new();
        if let Some(environment) = environment {
            let provisioner = self.provisioner.clone();
            traps.push(
                Trap::from_future(async move { environment.destroy(provisioner.as_ref()).await })
                    .with_label(format!("destroy environment {}", spec.name())),
            );
        }
        if network.is_some() {
            traps.push(Trap::from_future(self.release_network()).with_label("release network"));
        }
        traps.run().await
    }

    /// Drop the class-scope reference; destroys the network if no argument holds it
    async fn conclude(&self) -> Result<(), TeardownFailure> {
        Trap::assert_empty([
            Trap::from_future(self.release_network()).with_label("release class network")
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> LowerCaseOutputNames {
        LowerCaseOutputNames::new(
            Arc::new(StaticProvisioner::new()),
            HttpClient::new(std::time::Duration::from_secs(1)).unwrap(),
            RunConfig::default(),
            Metrics::new().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_before_setup_is_internal_error() {
        let suite = suite();
        let context = suite.context(ExporterSpec::new("a", "http://localhost:1"));
        let err = suite.run_test("metrics", &context).await.unwrap_err();
        assert!(err.to_string().contains("never started"));
    }

    #[tokio::test]
    async fn test_prepare_and_conclude_balance_references() {
        let suite = suite();
        suite.prepare().await.unwrap();
        assert_eq!(suite.network_refs().await, 1);
        suite.conclude().await.unwrap();
        assert_eq!(suite.network_refs().await, 0);
    }

    #[tokio::test]
    async fn test_after_all_without_setup_is_noop() {
        let suite = suite();
        let context = suite.context(ExporterSpec::new("a", "http://localhost:1"));
        assert!(suite.after_all(context).await.is_ok());
    }
}
