//! Per-argument exporter environments and the resources they share
//!
//! One [`ExporterTestEnvironment`] exists per test argument and is never
//! shared. The network it joins is shared by every environment of a test
//! class through a [`SharedResourceRegistry`].

pub mod provisioner;
pub mod readiness;
pub mod registry;

pub use provisioner::{ExporterHandle, Network, Provisioner, StaticProvisioner};
pub use readiness::wait_until_ready;
pub use registry::SharedResourceRegistry;

use crate::config::ExporterSpec;
use crate::error::AppResult;
use crate::http::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Path of the exporter health endpoint
pub const HEALTHY_PATH: &str = "/-/healthy";

/// Path of the exporter scrape endpoint
pub const METRICS_PATH: &str = "/metrics";

/// A running exporter plus the shared network it is attached to
#[derive(Debug)]
pub struct ExporterTestEnvironment {
    id: Uuid,
    spec: ExporterSpec,
    network: Arc<Network>,
    exporter: ExporterHandle,
}

impl ExporterTestEnvironment {
    /// Start the exporter for `spec` on `network`
    pub async fn start(
        provisioner: &dyn Provisioner,
        spec: ExporterSpec,
        network: Arc<Network>,
    ) -> AppResult<Self> {
        let exporter = provisioner.start_exporter(&spec, &network).await?;
        let environment = Self {
            id: Uuid::new_v4(),
            spec,
            network,
            exporter,
        };

        tracing::info!(
            environment_id = %environment.id,
            exporter = %environment.spec.name(),
            base_url = %environment.base_url(),
            "Exporter environment started"
        );
        Ok(environment)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spec(&self) -> &ExporterSpec {
        &self.spec
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Base URL of the running exporter, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.exporter.base_url()
    }

    /// Absolute URL for `path` on the exporter
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Block until `/-/healthy` answers 200
    pub async fn wait_until_ready(
        &self,
        client: &HttpClient,
        timeout: Duration,
        poll_interval: Duration,
    ) -> AppResult<()> {
        wait_until_ready(client, &self.url(HEALTHY_PATH), timeout, poll_interval).await
    }

    /// Stop the exporter; the shared network is released separately
    pub async fn destroy(self, provisioner: &dyn Provisioner) -> AppResult<()> {
        provisioner.stop_exporter(&self.exporter).await?;
        tracing::info!(
            environment_id = %self.id,
            exporter = %self.spec.name(),
            "Exporter environment destroyed"
        );
        Ok(())
    }
}
