//! Seam between the harness and whatever actually runs exporters

use crate::config::ExporterSpec;
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Handle to a network shared by every environment of one test class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    id: Uuid,
    name: String,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle to one running exporter instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterHandle {
    id: String,
    base_url: String,
}

impl ExporterHandle {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Creates and destroys the resources an exporter environment needs
///
/// Implementations must be safe to call concurrently from several arguments.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create_network(&self, name: &str) -> AppResult<Network>;

    async fn destroy_network(&self, network: &Network) -> AppResult<()>;

    /// Start the exporter described by `spec`, attached to `network`
    async fn start_exporter(&self, spec: &ExporterSpec, network: &Network)
    -> AppResult<ExporterHandle>;

    async fn stop_exporter(&self, handle: &ExporterHandle) -> AppResult<()>;
}

/// Provisioner for exporters that are already running
///
/// The network is a logical handle only and starting an exporter just points
/// at its configured base URL. Nothing is created or destroyed externally.
#[derive(Debug, Default, Clone)]
pub struct StaticProvisioner;

impl StaticProvisioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provisioner for StaticProvisioner {
    async fn create_network(&self, name: &str) -> AppResult<Network> {
        let network = Network::new(name);
        tracing::debug!(network = %network.name(), id = %network.id(), "Logical network created");
        Ok(network)
    }

    async fn destroy_network(&self, network: &Network) -> AppResult<()> {
        tracing::debug!(network = %network.name(), "Logical network destroyed");
        Ok(())
    }

    async fn start_exporter(
        &self,
        spec: &ExporterSpec,
        network: &Network,
    ) -> AppResult<ExporterHandle> {
        if let Some(image) = spec.image() {
            tracing::warn!(
                exporter = %spec.name(),
                image = %image,
                "Static provisioner ignores image hints; using the configured base_url"
            );
        }
        tracing::info!(
            exporter = %spec.name(),
            base_url = %spec.base_url(),
            network = %network.name(),
            "Using already-running exporter"
        );
        Ok(ExporterHandle::new(spec.name(), spec.base_url()))
    }

    async fn stop_exporter(&self, handle: &ExporterHandle) -> AppResult<()> {
        tracing::debug!(exporter = %handle.id(), "Released already-running exporter");
        Ok(())
    }
}
