//! Configuration management for scrapecheck
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::assertions::HEALTHY_RESPONSE;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    pub exporters: Vec<ExporterSpec>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Scheduling and timing of a conformance run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Number of exporter environments exercised concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// How long to poll `/-/healthy` before giving up on an exporter
    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout_seconds: u64,
    #[serde(default = "default_readiness_poll_interval")]
    pub readiness_poll_interval_ms: u64,
    /// Literal body a healthy exporter returns on `/-/healthy`
    #[serde(default = "default_healthy_response")]
    pub healthy_response: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            request_timeout_seconds: default_request_timeout(),
            readiness_timeout_seconds: default_readiness_timeout(),
            readiness_poll_interval_ms: default_readiness_poll_interval(),
            healthy_response: default_healthy_response(),
        }
    }
}

impl RunConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_seconds)
    }

    pub fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }
}

fn default_parallelism() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    10
}

fn default_readiness_timeout() -> u64 {
    60
}

fn default_readiness_poll_interval() -> u64 {
    250
}

fn default_healthy_response() -> String {
    HEALTHY_RESPONSE.to_string()
}

/// One exporter under test; each becomes a test argument
///
/// Fields are private so validated configuration cannot be mutated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExporterSpec {
    name: String,
    base_url: String,
    /// Image or launch mode hint for provisioners that start exporters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

impl ExporterSpec {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Exporter name, used in reports and resource names
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate semantic constraints that serde cannot express
    pub fn validate(&self) -> AppResult<()> {
        let run = &self.run;

        if !(1..=64).contains(&run.parallelism) {
            return Err(AppError::Config(format!(
                "run.parallelism must be between 1 and 64, got {}",
                run.parallelism
            )));
        }
        if !(1..=300).contains(&run.request_timeout_seconds) {
            return Err(AppError::Config(format!(
                "run.request_timeout_seconds must be between 1 and 300, got {}",
                run.request_timeout_seconds
            )));
        }
        if !(1..=600).contains(&run.readiness_timeout_seconds) {
            return Err(AppError::Config(format!(
                "run.readiness_timeout_seconds must be between 1 and 600, got {}",
                run.readiness_timeout_seconds
            )));
        }
        if run.readiness_poll_interval_ms == 0 {
            return Err(AppError::Config(
                "run.readiness_poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.exporters.is_empty() {
            return Err(AppError::Config(
                "at least one [[exporters]] entry is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for exporter in &self.exporters {
            if exporter.name.trim().is_empty() {
                return Err(AppError::Config(
                    "exporter name must not be empty".to_string(),
                ));
            }
            if !seen.insert(exporter.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate exporter name '{}'",
                    exporter.name
                )));
            }
            if !(exporter.base_url.starts_with("http://")
                || exporter.base_url.starts_with("https://"))
            {
                return Err(AppError::Config(format!(
                    "exporter '{}' base_url must start with http:// or https://, got '{}'",
                    exporter.name, exporter.base_url
                )));
            }
        }

        tracing::debug!(
            exporters = self.exporters.len(),
            parallelism = run.parallelism,
            "Configuration validated"
        );
        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
            path: "<string>".to_string(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }
}
