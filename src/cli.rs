//! Command-line interface for scrapecheck
//!
//! Provides argument parsing and subcommand handling for the scrapecheck binary.

use clap::{Parser, Subcommand};

/// Conformance checks for Prometheus metrics exporters
#[derive(Parser)]
#[command(name = "scrapecheck")]
#[command(version)]
#[command(about = "Conformance checks for Prometheus metrics exporters")]
#[command(
    long_about = "scrapecheck scrapes one or more running exporters in every negotiated \
    exposition format (Prometheus text, OpenMetrics, delimited protobuf), parses the \
    responses and checks them for conformance. Exits non-zero if any check fails."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the conformance suite against every configured exporter (default)
    Run {
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the harness's own metrics in Prometheus text format to this path
        #[arg(long)]
        metrics_file: Option<String>,
    },

    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Parse a saved scrape body and print the samples it contains
    Parse {
        /// File holding the raw response body
        file: String,

        /// Content-Type the body was served with
        #[arg(long)]
        content_type: String,

        /// Print samples as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# scrapecheck Configuration
# ==========================
#
# Lists the exporters to check and how the conformance run is scheduled.

# ─────────────────────────────────────────────────────────────────────────────
# RUN CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[run]
# Exporters checked concurrently (1-64)
parallelism = 4

# Per-request HTTP timeout in seconds (1-300)
request_timeout_seconds = 10

# How long to wait for /-/healthy to answer 200 before giving up (1-600)
readiness_timeout_seconds = 60

# Delay between readiness probes in milliseconds
readiness_poll_interval_ms = 250

# Exact body a healthy exporter serves on /-/healthy
healthy_response = "Exporter is healthy.\n"

# ─────────────────────────────────────────────────────────────────────────────
# EXPORTERS
# ─────────────────────────────────────────────────────────────────────────────
#
# Each entry is one test argument. Exporters must already be running;
# base_url is the scheme, host and port without a path.

[[exporters]]
name = "java-agent"
base_url = "http://localhost:8888"

# [[exporters]]
# name = "standalone"
# base_url = "http://localhost:8889"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# trace, debug, info, warn or error (RUST_LOG overrides)
log_level = "info"
"#
}
