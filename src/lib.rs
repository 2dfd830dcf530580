//! scrapecheck - conformance harness for Prometheus metrics exporters
//!
//! This library scrapes exporters in every negotiated exposition format,
//! normalizes the responses into one metric model and checks them, with
//! fault-aggregating teardown of the per-exporter test environments.

pub mod assertions;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod exposition;
pub mod http;
pub mod metrics;
pub mod runner;
pub mod suite;
pub mod telemetry;
pub mod trap;
