//! Multi-format metrics parsing
//!
//! Normalizes the three negotiated exposition encodings (Prometheus text,
//! OpenMetrics text and delimited protobuf) into one [`Metric`] model.

pub mod format;
pub mod model;
pub mod openmetrics;
pub mod parser;
pub mod proto;
pub mod protobuf;
pub mod text;

pub use format::{
    MetricsFormat, OPENMETRICS_CONTENT_TYPE, PROMETHEUS_TEXT_CONTENT_TYPE, PROTOBUF_CONTENT_TYPE,
};
pub use model::{Labels, Metric, MetricKey, MetricType, format_float};
pub use parser::MetricsParser;
