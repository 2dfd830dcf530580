//! Normalized metric sample model
//!
//! Every wire format is reduced to a flat list of [`Metric`] samples.
//! Identity is the `(name, labels)` pair; the value is payload.

use serde::Serialize;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Label set of a single sample, keyed by label name
pub type Labels = BTreeMap<String, String>;

/// Metric family type, when the source format declares one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    /// Convert to the exposition format type keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        }
    }
}

/// Identity of a sample: its name plus its full label set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub name: String,
    pub labels: Labels,
}

/// One parsed metric sample
///
/// The name is fixed at construction. Equality and hashing only consider
/// `(name, labels)`, so two scrapes of the same series compare equal even
/// when their values differ.
#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    name: String,
    labels: Labels,
    value: f64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    metric_type: Option<MetricType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, labels: Labels, value: f64) -> Self {
        Self {
            name: name.into(),
            labels,
            value,
            metric_type: None,
            help: None,
        }
    }

    pub fn with_type(mut self, metric_type: Option<MetricType>) -> Self {
        self.metric_type = metric_type;
        self
    }

    pub fn with_help(mut self, help: Option<String>) -> Self {
        self.help = help;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Look up a single label value
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn metric_type(&self) -> Option<MetricType> {
        self.metric_type
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Owned identity key, usable in sets and maps
    pub fn key(&self) -> MetricKey {
        MetricKey {
            name: self.name.clone(),
            labels: self.labels.clone(),
        }
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.labels == other.labels
    }
}

impl Eq for Metric {}

impl Hash for Metric {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.labels.hash(state);
    }
}

/// Render a float the way bucket and quantile labels are compared
///
/// Special values use the exposition spellings; everything else uses the
/// shortest decimal that round-trips, so `1.0` and `1` both become `"1"`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
