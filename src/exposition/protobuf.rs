//! Length-delimited protobuf format
//!
//! The body is a sequence of `varint length || MetricFamily` frames. Each
//! family expands into one [`Metric`] per sample, using the same sample names
//! the text formats would produce (`_bucket`/`_sum`/`_count` for histograms,
//! `quantile` samples plus `_sum`/`_count` for summaries).

use super::model::{Labels, Metric, MetricType, format_float};
use super::proto;
use super::MetricsFormat;
use crate::error::{AppError, AppResult, Location};
use prost::Message;

/// Parse a delimited protobuf body
pub fn parse(body: &[u8]) -> AppResult<Vec<Metric>> {
    let mut metrics = Vec::new();
    let mut cursor: &[u8] = body;

    while !cursor.is_empty() {
        let offset = body.len() - cursor.len();
        let violation = |reason: String| {
            AppError::format_violation(MetricsFormat::Protobuf, Location::ByteOffset(offset), reason)
        };

        let len = prost::decode_length_delimiter(&mut cursor)
            .map_err(|e| violation(format!("invalid length prefix: {}", e)))?;

        if len > cursor.len() {
            return Err(violation(format!(
                "truncated message: prefix declares {} bytes but only {} remain",
                len,
                cursor.len()
            )));
        }

        let (frame, rest) = cursor.split_at(len);
        let family = proto::MetricFamily::decode(frame)
            .map_err(|e| violation(format!("undecodable MetricFamily: {}", e)))?;
        expand_family(family, &mut metrics).map_err(violation)?;

        cursor = rest;
    }

    Ok(metrics)
}

fn expand_family(family: proto::MetricFamily, out: &mut Vec<Metric>) -> Result<(), String> {
    let name = family.name.unwrap_or_default();
    if name.is_empty() {
        return Err("metric family without a name".to_string());
    }

    let family_type = match family.r#type {
        None => proto::MetricType::Counter,
        Some(raw) => proto::MetricType::try_from(raw)
            .map_err(|_| format!("unknown metric type {} for {}", raw, name))?,
    };
    let metric_type = match family_type {
        proto::MetricType::Counter => MetricType::Counter,
        proto::MetricType::Gauge => MetricType::Gauge,
        proto::MetricType::Summary => MetricType::Summary,
        proto::MetricType::Untyped => MetricType::Untyped,
        proto::MetricType::Histogram | proto::MetricType::GaugeHistogram => MetricType::Histogram,
    };

    let help = family.help.filter(|h| !h.is_empty());
    let mut emit = |sample_name: String, labels: Labels, value: f64| {
        out.push(
            Metric::new(sample_name, labels, value)
                .with_type(Some(metric_type))
                .with_help(help.clone()),
        );
    };

    for metric in family.metric {
        let labels = label_set(&metric.label, &name)?;

        match family_type {
            proto::MetricType::Counter => {
                let counter = metric.counter.ok_or_else(|| missing_value("counter", &name))?;
                emit(name.clone(), labels, counter.value.unwrap_or_default());
            }
            proto::MetricType::Gauge => {
                let gauge = metric.gauge.ok_or_else(|| missing_value("gauge", &name))?;
                emit(name.clone(), labels, gauge.value.unwrap_or_default());
            }
            proto::MetricType::Untyped => {
                let untyped = metric.untyped.ok_or_else(|| missing_value("untyped", &name))?;
                emit(name.clone(), labels, untyped.value.unwrap_or_default());
            }
            proto::MetricType::Summary => {
                let summary = metric.summary.ok_or_else(|| missing_value("summary", &name))?;
                reject_reserved_label(&labels, "quantile", &name)?;
                for quantile in &summary.quantile {
                    let mut quantile_labels = labels.clone();
                    quantile_labels.insert(
                        "quantile".to_string(),
                        format_float(quantile.quantile.unwrap_or_default()),
                    );
                    emit(name.clone(), quantile_labels, quantile.value.unwrap_or_default());
                }
                emit(
                    format!("{}_sum", name),
                    labels.clone(),
                    summary.sample_sum.unwrap_or_default(),
                );
                emit(
                    format!("{}_count", name),
                    labels,
                    summary.sample_count.unwrap_or_default() as f64,
                );
            }
            proto::MetricType::Histogram | proto::MetricType::GaugeHistogram => {
                let histogram = metric
                    .histogram
                    .ok_or_else(|| missing_value("histogram", &name))?;
                reject_reserved_label(&labels, "le", &name)?;
                let count = histogram
                    .sample_count_float
                    .unwrap_or(histogram.sample_count.unwrap_or_default() as f64);

                let mut saw_inf = false;
                for bucket in &histogram.bucket {
                    let bound = bucket.upper_bound.unwrap_or_default();
                    saw_inf |= bound == f64::INFINITY;
                    let cumulative = bucket
                        .cumulative_count_float
                        .unwrap_or(bucket.cumulative_count.unwrap_or_default() as f64);

                    let mut bucket_labels = labels.clone();
                    bucket_labels.insert("le".to_string(), format_float(bound));
                    emit(format!("{}_bucket", name), bucket_labels, cumulative);
                }
                if !saw_inf {
                    let mut inf_labels = labels.clone();
                    inf_labels.insert("le".to_string(), format_float(f64::INFINITY));
                    emit(format!("{}_bucket", name), inf_labels, count);
                }

                let (sum_name, count_name) = match family_type {
                    proto::MetricType::GaugeHistogram => ("_gsum", "_gcount"),
                    _ => ("_sum", "_count"),
                };
                emit(
                    format!("{}{}", name, sum_name),
                    labels.clone(),
                    histogram.sample_sum.unwrap_or_default(),
                );
                emit(format!("{}{}", name, count_name), labels, count);
            }
        }
    }

    Ok(())
}

fn missing_value(kind: &str, family: &str) -> String {
    format!("{} family {} has a sample without a {} value", kind, family, kind)
}

/// `le` and `quantile` are generated per bucket or quantile and may not be user labels
fn reject_reserved_label(labels: &Labels, reserved: &str, family: &str) -> Result<(), String> {
    if labels.contains_key(reserved) {
        return Err(format!("reserved label {} set on family {}", reserved, family));
    }
    Ok(())
}

fn label_set(pairs: &[proto::LabelPair], family: &str) -> Result<Labels, String> {
    let mut labels = Labels::new();
    for pair in pairs {
        let name = pair.name.clone().unwrap_or_default();
        if name.is_empty() {
            return Err(format!("empty label name in family {}", family));
        }
        let value = pair.value.clone().unwrap_or_default();
        if labels.insert(name.clone(), value).is_some() {
            return Err(format!("duplicate label {} in family {}", name, family));
        }
    }
    Ok(labels)
}
