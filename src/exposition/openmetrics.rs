//! OpenMetrics text format (`application/openmetrics-text; version=1.0.0`)
//!
//! Shares the sample grammar with the Prometheus text format and adds the
//! OpenMetrics rules: a mandatory `# EOF` terminator, no free-form comments
//! or blank lines, `# UNIT` metadata and exemplar trailers. Exemplars are
//! validated and then dropped.

use super::model::Metric;
use super::text::{self, Cursor, Dialect, FamilyKind};
use crate::error::AppResult;

/// Parse an OpenMetrics text body
pub fn parse(body: &[u8]) -> AppResult<Vec<Metric>> {
    text::parse_lines(body, Dialect::OpenMetrics)
}

pub(crate) fn family_kind(keyword: &str) -> Option<FamilyKind> {
    match keyword {
        "counter" => Some(FamilyKind::Counter),
        "gauge" => Some(FamilyKind::Gauge),
        "histogram" => Some(FamilyKind::Histogram),
        "gaugehistogram" => Some(FamilyKind::GaugeHistogram),
        "summary" => Some(FamilyKind::Summary),
        "info" => Some(FamilyKind::Info),
        "stateset" => Some(FamilyKind::StateSet),
        "unknown" => Some(FamilyKind::Untyped),
        _ => None,
    }
}

/// Consume an exemplar trailer: `# {labels} value [timestamp]`
pub(crate) fn parse_exemplar(cursor: &mut Cursor<'_>) -> Result<(), String> {
    if !cursor.eat('#') || cursor.skip_blanks() == 0 || !cursor.eat('{') {
        return Err(format!("malformed exemplar {:?}", cursor.rest()));
    }

    text::parse_labels(cursor)?;

    if cursor.skip_blanks() == 0 {
        return Err("expected exemplar value".to_string());
    }
    text::parse_value(cursor.take_while(|c| c != ' ' && c != '\t'))?;

    if cursor.skip_blanks() > 0 && !cursor.is_done() {
        text::parse_timestamp(
            cursor.take_while(|c| c != ' ' && c != '\t'),
            Dialect::OpenMetrics,
        )?;
        cursor.skip_blanks();
    }

    if !cursor.is_done() {
        return Err(format!(
            "unexpected content after exemplar {:?}",
            cursor.rest()
        ));
    }
    Ok(())
}
