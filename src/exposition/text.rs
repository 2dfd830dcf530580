//! Prometheus text exposition format (`text/plain; version=0.0.4`)
//!
//! The line grammar here is shared with the OpenMetrics variant, which layers
//! its stricter rules on top via [`Dialect::OpenMetrics`].
//!
//! Parsing is strict: a line that is neither a comment nor a well-formed
//! sample aborts the whole parse with the offending line number.

use super::model::{Labels, Metric, MetricType, format_float};
use super::openmetrics;
use super::MetricsFormat;
use crate::error::{AppError, AppResult, Location};
use std::collections::HashMap;

/// Parse a Prometheus text exposition body
pub fn parse(body: &[u8]) -> AppResult<Vec<Metric>> {
    parse_lines(body, Dialect::Prometheus)
}

/// Which text grammar a body follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Prometheus,
    OpenMetrics,
}

impl Dialect {
    fn format(self) -> MetricsFormat {
        match self {
            Dialect::Prometheus => MetricsFormat::PrometheusText,
            Dialect::OpenMetrics => MetricsFormat::OpenMetrics,
        }
    }
}

/// Family type as declared by a `# TYPE` line
///
/// Wider than [`MetricType`] because the suffix rules differ per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FamilyKind {
    Counter,
    Gauge,
    Histogram,
    GaugeHistogram,
    Summary,
    Info,
    StateSet,
    Untyped,
}

impl FamilyKind {
    fn from_keyword(keyword: &str, dialect: Dialect) -> Option<Self> {
        match dialect {
            Dialect::Prometheus => match keyword {
                "counter" => Some(Self::Counter),
                "gauge" => Some(Self::Gauge),
                "histogram" => Some(Self::Histogram),
                "summary" => Some(Self::Summary),
                "untyped" => Some(Self::Untyped),
                _ => None,
            },
            Dialect::OpenMetrics => openmetrics::family_kind(keyword),
        }
    }

    fn metric_type(self) -> MetricType {
        match self {
            FamilyKind::Counter => MetricType::Counter,
            FamilyKind::Gauge | FamilyKind::Info | FamilyKind::StateSet => MetricType::Gauge,
            FamilyKind::Histogram | FamilyKind::GaugeHistogram => MetricType::Histogram,
            FamilyKind::Summary => MetricType::Summary,
            FamilyKind::Untyped => MetricType::Untyped,
        }
    }

    fn allows_suffix(self, suffix: &str) -> bool {
        let allowed: &[&str] = match self {
            FamilyKind::Counter => &["_total", "_created"],
            FamilyKind::Histogram => &["_bucket", "_sum", "_count", "_created"],
            FamilyKind::GaugeHistogram => &["_bucket", "_gsum", "_gcount"],
            FamilyKind::Summary => &["_sum", "_count", "_created"],
            FamilyKind::Info => &["_info"],
            FamilyKind::Gauge | FamilyKind::StateSet | FamilyKind::Untyped => &[],
        };
        allowed.contains(&suffix)
    }
}

const SAMPLE_SUFFIXES: [&str; 8] = [
    "_total", "_created", "_bucket", "_sum", "_count", "_gsum", "_gcount", "_info",
];

#[derive(Debug, Default)]
struct FamilyMeta {
    kind: Option<FamilyKind>,
    help: Option<String>,
}

/// HELP/TYPE metadata collected while scanning, attached to samples afterwards
#[derive(Debug, Default)]
struct Families {
    by_name: HashMap<String, FamilyMeta>,
}

impl Families {
    fn set_help(&mut self, name: &str, help: String) -> Result<(), String> {
        let meta = self.by_name.entry(name.to_string()).or_default();
        if meta.help.replace(help).is_some() {
            return Err(format!("duplicate HELP line for {}", name));
        }
        Ok(())
    }

    fn set_kind(&mut self, name: &str, kind: FamilyKind) -> Result<(), String> {
        let meta = self.by_name.entry(name.to_string()).or_default();
        if meta.kind.replace(kind).is_some() {
            return Err(format!("duplicate TYPE line for {}", name));
        }
        Ok(())
    }

    fn resolve(&self, sample_name: &str) -> Option<&FamilyMeta> {
        if let Some(meta) = self.by_name.get(sample_name) {
            return Some(meta);
        }
        SAMPLE_SUFFIXES.iter().find_map(|suffix| {
            let base = sample_name.strip_suffix(suffix)?;
            let meta = self.by_name.get(base)?;
            meta.kind
                .is_some_and(|kind| kind.allows_suffix(suffix))
                .then_some(meta)
        })
    }

    fn attach(&self, sample: RawSample) -> Metric {
        let RawSample { name, mut labels, value } = sample;
        canonicalize_bound_labels(&mut labels);

        let meta = self.resolve(&name);
        let metric_type = meta.and_then(|m| m.kind).map(FamilyKind::metric_type);
        let help = meta.and_then(|m| m.help.clone());

        Metric::new(name, labels, value)
            .with_type(metric_type)
            .with_help(help)
    }
}

/// Re-render `le` and `quantile` so equal bounds compare equal across formats
pub(crate) fn canonicalize_bound_labels(labels: &mut Labels) {
    for key in ["le", "quantile"] {
        if let Some(raw) = labels.get_mut(key) {
            if let Ok(bound) = parse_value(raw) {
                *raw = format_float(bound);
            }
        }
    }
}

#[derive(Debug)]
struct RawSample {
    name: String,
    labels: Labels,
    value: f64,
}

enum Comment {
    Help { name: String, text: String },
    Type { name: String, kind: FamilyKind },
    Unit,
    Eof,
    Other,
}

pub(crate) fn parse_lines(body: &[u8], dialect: Dialect) -> AppResult<Vec<Metric>> {
    let format = dialect.format();
    let text = std::str::from_utf8(body).map_err(|e| {
        AppError::format_violation(
            format,
            Location::ByteOffset(e.valid_up_to()),
            "body is not valid UTF-8",
        )
    })?;

    let mut families = Families::default();
    let mut samples = Vec::new();
    let mut eof_line: Option<usize> = None;
    let mut line_count = 0;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        line_count = line_no;
        let violation =
            |reason: String| AppError::format_violation(format, Location::Line(line_no), reason);

        if let Some(eof) = eof_line {
            return Err(violation(format!("content after # EOF on line {}", eof)));
        }

        let line = match dialect {
            Dialect::Prometheus => raw_line.trim_start_matches([' ', '\t']),
            Dialect::OpenMetrics => raw_line,
        };

        if line.trim().is_empty() {
            match dialect {
                Dialect::Prometheus => continue,
                Dialect::OpenMetrics => return Err(violation("blank line".to_string())),
            }
        }

        if line.starts_with('#') {
            match parse_comment(line, dialect).map_err(violation)? {
                Comment::Help { name, text } => families.set_help(&name, text).map_err(violation)?,
                Comment::Type { name, kind } => families.set_kind(&name, kind).map_err(violation)?,
                Comment::Eof => eof_line = Some(line_no),
                Comment::Unit | Comment::Other => {}
            }
            continue;
        }

        samples.push(parse_sample(line, dialect).map_err(violation)?);
    }

    if dialect == Dialect::OpenMetrics && eof_line.is_none() {
        return Err(AppError::format_violation(
            format,
            Location::Line(line_count + 1),
            "missing # EOF terminator",
        ));
    }

    Ok(samples
        .into_iter()
        .map(|sample| families.attach(sample))
        .collect())
}

fn parse_comment(line: &str, dialect: Dialect) -> Result<Comment, String> {
    let (keyword, rest) = split_token(&line[1..]);

    match (keyword, dialect) {
        ("HELP", _) => {
            let (name, text) = split_token(rest);
            validate_metric_name(name)?;
            Ok(Comment::Help {
                name: name.to_string(),
                text: unescape_help(text.trim_start_matches([' ', '\t']), dialect),
            })
        }
        ("TYPE", _) => {
            let (name, keyword) = split_token(rest);
            validate_metric_name(name)?;
            let keyword = keyword.trim();
            let kind = FamilyKind::from_keyword(keyword, dialect)
                .ok_or_else(|| format!("unknown metric type {:?} for {}", keyword, name))?;
            Ok(Comment::Type {
                name: name.to_string(),
                kind,
            })
        }
        ("UNIT", Dialect::OpenMetrics) => {
            let (name, _) = split_token(rest);
            validate_metric_name(name)?;
            Ok(Comment::Unit)
        }
        ("EOF", Dialect::OpenMetrics) if rest.trim().is_empty() => Ok(Comment::Eof),
        (_, Dialect::Prometheus) => Ok(Comment::Other),
        (_, Dialect::OpenMetrics) => Err(format!("unexpected comment {:?}", line)),
    }
}

fn parse_sample(line: &str, dialect: Dialect) -> Result<RawSample, String> {
    let mut cursor = Cursor::new(line);

    let name = cursor.take_while(is_metric_name_char);
    validate_metric_name(name)?;

    // The Prometheus grammar allows blanks between the name and its labels
    let mut blanks = match dialect {
        Dialect::Prometheus => cursor.skip_blanks(),
        Dialect::OpenMetrics => 0,
    };

    let labels = if cursor.eat('{') {
        blanks = 0;
        parse_labels(&mut cursor)?
    } else {
        Labels::new()
    };

    if blanks + cursor.skip_blanks() == 0 {
        return Err(format!(
            "expected whitespace before value of {}, found {:?}",
            name,
            cursor.rest()
        ));
    }

    let value = parse_value(cursor.take_while(|c| !is_blank(c)))?;
    cursor.skip_blanks();

    if !cursor.is_done() && cursor.peek() != Some('#') {
        parse_timestamp(cursor.take_while(|c| !is_blank(c)), dialect)?;
        cursor.skip_blanks();
    }

    if !cursor.is_done() {
        match (dialect, cursor.peek()) {
            (Dialect::OpenMetrics, Some('#')) => openmetrics::parse_exemplar(&mut cursor)?,
            _ => return Err(format!("unexpected trailing content {:?}", cursor.rest())),
        }
    }

    Ok(RawSample {
        name: name.to_string(),
        labels,
        value,
    })
}

/// Parse `name="value",...}` after the opening brace has been consumed
pub(crate) fn parse_labels(cursor: &mut Cursor<'_>) -> Result<Labels, String> {
    let mut labels = Labels::new();

    loop {
        cursor.skip_blanks();
        if cursor.is_done() {
            return Err("unterminated label set".to_string());
        }
        if cursor.eat('}') {
            return Ok(labels);
        }

        let name = cursor.take_while(is_metric_name_char);
        if name.is_empty() || name.contains(':') || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(format!("invalid label name at {:?}", cursor.rest()));
        }

        cursor.skip_blanks();
        if !cursor.eat('=') {
            return Err(format!("expected '=' after label name {}", name));
        }
        cursor.skip_blanks();
        if !cursor.eat('"') {
            return Err(format!("expected quoted value for label {}", name));
        }

        let value = parse_quoted(cursor)?;
        if labels.insert(name.to_string(), value).is_some() {
            return Err(format!("duplicate label {}", name));
        }

        cursor.skip_blanks();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat('}') {
            return Ok(labels);
        }
        return Err(format!("expected ',' or '}}' after label {}", name));
    }
}

fn parse_quoted(cursor: &mut Cursor<'_>) -> Result<String, String> {
    let mut out = String::new();
    loop {
        match cursor.bump() {
            None => return Err("unterminated label value".to_string()),
            Some('"') => return Ok(out),
            Some('\\') => match cursor.bump() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some(other) => return Err(format!("invalid escape sequence \\{}", other)),
                None => return Err("unterminated escape sequence".to_string()),
            },
            Some(c) => out.push(c),
        }
    }
}

/// Parse a sample value, accepting the exposition spellings of the special floats
pub(crate) fn parse_value(token: &str) -> Result<f64, String> {
    match token {
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        "" => Err("missing sample value".to_string()),
        _ => {
            // str::parse also accepts "inf"/"nan"/"infinity", which the formats do not
            if token
                .chars()
                .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
            {
                return Err(format!("invalid sample value {:?}", token));
            }
            token
                .parse::<f64>()
                .map_err(|_| format!("invalid sample value {:?}", token))
        }
    }
}

pub(crate) fn parse_timestamp(token: &str, dialect: Dialect) -> Result<(), String> {
    let valid = match dialect {
        Dialect::Prometheus => token.parse::<i64>().is_ok(),
        Dialect::OpenMetrics => parse_value(token).is_ok_and(f64::is_finite),
    };
    if valid {
        Ok(())
    } else {
        Err(format!("invalid timestamp {:?}", token))
    }
}

fn validate_metric_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("expected metric name".to_string());
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) || !name.chars().all(is_metric_name_char) {
        return Err(format!("invalid metric name {:?}", name));
    }
    Ok(())
}

fn unescape_help(text: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('"') if dialect == Dialect::OpenMetrics => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Split off the first blank-delimited token; the rest keeps its leading text
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start_matches([' ', '\t']);
    match s.find([' ', '\t']) {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

fn is_metric_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Character cursor over a single line
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub(crate) fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Skip spaces and tabs, returning how many were skipped
    pub(crate) fn skip_blanks(&mut self) -> usize {
        self.take_while(is_blank).len()
    }
}
