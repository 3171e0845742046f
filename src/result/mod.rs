//! Solver result parsing
//!
//! The solver writes a line-oriented `key=value` log. Only the metrics named
//! in a [`MetricSpec`] table are harvested; every other line is ignored.
//! A metric that never shows up, or whose value does not parse, keeps the
//! sentinel [`SENTINEL`].

use crate::error::{Result, SweepError};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;

/// Value reported for a metric the solver did not emit.
pub const SENTINEL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Int,
    Float,
}

/// Name and value type of one harvested metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub kind: MetricKind,
}

const fn int(name: &'static str) -> MetricSpec {
    MetricSpec { name, kind: MetricKind::Int }
}

const fn float(name: &'static str) -> MetricSpec {
    MetricSpec { name, kind: MetricKind::Float }
}

/// Metrics of a one-shot MAPF run.
pub const MAPF_METRICS: &[MetricSpec] = &[
    int("solved"),
    int("soc"),
    int("lb_soc"),
    int("makespan"),
    int("lb_makespan"),
    int("comp_time"),
];

/// MAPF metrics plus preprocessing time, for the large random-start sweeps.
pub const MAPF_PREPROCESS_METRICS: &[MetricSpec] = &[
    int("solved"),
    int("soc"),
    int("lb_soc"),
    int("makespan"),
    int("lb_makespan"),
    int("comp_time"),
    int("preprocessing_comp_time"),
];

/// Metrics of a lifelong pickup-and-delivery run.
pub const MAPD_METRICS: &[MetricSpec] = &[
    int("solved"),
    float("service_time"),
    int("makespan"),
    int("comp_time"),
];

/// A harvested metric value. Parsed values are never negative, so the
/// sentinel cannot be mistaken for a reported value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn sentinel(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Int => MetricValue::Int(SENTINEL),
            MetricKind::Float => MetricValue::Float(SENTINEL as f64),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        match *self {
            MetricValue::Int(v) => v == SENTINEL,
            MetricValue::Float(v) => v == SENTINEL as f64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Int(v) => v as f64,
            MetricValue::Float(v) => v,
        }
    }

    fn parse(kind: MetricKind, raw: &str) -> Option<Self> {
        match kind {
            MetricKind::Int => raw
                .parse::<u64>()
                .ok()
                .and_then(|v| i64::try_from(v).ok())
                .map(MetricValue::Int),
            MetricKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(MetricValue::Float),
        }
    }
}

/// Floats always carry a decimal point (`37.0`), except the sentinel which
/// prints as `-1` in every column.
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            v @ MetricValue::Float(_) if v.is_sentinel() => write!(f, "{}", SENTINEL),
            MetricValue::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Fixed-shape record: one value per metric of the table it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResult {
    metrics: &'static [MetricSpec],
    values: Vec<MetricValue>,
}

impl ParsedResult {
    /// Every metric at its sentinel.
    pub fn unsolved(metrics: &'static [MetricSpec]) -> Self {
        ParsedResult {
            metrics,
            values: metrics.iter().map(|m| MetricValue::sentinel(m.kind)).collect(),
        }
    }

    pub fn metrics(&self) -> &'static [MetricSpec] {
        self.metrics
    }

    pub fn values(&self) -> &[MetricValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<MetricValue> {
        let pos = self.metrics.iter().position(|m| m.name == name)?;
        Some(self.values[pos])
    }

    /// True only when the solver reported `solved=1`.
    pub fn is_solved(&self) -> bool {
        self.get("solved") == Some(MetricValue::Int(1))
    }

    pub fn is_all_sentinel(&self) -> bool {
        self.values.iter().all(MetricValue::is_sentinel)
    }

    /// Values rendered for a CSV row, in table order.
    pub fn fields(&self) -> Vec<String> {
        self.values.iter().map(|v| v.to_string()).collect()
    }
}

/// Line matcher built once from a metric table.
#[derive(Debug, Clone)]
pub struct ResultParser {
    metrics: &'static [MetricSpec],
    patterns: Vec<Regex>,
}

impl ResultParser {
    pub fn new(metrics: &'static [MetricSpec]) -> Result<Self> {
        let patterns = metrics
            .iter()
            .map(|m| {
                Regex::new(&format!(r"^{}=\s*(\S+)", regex::escape(m.name))).map_err(|e| {
                    SweepError::config(format!("metric '{}': {}", m.name, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultParser { metrics, patterns })
    }

    pub fn metrics(&self) -> &'static [MetricSpec] {
        self.metrics
    }

    /// Harvests metrics from solver output text. The first line matching a
    /// metric decides its value, even when that value fails to parse.
    pub fn parse_str(&self, text: &str) -> ParsedResult {
        let mut result = ParsedResult::unsolved(self.metrics);
        let mut seen = vec![false; self.metrics.len()];

        for line in text.lines() {
            for (i, pattern) in self.patterns.iter().enumerate() {
                if seen[i] {
                    continue;
                }
                if let Some(caps) = pattern.captures(line) {
                    seen[i] = true;
                    if let Some(value) = MetricValue::parse(self.metrics[i].kind, &caps[1]) {
                        result.values[i] = value;
                    }
                }
            }
            if seen.iter().all(|&s| s) {
                break;
            }
        }

        result
    }

    /// Harvests metrics from a result file. Missing or unreadable files give
    /// an all-sentinel result; invalid UTF-8 is replaced, not rejected.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> ParsedResult {
        match fs::read(path.as_ref()) {
            Ok(bytes) => self.parse_str(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                tracing::debug!("no result at {}: {}", path.as_ref().display(), e);
                ParsedResult::unsolved(self.metrics)
            }
        }
    }
}
