use crate::context::LogContext;
use crate::record::LogRecord;
use crate::signature::{signature, SignatureStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPatternEntry {
    pub pattern: String,
    pub message: String,
    pub level: String,
    pub source: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub total_errors: usize,
    /// Percentage of records at error, fatal or warn level.
    pub error_rate: f64,
    pub errors_by_level: BTreeMap<String, usize>,
    pub errors_by_source: BTreeMap<String, usize>,
    pub error_patterns: Vec<ErrorPatternEntry>,
    pub time_distribution: BTreeMap<u32, usize>,
    pub severity_score: f64,
}

pub fn severity_weight(level: &str) -> f64 {
    match level {
        "fatal" => 10.0,
        "error" => 5.0,
        "warn" => 2.0,
        "info" => 1.0,
        "debug" => 0.5,
        _ => 1.0,
    }
}

pub fn analyze_error_frequency(records: &[LogRecord], ctx: &LogContext) -> ErrorAnalysis {
    let ctx = ctx.child("analyze_error_frequency");
    let mut out = ErrorAnalysis::default();
    if records.is_empty() {
        warn!(parent: ctx.span(), "no logs provided for error frequency analysis");
        return out;
    }

    let mut total_severity = 0.0;
    for r in records {
        if r.is_problem() {
            out.total_errors += 1;
            *out.errors_by_level.entry(r.level.clone()).or_insert(0) += 1;
            *out.errors_by_source.entry(r.source.clone()).or_insert(0) += 1;

            let pattern = signature(SignatureStrategy::Masking, &r.message);
            if !pattern.is_empty() {
                out.error_patterns.push(ErrorPatternEntry {
                    pattern,
                    message: r.message.clone(),
                    level: r.level.clone(),
                    source: r.source.clone(),
                    timestamp: r.timestamp.clone(),
                });
            }
            if let Some(hour) = r.hour() {
                *out.time_distribution.entry(hour).or_insert(0) += 1;
            }
        }
        total_severity += severity_weight(&r.level);
    }

    let total = records.len() as f64;
    out.error_rate = out.total_errors as f64 / total * 100.0;
    out.severity_score = total_severity / total;
    debug!(
        parent: ctx.span(),
        records = records.len(),
        total_errors = out.total_errors,
        error_rate = out.error_rate,
        "error frequency analysed"
    );
    out
}
