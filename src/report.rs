use crate::anomaly::Anomaly;
use crate::baseline::Baseline;
use crate::config::Config;
use crate::context::LogContext;
use crate::detectors::detect_anomalies;
use crate::errors::{analyze_error_frequency, ErrorAnalysis};
use crate::patterns::{detect_patterns, PatternAnalysis};
use crate::record::Batch;
use crate::trends::{analyze_log_trends, TrendAnalysis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_records: usize,
    pub skipped_records: usize,
    pub distinct_sources: usize,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub summary: Summary,
    pub error_analysis: ErrorAnalysis,
    pub pattern_analysis: PatternAnalysis,
    pub trend_analysis: TrendAnalysis,
    /// Merged anomalies, highest confidence first.
    pub anomalies: Vec<Anomaly>,
}

pub fn summarize(batch: &Batch) -> Summary {
    let stamps = || batch.records.iter().filter_map(|r| r.timestamp.as_deref());
    let sources: BTreeSet<&str> = batch.records.iter().map(|r| r.source.as_str()).collect();
    Summary {
        total_records: batch.len(),
        skipped_records: batch.skipped,
        distinct_sources: sources.len(),
        start_time: stamps().min().map(str::to_string),
        end_time: stamps().max().map(str::to_string),
    }
}

/// Runs the analyzers and the detector ensemble over one batch.
pub fn analyze_batch(batch: &Batch, baseline: Option<&Baseline>, config: &Config, ctx: &LogContext) -> AnalyticsReport {
    let ctx = ctx.child("analyze_batch");
    let started = Instant::now();
    let records = batch.records.as_slice();
    let report = AnalyticsReport {
        summary: summarize(batch),
        error_analysis: analyze_error_frequency(records, &ctx),
        pattern_analysis: detect_patterns(records, &config.analyzer, &ctx),
        trend_analysis: analyze_log_trends(records, &config.analyzer, &ctx),
        anomalies: detect_anomalies(records, baseline, &config.detection, &ctx),
    };
    info!(
        parent: ctx.span(),
        records = batch.len(),
        skipped = batch.skipped,
        anomalies = report.anomalies.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "batch analysed"
    );
    report
}
