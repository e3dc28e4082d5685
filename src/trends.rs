use crate::config::AnalyzerConfig;
use crate::context::LogContext;
use crate::record::{time_components, LogRecord};
use crate::stats;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Millis,
    Seconds,
}

// Checked in order; the first pattern that matches decides.
static RESPONSE_TIME_PATTERNS: Lazy<Vec<(Regex, TimeUnit)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)took (\d+\.?\d*)ms").unwrap(), TimeUnit::Millis),
        (Regex::new(r"(?i)duration:?\s*(\d+\.?\d*)s").unwrap(), TimeUnit::Seconds),
        (Regex::new(r"(?i)(\d+\.?\d*)ms").unwrap(), TimeUnit::Millis),
        (Regex::new(r"(?i)time=(\d+\.?\d*)ms").unwrap(), TimeUnit::Millis),
    ]
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourTrend {
    pub hour: u32,
    pub total: usize,
    pub error_count: usize,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceIndicators {
    pub avg_response_time: f64,
    pub median_response_time: f64,
    pub p95_response_time: f64,
    pub slow_requests: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub total_logs: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub hourly_distribution: BTreeMap<u32, usize>,
    pub daily_distribution: BTreeMap<String, usize>,
    pub error_trend: Vec<HourTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_statistics: Option<VolumeStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_indicators: Option<PerformanceIndicators>,
}

pub fn analyze_log_trends(records: &[LogRecord], cfg: &AnalyzerConfig, ctx: &LogContext) -> TrendAnalysis {
    let ctx = ctx.child("analyze_log_trends");
    let mut out = TrendAnalysis { total_logs: records.len(), ..Default::default() };
    if records.is_empty() {
        return out;
    }

    let mut errors_by_hour: BTreeMap<u32, usize> = BTreeMap::new();
    let mut response_times = Vec::new();
    for r in records {
        *out.by_level.entry(r.level.clone()).or_insert(0) += 1;
        *out.by_source.entry(r.source.clone()).or_insert(0) += 1;

        if let Some((hour, day)) = r.timestamp.as_deref().and_then(time_components) {
            *out.hourly_distribution.entry(hour).or_insert(0) += 1;
            if r.is_error() {
                *errors_by_hour.entry(hour).or_insert(0) += 1;
            }
            *out.daily_distribution.entry(day.to_string()).or_insert(0) += 1;
        }
        if let Some(ms) = extract_response_time(&r.message) {
            response_times.push(ms);
        }
    }

    out.error_trend = out
        .hourly_distribution
        .iter()
        .map(|(&hour, &total)| {
            let error_count = errors_by_hour.get(&hour).copied().unwrap_or(0);
            HourTrend { hour, total, error_count, error_rate: error_count as f64 / total as f64 * 100.0 }
        })
        .collect();

    out.volume_statistics = volume_statistics(&out.hourly_distribution);
    out.performance_indicators = performance_indicators(&response_times, cfg.slow_request_ms);
    debug!(
        parent: ctx.span(),
        records = records.len(),
        hours = out.hourly_distribution.len(),
        response_times = response_times.len(),
        "trends analysed"
    );
    out
}

/// Response time in milliseconds mentioned in a message, if any. Zero
/// durations are treated as absent.
pub fn extract_response_time(message: &str) -> Option<f64> {
    for (re, unit) in RESPONSE_TIME_PATTERNS.iter() {
        if let Some(caps) = re.captures(message) {
            let value: f64 = match caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                Some(v) => v,
                None => continue,
            };
            let ms = match unit {
                TimeUnit::Millis => value,
                TimeUnit::Seconds => value * 1000.0,
            };
            return if ms > 0.0 { Some(ms) } else { None };
        }
    }
    None
}

fn volume_statistics(hourly: &BTreeMap<u32, usize>) -> Option<VolumeStatistics> {
    if hourly.is_empty() {
        return None;
    }
    let xs: Vec<f64> = hourly.values().map(|&c| c as f64).collect();
    Some(VolumeStatistics {
        mean: stats::mean(&xs),
        median: stats::median(&xs),
        std_dev: stats::sample_stdev(&xs),
        min: hourly.values().copied().min().unwrap_or(0),
        max: hourly.values().copied().max().unwrap_or(0),
    })
}

/// p95 is the 19th of 20 quantile cut points with at least 20 samples,
/// otherwise the maximum.
pub fn performance_indicators(times: &[f64], slow_ms: f64) -> Option<PerformanceIndicators> {
    if times.is_empty() {
        return None;
    }
    let p95 = if times.len() >= 20 {
        stats::quantiles(times, 20).get(18).copied().unwrap_or(0.0)
    } else {
        times.iter().copied().fold(f64::MIN, f64::max)
    };
    Some(PerformanceIndicators {
        avg_response_time: stats::mean(times),
        median_response_time: stats::median(times),
        p95_response_time: p95,
        slow_requests: times.iter().filter(|&&t| t > slow_ms).count(),
    })
}
