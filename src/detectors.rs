use crate::anomaly::{confidence_from_z, Anomaly, AnomalyKind, Severity};
use crate::baseline::Baseline;
use crate::config::DetectionConfig;
use crate::context::LogContext;
use crate::features::{extract_features, windowed_mean_features, FeatureVector};
use crate::merge::merge_similar;
use crate::record::LogRecord;
use crate::signature::{signature, SignatureStrategy};
use crate::stats;
use crate::temporal::{clustering_score, group_by_window};
use tracing::{debug, info};

/// Inputs shared by every detector in one detection run.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub records: &'a [LogRecord],
    pub features: &'a FeatureVector,
    pub baseline: Option<&'a Baseline>,
    pub config: &'a DetectionConfig,
}

/// An independent anomaly detector. Detectors never see each other's output.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<Anomaly>;
}

/// Z-scores of the current feature vector against the historical baseline.
pub struct StatisticalDetector;

impl Detector for StatisticalDetector {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<Anomaly> {
        let Some(baseline) = ctx.baseline else {
            return Vec::new();
        };
        let cfg = ctx.config;
        let mut out = Vec::new();
        for (name, &current) in ctx.features {
            let Some(expected) = baseline.feature(name) else { continue };
            if expected.std <= 0.0 {
                continue;
            }
            let z = (current - expected.mean) / expected.std;
            if z.abs() > cfg.statistical_z {
                out.push(
                    Anomaly::new(
                        AnomalyKind::StatisticalAnomaly,
                        confidence_from_z(z, cfg.confidence_scale),
                        Severity::from_magnitude(z, cfg.high_severity_z),
                        format!("Statistical anomaly in {name}: {current:.3} (expected: {:.3})", expected.mean),
                    )
                    .with_feature(name.as_str())
                    .with_metric("current_value", current)
                    .with_metric("expected_value", expected.mean)
                    .with_metric("z_score", z),
                );
            }
        }
        out
    }
}

/// Keyword-signature groups whose size is far above or below the others.
pub struct PatternFrequencyDetector;

impl Detector for PatternFrequencyDetector {
    fn name(&self) -> &'static str {
        "pattern_frequency"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<Anomaly> {
        let cfg = ctx.config;
        let counts = stats::ordered_counts(
            ctx.records.iter().map(|r| signature(SignatureStrategy::Keyword, &r.message)),
        );
        if counts.is_empty() {
            return Vec::new();
        }
        let xs: Vec<f64> = counts.iter().map(|(_, c)| *c as f64).collect();
        let mean = stats::mean(&xs);
        let std = stats::pop_stdev(&xs);
        if std <= 0.0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        for (pattern, count) in counts {
            let z = (count as f64 - mean) / std;
            if z > cfg.pattern_z {
                out.push(
                    Anomaly::new(
                        AnomalyKind::FrequentPatternAnomaly,
                        confidence_from_z(z, cfg.confidence_scale),
                        Severity::Medium,
                        format!("Unusually frequent pattern: '{pattern}' appeared {count} times"),
                    )
                    .with_pattern(pattern)
                    .with_count(count)
                    .with_metric("expected_count", mean)
                    .with_metric("z_score", z),
                );
            } else if z < -cfg.pattern_z && count == 1 {
                out.push(
                    Anomaly::new(
                        AnomalyKind::RarePatternAnomaly,
                        cfg.rare_pattern_confidence,
                        Severity::Low,
                        format!("Rare pattern detected: '{pattern}'"),
                    )
                    .with_pattern(pattern)
                    .with_count(count)
                    .with_metric("z_score", z),
                );
            }
        }
        out
    }
}

/// Volume and error-rate outliers across fixed-width time windows.
pub struct TemporalWindowDetector;

impl Detector for TemporalWindowDetector {
    fn name(&self) -> &'static str {
        "temporal_window"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<Anomaly> {
        let cfg = ctx.config;
        let Some(window) = cfg.window() else {
            return Vec::new();
        };
        let windows = group_by_window(ctx.records, window);
        if windows.len() < cfg.min_windows {
            return Vec::new();
        }
        let mut out = Vec::new();

        let volumes: Vec<f64> = windows.iter().map(|w| w.volume() as f64).collect();
        let mean_volume = stats::mean(&volumes);
        let std_volume = stats::pop_stdev(&volumes);
        if std_volume > 0.0 {
            for (w, &volume) in windows.iter().zip(&volumes) {
                let z = (volume - mean_volume) / std_volume;
                if z.abs() > cfg.temporal_z {
                    let (kind, label) = if z > 0.0 {
                        (AnomalyKind::TemporalVolumeSpike, "volume spike")
                    } else {
                        (AnomalyKind::TemporalVolumeDrop, "volume drop")
                    };
                    out.push(
                        Anomaly::new(
                            kind,
                            confidence_from_z(z, cfg.confidence_scale),
                            Severity::from_magnitude(z, cfg.high_severity_z),
                            format!("Temporal {label}: {volume} logs in window (expected: {mean_volume:.1})"),
                        )
                        .with_timestamp(w.label())
                        .with_metric("volume", volume)
                        .with_metric("expected_volume", mean_volume)
                        .with_metric("z_score", z),
                    );
                }
            }
        }

        let rates: Vec<f64> = windows.iter().map(|w| w.error_rate()).collect();
        let mean_rate = stats::mean(&rates);
        let std_rate = stats::pop_stdev(&rates);
        if std_rate > 0.0 {
            for (w, &rate) in windows.iter().zip(&rates) {
                let z = (rate - mean_rate) / std_rate;
                if z > cfg.temporal_z {
                    out.push(
                        Anomaly::new(
                            AnomalyKind::TemporalErrorSpike,
                            confidence_from_z(z, cfg.confidence_scale),
                            Severity::High,
                            format!(
                                "Error rate spike: {:.1}% in window (expected: {:.1}%)",
                                rate * 100.0,
                                mean_rate * 100.0
                            ),
                        )
                        .with_timestamp(w.label())
                        .with_metric("error_rate", rate)
                        .with_metric("expected_error_rate", mean_rate)
                        .with_metric("z_score", z),
                    );
                }
            }
        }
        out
    }
}

/// Sources whose errors arrive bunched together in time.
pub struct TimeClusteringDetector;

impl Detector for TimeClusteringDetector {
    fn name(&self) -> &'static str {
        "time_clustering"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Vec<Anomaly> {
        let cfg = ctx.config;
        let mut out = Vec::new();
        for (source, group) in stats::group_ordered(ctx.records.iter().map(|r| (r.source.as_str(), r))) {
            if group.len() < cfg.clustering_min_records {
                continue;
            }
            let errors: Vec<&LogRecord> = group.into_iter().filter(|r| r.is_error()).collect();
            if errors.is_empty() {
                continue;
            }
            let times: Vec<_> = errors.iter().filter_map(|r| r.parsed_time()).collect();
            let score = clustering_score(&times);
            if score > cfg.clustering_threshold {
                out.push(
                    Anomaly::new(
                        AnomalyKind::ErrorTimeClustering,
                        score,
                        Severity::High,
                        format!("Error clustering detected in {source}: {} errors clustered in time", errors.len()),
                    )
                    .with_source(source)
                    .with_metric("error_count", errors.len() as f64)
                    .with_metric("clustering_score", score),
                );
            }
        }
        out
    }
}

/// Runs every registered detector and ranks the combined candidates.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            detectors: vec![
                Box::new(StatisticalDetector),
                Box::new(PatternFrequencyDetector),
                Box::new(TemporalWindowDetector),
                Box::new(TimeClusteringDetector),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Concatenated candidates, confidence descending. Ties keep detector order.
    pub fn run(&self, dctx: &DetectionContext<'_>, log: &LogContext) -> Vec<Anomaly> {
        let mut candidates = Vec::new();
        for detector in &self.detectors {
            let found = detector.detect(dctx);
            debug!(parent: log.span(), detector = detector.name(), candidates = found.len(), "detector finished");
            candidates.extend(found);
        }
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        candidates
    }
}

/// Full detection pass: features, all detectors, then merging. Without a
/// baseline the statistical detector contributes nothing.
///
/// A baseline from [`Baseline::from_history`] is compared against the
/// per-window mean of the batch; one from [`Baseline::from_batches`] against
/// the whole-batch vector.
pub fn detect_anomalies(
    records: &[LogRecord],
    baseline: Option<&Baseline>,
    config: &DetectionConfig,
    ctx: &LogContext,
) -> Vec<Anomaly> {
    let ctx = ctx.child("detect_anomalies");
    if baseline.is_none() {
        debug!(parent: ctx.span(), "no baseline supplied, statistical detection skipped");
    }
    // A baseline built per history window holds per-window statistics, so
    // the batch is summarised per window of the same width before comparing.
    let features = match baseline.and_then(Baseline::window) {
        Some(window) => windowed_mean_features(records, window),
        None => extract_features(records),
    };
    let dctx = DetectionContext { records, features: &features, baseline, config };
    let candidates = DetectorRegistry::new().run(&dctx, &ctx);
    let found = candidates.len();
    let merged = merge_similar(candidates);
    info!(parent: ctx.span(), records = records.len(), candidates = found, anomalies = merged.len(), "anomaly detection complete");
    merged
}
