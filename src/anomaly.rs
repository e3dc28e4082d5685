use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    StatisticalAnomaly,
    FrequentPatternAnomaly,
    RarePatternAnomaly,
    TemporalVolumeSpike,
    TemporalVolumeDrop,
    TemporalErrorSpike,
    ErrorTimeClustering,
    HighErrorRate,
    FrequentErrorPattern,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::StatisticalAnomaly => "statistical_anomaly",
            AnomalyKind::FrequentPatternAnomaly => "frequent_pattern_anomaly",
            AnomalyKind::RarePatternAnomaly => "rare_pattern_anomaly",
            AnomalyKind::TemporalVolumeSpike => "temporal_volume_spike",
            AnomalyKind::TemporalVolumeDrop => "temporal_volume_drop",
            AnomalyKind::TemporalErrorSpike => "temporal_error_spike",
            AnomalyKind::ErrorTimeClustering => "error_time_clustering",
            AnomalyKind::HighErrorRate => "high_error_rate",
            AnomalyKind::FrequentErrorPattern => "frequent_error_pattern",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// High above `high_above`, otherwise medium.
    pub fn from_magnitude(magnitude: f64, high_above: f64) -> Self {
        if magnitude.abs() > high_above { Severity::High } else { Severity::Medium }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// `min(|z| / scale, 1)`.
pub fn confidence_from_z(z: f64, scale: f64) -> f64 {
    if scale <= 0.0 { return 1.0; }
    (z.abs() / scale).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub confidence: f64,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_count: Option<usize>,
    /// Magnitude statistics behind the finding (z-score, expected value, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
}

impl Anomaly {
    pub fn new(kind: AnomalyKind, confidence: f64, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            severity,
            source: None,
            pattern: None,
            timestamp: None,
            feature: None,
            count: None,
            description: description.into(),
            merged_count: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}
