use crate::error::ConfigError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for the error/pattern/trend analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Per-source error percentage above which a source is flagged.
    pub source_error_rate_pct: f64,
    /// Per-source error percentage above which the flag is high severity.
    pub source_error_rate_high_pct: f64,
    /// A source needs more than this many records to be flagged.
    pub source_min_records: usize,
    pub signature_stdev_multiplier: f64,
    /// An error signature needs more than this many occurrences to be flagged.
    pub signature_min_count: usize,
    pub top_terms: usize,
    pub top_clusters: usize,
    pub cluster_samples: usize,
    pub slow_request_ms: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            source_error_rate_pct: 20.0,
            source_error_rate_high_pct: 50.0,
            source_min_records: 5,
            signature_stdev_multiplier: 2.0,
            signature_min_count: 3,
            top_terms: 20,
            top_clusters: 10,
            cluster_samples: 3,
            slow_request_ms: 1000.0,
        }
    }
}

/// Thresholds for the detector ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub statistical_z: f64,
    pub pattern_z: f64,
    pub temporal_z: f64,
    /// |z| above which z-score findings are high severity.
    pub high_severity_z: f64,
    /// |z| that maps to full confidence.
    pub confidence_scale: f64,
    pub rare_pattern_confidence: f64,
    pub window_minutes: i64,
    pub min_windows: usize,
    pub clustering_min_records: usize,
    pub clustering_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            statistical_z: 2.5,
            pattern_z: 2.0,
            temporal_z: 2.0,
            high_severity_z: 3.0,
            confidence_scale: 3.0,
            rare_pattern_confidence: 0.6,
            window_minutes: 10,
            min_windows: 3,
            clustering_min_records: 5,
            clustering_threshold: 0.7,
        }
    }
}

impl DetectionConfig {
    /// `None` when `window_minutes` is not positive or too large for a `Duration`.
    pub fn window(&self) -> Option<Duration> {
        window_of(self.window_minutes)
    }
}

fn window_of(minutes: i64) -> Option<Duration> {
    Duration::try_minutes(minutes).filter(|d| *d > Duration::zero())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub detection: DetectionConfig,
    /// Width of the windows a single historical batch is split into when
    /// building a baseline.
    pub baseline_window_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            detection: DetectionConfig::default(),
            baseline_window_minutes: 60,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn baseline_window(&self) -> Option<Duration> {
        window_of(self.baseline_window_minutes)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.window().is_none() {
            return Err(ConfigError::Invalid {
                field: "detection.window_minutes",
                reason: format!("must be a positive duration in range, got {}", self.detection.window_minutes),
            });
        }
        if self.baseline_window().is_none() {
            return Err(ConfigError::Invalid {
                field: "baseline_window_minutes",
                reason: format!("must be a positive duration in range, got {}", self.baseline_window_minutes),
            });
        }
        if !(0.0..=1.0).contains(&self.detection.rare_pattern_confidence) {
            return Err(ConfigError::Invalid {
                field: "detection.rare_pattern_confidence",
                reason: format!("must be within [0, 1], got {}", self.detection.rare_pattern_confidence),
            });
        }
        Ok(())
    }
}
