use crate::context::LogContext;
use crate::features::{extract_features, values_by_name, window_features, FeatureVector};
use crate::record::LogRecord;
use crate::signature::{signature, SignatureStrategy};
use crate::stats;
use chrono::Duration;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const FREQUENT_PATTERN_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeBaseline {
    pub mean: f64,
    pub std: f64,
    pub min: usize,
    pub max: usize,
}

/// Historical expectation the current batch is compared against.
///
/// Only `statistical_baseline` and `window_minutes` are read during
/// detection. The other fields are kept for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub statistical_baseline: BTreeMap<String, FeatureStats>,
    pub frequent_patterns: BTreeMap<String, usize>,
    pub temporal_patterns: BTreeMap<u32, usize>,
    pub source_patterns: BTreeMap<String, usize>,
    pub volume_patterns: VolumeBaseline,
    /// Number of sub-batches that contributed a feature vector.
    pub samples: usize,
    /// Width of the history windows when built by [`Baseline::from_history`].
    /// Detection then summarises the current batch per window of this width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<i64>,
}

impl Baseline {
    /// One feature vector per non-empty sub-batch, then per-feature mean and
    /// population standard deviation across the vectors.
    pub fn from_batches(batches: &[&[LogRecord]], ctx: &LogContext) -> Self {
        let vectors: Vec<FeatureVector> = batches
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| extract_features(b))
            .collect();
        let all: Vec<&LogRecord> = batches.iter().flat_map(|b| b.iter()).collect();
        Self::from_vectors(&vectors, &all, ctx)
    }

    /// Splits one historical batch into `window`-wide sub-batches and builds
    /// from those. Records without a parsable timestamp belong to no window.
    pub fn from_history(records: &[LogRecord], window: Duration, ctx: &LogContext) -> Self {
        let vectors = window_features(records, window);
        let windowed: Vec<&LogRecord> = records.iter().filter(|r| r.parsed_time().is_some()).collect();
        let mut baseline = Self::from_vectors(&vectors, &windowed, ctx);
        baseline.window_minutes = Some(window.num_minutes());
        baseline
    }

    fn from_vectors(vectors: &[FeatureVector], all: &[&LogRecord], ctx: &LogContext) -> Self {
        let ctx = ctx.child("build_baseline");
        let statistical_baseline = values_by_name(vectors)
            .into_iter()
            .map(|(name, xs)| (name, FeatureStats { mean: stats::mean(&xs), std: stats::pop_stdev(&xs) }))
            .collect();

        let baseline = Baseline {
            statistical_baseline,
            frequent_patterns: frequent_patterns(all),
            temporal_patterns: all.iter().filter_map(|r| r.hour()).counts().into_iter().collect(),
            source_patterns: all.iter().map(|r| r.source.clone()).counts().into_iter().collect(),
            volume_patterns: volume_patterns(all),
            samples: vectors.len(),
            window_minutes: None,
        };
        debug!(parent: ctx.span(), samples = baseline.samples, records = all.len(), "baseline built");
        baseline
    }

    /// History window width, when the baseline was built per window.
    pub fn window(&self) -> Option<Duration> {
        self.window_minutes.and_then(Duration::try_minutes)
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureStats> {
        self.statistical_baseline.get(name)
    }
}

fn frequent_patterns(records: &[&LogRecord]) -> BTreeMap<String, usize> {
    stats::ordered_counts(records.iter().map(|r| signature(SignatureStrategy::Keyword, &r.message)))
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(FREQUENT_PATTERN_LIMIT)
        .collect()
}

fn volume_patterns(records: &[&LogRecord]) -> VolumeBaseline {
    let counts: Vec<usize> = stats::ordered_counts(records.iter().filter_map(|r| r.minute_key()))
        .into_iter()
        .map(|(_, c)| c)
        .collect();
    if counts.is_empty() {
        return VolumeBaseline::default();
    }
    let xs: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    VolumeBaseline {
        mean: stats::mean(&xs),
        std: stats::pop_stdev(&xs),
        min: counts.iter().copied().min().unwrap_or(0),
        max: counts.iter().copied().max().unwrap_or(0),
    }
}
