use crate::record::LogRecord;
use crate::signature::{signature, SignatureStrategy};
use crate::stats;
use crate::temporal::group_by_window;
use chrono::Duration;
use std::collections::{BTreeMap, HashSet};

/// Feature name to value. Ordered so iteration and serialization are stable.
pub type FeatureVector = BTreeMap<String, f64>;

pub const ERROR_RATE: &str = "error_rate";
pub const MESSAGE_ENTROPY: &str = "message_entropy";
pub const TEMPORAL_VARIANCE: &str = "temporal_variance";
pub const SOURCE_DIVERSITY: &str = "source_diversity";
pub const TOTAL_VOLUME: &str = "total_volume";
pub const VOLUME_VARIANCE: &str = "volume_variance";

/// Features that scale with how many records or how much time a batch
/// covers. They only compare between batches of like size and span.
pub const SIZE_DEPENDENT: [&str; 4] = [TOTAL_VOLUME, SOURCE_DIVERSITY, TEMPORAL_VARIANCE, VOLUME_VARIANCE];

pub const RATIO_LEVELS: [&str; 5] = ["debug", "info", "warn", "error", "fatal"];

pub fn level_ratio_name(level: &str) -> String {
    format!("level_{level}_ratio")
}

/// Computes the feature vector of a batch. Empty batches yield an empty vector.
pub fn extract_features(records: &[LogRecord]) -> FeatureVector {
    let mut features = FeatureVector::new();
    if records.is_empty() {
        return features;
    }
    let n = records.len() as f64;

    let error_count = records.iter().filter(|r| r.is_error()).count();
    features.insert(ERROR_RATE.to_string(), error_count as f64 / n);

    features.insert(MESSAGE_ENTROPY.to_string(), message_entropy(records));
    features.insert(TEMPORAL_VARIANCE.to_string(), temporal_variance(records));

    let sources: HashSet<&str> = records.iter().map(|r| r.source.as_str()).collect();
    features.insert(SOURCE_DIVERSITY.to_string(), sources.len() as f64 / n);

    features.insert(TOTAL_VOLUME.to_string(), n);
    features.insert(VOLUME_VARIANCE.to_string(), volume_variance(records));

    for level in RATIO_LEVELS {
        let count = records.iter().filter(|r| r.level == level).count();
        features.insert(level_ratio_name(level), count as f64 / n);
    }
    features
}

/// Per-feature values across several vectors, in vector order.
pub fn values_by_name(vectors: &[FeatureVector]) -> BTreeMap<String, Vec<f64>> {
    let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for v in vectors {
        for (name, x) in v {
            values.entry(name.clone()).or_default().push(*x);
        }
    }
    values
}

/// One feature vector per `window`-wide slice of the batch, oldest first.
/// Records without a parsable timestamp belong to no slice.
pub fn window_features(records: &[LogRecord], window: Duration) -> Vec<FeatureVector> {
    group_by_window(records, window)
        .into_iter()
        .map(|w| {
            let owned: Vec<LogRecord> = w.records.into_iter().cloned().collect();
            extract_features(&owned)
        })
        .collect()
}

/// The batch summarised at window granularity: the per-feature mean of
/// [`window_features`]. A batch with no timestamped records falls back to
/// its whole-batch vector without the [`SIZE_DEPENDENT`] features.
pub fn windowed_mean_features(records: &[LogRecord], window: Duration) -> FeatureVector {
    let vectors = window_features(records, window);
    if vectors.is_empty() {
        let mut features = extract_features(records);
        features.retain(|name, _| !SIZE_DEPENDENT.contains(&name.as_str()));
        return features;
    }
    values_by_name(&vectors)
        .into_iter()
        .map(|(name, xs)| (name, stats::mean(&xs)))
        .collect()
}

fn message_entropy(records: &[LogRecord]) -> f64 {
    let counts: Vec<usize> = stats::ordered_counts(
        records.iter().map(|r| signature(SignatureStrategy::Keyword, &r.message)),
    )
    .into_iter()
    .map(|(_, c)| c)
    .collect();
    stats::entropy(&counts)
}

fn temporal_variance(records: &[LogRecord]) -> f64 {
    if records.len() < 2 {
        return 0.0;
    }
    bucket_variance(records.iter().filter_map(|r| r.hour()))
}

fn volume_variance(records: &[LogRecord]) -> f64 {
    bucket_variance(records.iter().filter_map(|r| r.minute_key()))
}

/// Population variance of per-key counts; 0 with fewer than two buckets.
fn bucket_variance<K, I>(keys: I) -> f64
where
    K: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let counts: Vec<f64> = stats::ordered_counts(keys).into_iter().map(|(_, c)| c as f64).collect();
    if counts.len() < 2 {
        return 0.0;
    }
    stats::pop_variance(&counts)
}
