use logsift::merge::{are_similar, merge_similar};
use logsift::{Anomaly, AnomalyKind, Severity};

fn high_error_rate(source: &str, confidence: f64) -> Anomaly {
    Anomaly::new(AnomalyKind::HighErrorRate, confidence, Severity::Medium, format!("High error rate in {source}"))
        .with_source(source)
}

fn frequent(pattern: &str, count: usize, confidence: f64) -> Anomaly {
    Anomaly::new(AnomalyKind::FrequentPatternAnomaly, confidence, Severity::Medium, "Unusually frequent pattern")
        .with_pattern(pattern)
        .with_count(count)
}

#[test]
fn merges_same_source_keeping_max_confidence() {
    let merged = merge_similar(vec![high_error_rate("auth_service", 0.6), high_error_rate("auth_service", 0.9)]);
    assert_eq!(merged.len(), 1);
    let m = &merged[0];
    assert_eq!(m.confidence, 0.9);
    assert_eq!(m.merged_count, Some(2));
    assert_eq!(m.description, "High error rate in auth_service (merged from 2 similar anomalies)");
    assert_eq!(m.count, None);
}

#[test]
fn sums_counts_when_head_has_one() {
    let merged = merge_similar(vec![
        frequent("user login failed", 10, 0.7),
        frequent("user login failed", 5, 0.8),
        frequent("user login failed", 1, 0.2).with_count(0),
    ]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].count, Some(15));
    assert_eq!(merged[0].confidence, 0.8);
    assert_eq!(merged[0].merged_count, Some(3));
}

#[test]
fn absent_member_counts_count_as_one() {
    let mut bare = frequent("disk full", 1, 0.5);
    bare.count = None;
    let merged = merge_similar(vec![frequent("disk full", 4, 0.9), bare]);
    assert_eq!(merged[0].count, Some(5));
}

#[test]
fn source_decides_before_pattern() {
    let a = high_error_rate("api", 0.5).with_pattern("timeout");
    let b = high_error_rate("api", 0.5).with_pattern("refused");
    let c = high_error_rate("db", 0.5).with_pattern("timeout");
    assert!(are_similar(&a, &b));
    assert!(!are_similar(&a, &c));
}

#[test]
fn empty_fields_count_as_absent() {
    let a = frequent("cache miss", 2, 0.5).with_source("");
    let b = frequent("cache miss", 3, 0.6).with_source("");
    assert!(are_similar(&a, &b));
    let c = Anomaly::new(AnomalyKind::TemporalVolumeSpike, 0.5, Severity::Medium, "spike");
    let d = Anomaly::new(AnomalyKind::TemporalVolumeSpike, 0.7, Severity::Medium, "spike");
    assert!(!are_similar(&c, &d));
}

#[test]
fn different_kinds_never_merge() {
    let a = high_error_rate("api", 0.5);
    let b = Anomaly::new(AnomalyKind::ErrorTimeClustering, 0.9, Severity::High, "clustered").with_source("api");
    assert_eq!(merge_similar(vec![a, b]).len(), 2);
}

#[test]
fn keeps_first_occurrence_order() {
    let merged = merge_similar(vec![
        high_error_rate("db", 0.9),
        high_error_rate("api", 0.8),
        high_error_rate("db", 0.7),
        high_error_rate("cache", 0.6),
    ]);
    let sources: Vec<_> = merged.iter().map(|a| a.source.as_deref().unwrap()).collect();
    assert_eq!(sources, vec!["db", "api", "cache"]);
}

#[test]
fn merging_is_idempotent() {
    let once = merge_similar(vec![
        high_error_rate("auth_service", 0.6),
        frequent("user login failed", 10, 0.7),
        high_error_rate("auth_service", 0.9),
        frequent("user login failed", 5, 0.8),
        high_error_rate("db", 0.3),
    ]);
    assert_eq!(once.len(), 3);
    let twice = merge_similar(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn grouping_depends_on_input_order() {
    // bridge shares the pattern with both ends; the ends differ by source
    let left = frequent("queue stalled", 1, 0.5).with_source("a");
    let bridge = frequent("queue stalled", 1, 0.5);
    let right = frequent("queue stalled", 1, 0.5).with_source("b");

    let left_first = merge_similar(vec![left.clone(), bridge.clone(), right.clone()]);
    assert_eq!(left_first.len(), 2);

    let bridge_first = merge_similar(vec![bridge, left, right]);
    assert_eq!(bridge_first.len(), 1);
    assert_eq!(bridge_first[0].merged_count, Some(3));
}
