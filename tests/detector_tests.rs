use chrono::{Duration, TimeZone, Utc};
use logsift::baseline::FeatureStats;
use logsift::config::DetectionConfig;
use logsift::detectors::{detect_anomalies, DetectionContext, Detector, DetectorRegistry, StatisticalDetector};
use logsift::features::extract_features;
use logsift::{Anomaly, AnomalyKind, Baseline, LogContext, LogRecord, Severity};

const NAMES: [&str; 9] = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india"];

fn error_rate_baseline(mean: f64, std: f64) -> Baseline {
    let mut b = Baseline::default();
    b.statistical_baseline.insert("error_rate".to_string(), FeatureStats { mean, std });
    b
}

fn find(anomalies: &[Anomaly], kind: AnomalyKind) -> Vec<&Anomaly> {
    anomalies.iter().filter(|a| a.kind == kind).collect()
}

fn ts(minute: i64, second: i64) -> String {
    let start = Utc.with_ymd_and_hms(2025, 8, 29, 10, 0, 0).unwrap();
    (start + Duration::minutes(minute) + Duration::seconds(second)).to_rfc3339()
}

#[test]
fn registry_runs_all_four_detectors() {
    assert_eq!(
        DetectorRegistry::new().names(),
        vec!["statistical", "pattern_frequency", "temporal_window", "time_clustering"]
    );
}

#[test]
fn repeated_error_signature_in_quiet_batch() {
    let mut records = Vec::new();
    for _ in 0..10 {
        records.push(LogRecord::new("error", "Database connection failed", None, "db"));
    }
    records.push(LogRecord::new("error", "Disk quota exceeded", None, "storage"));
    for name in &NAMES[..8] {
        records.push(LogRecord::new("info", &format!("Heartbeat {name} ok"), None, "monitor"));
    }
    let baseline = error_rate_baseline(0.02, 0.01);
    let anomalies = detect_anomalies(&records, Some(&baseline), &DetectionConfig::default(), &LogContext::disabled());

    let stat = find(&anomalies, AnomalyKind::StatisticalAnomaly);
    assert_eq!(stat.len(), 1);
    assert_eq!(stat[0].feature.as_deref(), Some("error_rate"));
    assert_eq!(stat[0].severity, Severity::High);

    // keyword groups [10, 1 x 9]: mean 1.9, std 2.7, z = 3
    let freq = find(&anomalies, AnomalyKind::FrequentPatternAnomaly);
    assert_eq!(freq.len(), 1);
    assert_eq!(freq[0].pattern.as_deref(), Some("database connection failed"));
    assert_eq!(freq[0].count, Some(10));
    assert!(freq[0].confidence > 0.99);
    assert_eq!(freq[0].severity, Severity::Medium);

    assert!(find(&anomalies, AnomalyKind::RarePatternAnomaly).is_empty());
}

#[test]
fn z_score_far_above_baseline_is_clamped() {
    let records = vec![
        LogRecord::new("error", "Payment declined", None, "billing"),
        LogRecord::new("fatal", "Ledger corrupted", None, "billing"),
        LogRecord::new("info", "Payment accepted", None, "billing"),
        LogRecord::new("info", "Invoice sent", None, "mailer"),
        LogRecord::new("debug", "Cache warm", None, "cache"),
    ];
    let baseline = error_rate_baseline(0.02, 0.01);
    let features = extract_features(&records);
    let config = DetectionConfig::default();
    let dctx = DetectionContext { records: &records, features: &features, baseline: Some(&baseline), config: &config };
    let found = StatisticalDetector.detect(&dctx);
    assert_eq!(found.len(), 1);
    let a = &found[0];
    assert!((a.metric("z_score").unwrap() - 38.0).abs() < 1e-6);
    assert_eq!(a.confidence, 1.0);
    assert_eq!(a.severity, Severity::High);
    assert_eq!(a.metric("current_value"), Some(0.4));
}

#[test]
fn no_baseline_means_no_statistical_candidates() {
    let records = vec![LogRecord::new("error", "boom", None, "x")];
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    assert!(find(&anomalies, AnomalyKind::StatisticalAnomaly).is_empty());
}

#[test]
fn zero_spread_features_are_skipped() {
    let records = vec![LogRecord::new("error", "boom", None, "x")];
    let baseline = error_rate_baseline(0.0, 0.0);
    let anomalies =
        detect_anomalies(&records, Some(&baseline), &DetectionConfig::default(), &LogContext::disabled());
    assert!(find(&anomalies, AnomalyKind::StatisticalAnomaly).is_empty());
}

#[test]
fn rare_pattern_among_frequent_ones() {
    let mut records = Vec::new();
    for name in NAMES {
        for _ in 0..20 {
            records.push(LogRecord::new("info", &format!("Worker {name} started"), None, "pool"));
        }
    }
    records.push(LogRecord::new("info", "Scheduler rebalanced shards", None, "pool"));
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    let rare = find(&anomalies, AnomalyKind::RarePatternAnomaly);
    assert_eq!(rare.len(), 1);
    assert_eq!(rare[0].pattern.as_deref(), Some("scheduler rebalanced shards"));
    assert_eq!(rare[0].confidence, 0.6);
    assert_eq!(rare[0].severity, Severity::Low);
    assert!(find(&anomalies, AnomalyKind::FrequentPatternAnomaly).is_empty());
}

#[test]
fn volume_spike_in_last_window() {
    let mut records = Vec::new();
    for w in 0..5 {
        for s in 0..2 {
            records.push(LogRecord::new("info", "Request handled", Some(&ts(w * 10, s)), "api"));
        }
    }
    for s in 0..20 {
        records.push(LogRecord::new("info", "Request handled", Some(&ts(50, s)), "api"));
    }
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    assert_eq!(anomalies.len(), 1);
    let a = &anomalies[0];
    assert_eq!(a.kind, AnomalyKind::TemporalVolumeSpike);
    assert_eq!(a.timestamp.as_deref(), Some("2025-08-29T10:50:00Z"));
    // volumes [2, 2, 2, 2, 2, 20]: z = 15 / sqrt(45)
    let z = 15.0 / 45f64.sqrt();
    assert!((a.metric("z_score").unwrap() - z).abs() < 1e-9);
    assert!((a.confidence - z / 3.0).abs() < 1e-9);
    assert_eq!(a.severity, Severity::Medium);
}

#[test]
fn error_spike_in_one_window() {
    let mut records = Vec::new();
    for w in 0..5 {
        for s in 0..2 {
            records.push(LogRecord::new("info", "Request handled", Some(&ts(w * 10, s)), "api"));
        }
    }
    records.push(LogRecord::new("error", "Request handled", Some(&ts(50, 0)), "api"));
    records.push(LogRecord::new("error", "Request handled", Some(&ts(50, 30)), "api"));
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    let spikes = find(&anomalies, AnomalyKind::TemporalErrorSpike);
    assert_eq!(spikes.len(), 1);
    assert_eq!(spikes[0].severity, Severity::High);
    assert_eq!(spikes[0].timestamp.as_deref(), Some("2025-08-29T10:50:00Z"));
    assert!(find(&anomalies, AnomalyKind::TemporalVolumeSpike).is_empty());
}

#[test]
fn too_few_windows_skip_temporal_detection() {
    let records: Vec<_> = (0..10)
        .map(|s| LogRecord::new("info", "Request handled", Some(&ts(0, s)), "api"))
        .chain((0..30).map(|s| LogRecord::new("info", "Request handled", Some(&ts(10, s)), "api")))
        .collect();
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    assert!(anomalies.is_empty());
}

#[test]
fn bunched_errors_from_one_source() {
    let mut records = Vec::new();
    for s in 0..3 {
        records.push(LogRecord::new("error", "Deadlock detected", Some(&ts(0, s)), "db"));
    }
    for m in [5, 20, 40] {
        records.push(LogRecord::new("info", "Query ok", Some(&ts(m, 0)), "db"));
    }
    // under the per-source minimum
    for s in 0..4 {
        records.push(LogRecord::new("error", "Bad gateway", Some(&ts(1, s * 7)), "proxy"));
    }
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    let clustered = find(&anomalies, AnomalyKind::ErrorTimeClustering);
    assert_eq!(clustered.len(), 1);
    assert_eq!(clustered[0].source.as_deref(), Some("db"));
    assert_eq!(clustered[0].confidence, 1.0);
    assert_eq!(clustered[0].severity, Severity::High);
    assert_eq!(clustered[0].metric("error_count"), Some(3.0));
}

#[test]
fn results_are_ranked_by_confidence() {
    let mut records = Vec::new();
    for _ in 0..10 {
        records.push(LogRecord::new("error", "Database connection failed", None, "db"));
    }
    for name in &NAMES[..9] {
        records.push(LogRecord::new("info", &format!("Heartbeat {name} ok"), None, "monitor"));
    }
    let baseline = error_rate_baseline(0.4, 0.05);
    let anomalies = detect_anomalies(&records, Some(&baseline), &DetectionConfig::default(), &LogContext::disabled());
    assert!(anomalies.len() >= 2);
    assert!(anomalies.windows(2).all(|w| w[0].confidence >= w[1].confidence));
}

#[test]
fn volume_drop_in_one_window() {
    let mut records = Vec::new();
    for w in 0..7 {
        let volume = if w == 3 { 1 } else { 10 };
        for s in 0..volume {
            records.push(LogRecord::new("info", "Request handled", Some(&ts(w * 10, s)), "api"));
        }
    }
    let anomalies = detect_anomalies(&records, None, &DetectionConfig::default(), &LogContext::disabled());
    assert_eq!(anomalies.len(), 1);
    let a = &anomalies[0];
    assert_eq!(a.kind, AnomalyKind::TemporalVolumeDrop);
    assert_eq!(a.timestamp.as_deref(), Some("2025-08-29T10:30:00Z"));
    // one outlier among seven windows: z = -sqrt(6)
    let z = -(6f64.sqrt());
    assert!((a.metric("z_score").unwrap() - z).abs() < 1e-9);
    assert!((a.confidence - (z.abs() / 3.0).min(1.0)).abs() < 1e-9);
    assert_eq!(a.severity, Severity::Medium);
}

fn steady_hours(per_hour: &[usize], errors_per_hour: &[usize]) -> Vec<LogRecord> {
    let sources = ["api", "db", "auth"];
    let mut records = Vec::new();
    for (h, (&n, &errors)) in per_hour.iter().zip(errors_per_hour).enumerate() {
        for i in 0..n {
            let level = if i < errors { "error" } else { "info" };
            let msg = if i % 2 == 0 { "Request handled" } else { "Cache refreshed" };
            let stamp = ts(h as i64 * 60 + i as i64 * 2, 0);
            records.push(LogRecord::new(level, msg, Some(&stamp), sources[i % 3]));
        }
    }
    records
}

#[test]
fn history_equal_to_input_raises_no_statistical_anomaly() {
    let records = steady_hours(&[10, 12, 11], &[2, 2, 3]);
    let baseline = Baseline::from_history(&records, Duration::minutes(60), &LogContext::disabled());
    assert_eq!(baseline.samples, 3);
    let anomalies = detect_anomalies(&records, Some(&baseline), &DetectionConfig::default(), &LogContext::disabled());
    assert!(find(&anomalies, AnomalyKind::StatisticalAnomaly).is_empty());
}

#[test]
fn windowed_baseline_still_flags_error_rate_shift() {
    let history = steady_hours(&[10, 10, 10], &[1, 0, 2]);
    let baseline = Baseline::from_history(&history, Duration::minutes(60), &LogContext::disabled());
    let current = steady_hours(&[10, 10, 10], &[8, 8, 8]);
    let anomalies = detect_anomalies(&current, Some(&baseline), &DetectionConfig::default(), &LogContext::disabled());
    let stat = find(&anomalies, AnomalyKind::StatisticalAnomaly);
    let error_rate = stat.iter().find(|a| a.feature.as_deref() == Some("error_rate")).unwrap();
    assert_eq!(error_rate.severity, Severity::High);
    assert!((error_rate.metric("current_value").unwrap() - 0.8).abs() < 1e-9);
    assert!(stat
        .iter()
        .all(|a| !matches!(a.feature.as_deref(), Some("total_volume") | Some("source_diversity"))));
}

#[test]
fn out_of_range_window_skips_temporal_detection() {
    let mut records = Vec::new();
    for w in 0..6 {
        let volume = if w == 5 { 20 } else { 2 };
        for s in 0..volume {
            records.push(LogRecord::new("info", "Request handled", Some(&ts(w * 10, s)), "api"));
        }
    }
    let config = DetectionConfig { window_minutes: i64::MAX, ..DetectionConfig::default() };
    let anomalies = detect_anomalies(&records, None, &config, &LogContext::disabled());
    assert!(anomalies.is_empty());
}
