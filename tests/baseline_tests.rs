use chrono::Duration;
use logsift::{Baseline, LogContext, LogRecord};

fn rec(level: &str, msg: &str, ts: &str, source: &str) -> LogRecord {
    LogRecord::new(level, msg, Some(ts), source)
}

#[test]
fn feature_stats_across_sub_batches() {
    let b1 = vec![
        rec("error", "Payment declined", "2025-08-29T10:00:00Z", "billing"),
        rec("info", "Payment accepted", "2025-08-29T10:00:10Z", "billing"),
    ];
    let b2 = vec![
        rec("info", "Payment accepted", "2025-08-29T11:00:00Z", "billing"),
        rec("info", "User logged in", "2025-08-29T11:00:20Z", "auth"),
    ];
    let empty: Vec<LogRecord> = Vec::new();
    let baseline = Baseline::from_batches(&[b1.as_slice(), b2.as_slice(), empty.as_slice()], &LogContext::disabled());

    assert_eq!(baseline.samples, 2);
    let err = baseline.feature("error_rate").unwrap();
    assert!((err.mean - 0.25).abs() < 1e-12);
    assert!((err.std - 0.25).abs() < 1e-12);
    let vol = baseline.feature("total_volume").unwrap();
    assert_eq!(vol.mean, 2.0);
    assert_eq!(vol.std, 0.0);

    assert_eq!(baseline.source_patterns["billing"], 3);
    assert_eq!(baseline.source_patterns["auth"], 1);
    assert_eq!(baseline.temporal_patterns[&10], 2);
    assert_eq!(baseline.temporal_patterns[&11], 2);
    assert_eq!(baseline.frequent_patterns["payment accepted"], 2);
}

#[test]
fn volume_baseline_from_minute_counts() {
    let b = vec![
        rec("info", "tick", "2025-08-29T10:00:00Z", "cron"),
        rec("info", "tick", "2025-08-29T10:00:30Z", "cron"),
        rec("info", "tick", "2025-08-29T10:00:45Z", "cron"),
        rec("info", "tick", "2025-08-29T10:01:00Z", "cron"),
    ];
    let baseline = Baseline::from_batches(&[b.as_slice()], &LogContext::disabled());
    assert_eq!(baseline.volume_patterns.min, 1);
    assert_eq!(baseline.volume_patterns.max, 3);
    assert_eq!(baseline.volume_patterns.mean, 2.0);
    assert_eq!(baseline.volume_patterns.std, 1.0);
}

#[test]
fn history_is_split_into_windows() {
    let history = vec![
        rec("error", "Payment declined", "2025-08-29T08:05:00Z", "billing"),
        rec("info", "Payment accepted", "2025-08-29T08:10:00Z", "billing"),
        rec("info", "Payment accepted", "2025-08-29T09:15:00Z", "billing"),
        rec("info", "Payment accepted", "2025-08-29T10:59:59Z", "billing"),
        LogRecord::new("error", "no time", None, "billing"),
    ];
    let baseline = Baseline::from_history(&history, Duration::minutes(60), &LogContext::disabled());
    assert_eq!(baseline.samples, 3);
    // per-window error rates: 0.5, 0, 0
    let err = baseline.feature("error_rate").unwrap();
    assert!((err.mean - 0.5 / 3.0).abs() < 1e-12);
    assert!(err.std > 0.0);
}

#[test]
fn single_window_history_has_zero_spread() {
    let history = vec![
        rec("error", "Payment declined", "2025-08-29T08:05:00Z", "billing"),
        rec("info", "Payment accepted", "2025-08-29T08:10:00Z", "billing"),
    ];
    let baseline = Baseline::from_history(&history, Duration::minutes(60), &LogContext::disabled());
    assert_eq!(baseline.samples, 1);
    assert!(baseline.statistical_baseline.values().all(|s| s.std == 0.0));
}

#[test]
fn empty_history_builds_empty_baseline() {
    let baseline = Baseline::from_history(&[], Duration::minutes(60), &LogContext::disabled());
    assert_eq!(baseline.samples, 0);
    assert!(baseline.statistical_baseline.is_empty());
    assert_eq!(baseline.window(), Some(Duration::minutes(60)));
}

#[test]
fn only_history_baselines_carry_a_window() {
    let b = vec![rec("info", "tick", "2025-08-29T10:00:00Z", "cron")];
    let from_batches = Baseline::from_batches(&[b.as_slice()], &LogContext::disabled());
    assert_eq!(from_batches.window(), None);
    let from_history = Baseline::from_history(&b, Duration::minutes(15), &LogContext::disabled());
    assert_eq!(from_history.window_minutes, Some(15));
}
