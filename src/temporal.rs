use crate::record::LogRecord;
use crate::stats;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use std::collections::BTreeMap;

/// Records falling into one fixed-width window starting at `start`.
#[derive(Debug, Clone)]
pub struct TimeWindow<'a> {
    pub start: DateTime<Utc>,
    pub records: Vec<&'a LogRecord>,
}

impl TimeWindow<'_> {
    pub fn volume(&self) -> usize {
        self.records.len()
    }

    pub fn error_rate(&self) -> f64 {
        if self.records.is_empty() { return 0.0; }
        let errors = self.records.iter().filter(|r| r.is_error()).count();
        errors as f64 / self.records.len() as f64
    }

    pub fn label(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Buckets records by window, oldest first. Records without a parsable
/// timestamp are left out.
pub fn group_by_window(records: &[LogRecord], window: Duration) -> Vec<TimeWindow<'_>> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&LogRecord>> = BTreeMap::new();
    for r in records {
        if let Some(t) = r.parsed_time() {
            buckets.entry(floor_time(t, window)).or_default().push(r);
        }
    }
    buckets
        .into_iter()
        .map(|(start, records)| TimeWindow { start, records })
        .collect()
}

pub fn floor_time(t: DateTime<Utc>, bucket: Duration) -> DateTime<Utc> {
    let secs = bucket.num_seconds();
    if secs <= 0 { return t; }
    let ts = t.timestamp();
    let floored = ts - ts.rem_euclid(secs);
    Utc.timestamp_opt(floored, 0).single().unwrap_or(t)
}

/// How tightly the given instants bunch together: `1 - cv/2` over the sorted
/// inter-arrival gaps, clamped at 0. Identical instants score 1.0; fewer than
/// two instants score 0.
pub fn clustering_score(times: &[DateTime<Utc>]) -> f64 {
    if times.len() < 2 { return 0.0; }
    let mut s = times.to_vec();
    s.sort_unstable();
    let gaps: Vec<f64> = s
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .collect();
    let mean_gap = stats::mean(&gaps);
    if mean_gap == 0.0 { return 1.0; }
    let cv = stats::pop_stdev(&gaps) / mean_gap;
    (1.0 - cv / 2.0).max(0.0)
}
