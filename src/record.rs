use crate::error::InputError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Levels counted as errors by the feature extractor and detectors.
pub const ERROR_LEVELS: [&str; 2] = ["error", "fatal"];
/// Levels counted by the error-frequency analysis (errors plus warnings).
pub const PROBLEM_LEVELS: [&str; 3] = ["error", "fatal", "warn"];

const UNKNOWN_SOURCE: &str = "unknown";

fn unknown_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

/// One structured log entry. `level` is always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default = "unknown_source")]
    pub source: String,
}

impl LogRecord {
    pub fn new(level: &str, message: &str, timestamp: Option<&str>, source: &str) -> Self {
        Self {
            level: level.to_lowercase(),
            message: message.to_string(),
            timestamp: timestamp.map(str::to_string),
            source: source.to_string(),
        }
    }

    /// Builds a record from an arbitrary JSON value. Returns `None` for
    /// anything that is not an object carrying string `level` and `message`.
    pub fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let level = obj.get("level")?.as_str()?.to_lowercase();
        let message = obj.get("message")?.as_str()?.to_string();
        let timestamp = obj.get("timestamp").and_then(Value::as_str).map(str::to_string);
        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(unknown_source);
        Some(Self { level, message, timestamp, source })
    }

    pub fn is_error(&self) -> bool {
        ERROR_LEVELS.contains(&self.level.as_str())
    }

    pub fn is_problem(&self) -> bool {
        PROBLEM_LEVELS.contains(&self.level.as_str())
    }

    pub fn hour(&self) -> Option<u32> {
        self.timestamp.as_deref().and_then(hour_of)
    }

    pub fn minute_key(&self) -> Option<&str> {
        self.timestamp.as_deref().and_then(minute_key_of)
    }

    pub fn parsed_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// A validated batch plus the number of entries dropped while building it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub records: Vec<LogRecord>,
    pub skipped: usize,
}

impl Batch {
    pub fn from_records(records: Vec<LogRecord>) -> Self {
        Self { records, skipped: 0 }
    }

    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut batch = Batch::default();
        for v in values {
            match LogRecord::from_value(v) {
                Some(rec) => batch.records.push(rec),
                None => batch.skipped += 1,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses either a JSON array document or JSON lines. Lines that fail to
/// parse are counted as skipped instead of aborting the batch.
pub fn parse_batch_str(text: &str) -> Result<Batch, InputError> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Batch::default());
    }
    if trimmed.starts_with('[') {
        let v: Value = serde_json::from_str(trimmed)?;
        return match v {
            Value::Array(items) => Ok(Batch::from_values(items.iter())),
            _ => Err(InputError::NotABatch),
        };
    }
    if !trimmed.starts_with('{') {
        return Err(InputError::NotABatch);
    }
    let mut batch = Batch::default();
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line).ok().as_ref().and_then(LogRecord::from_value) {
            Some(rec) => batch.records.push(rec),
            None => batch.skipped += 1,
        }
    }
    Ok(batch)
}

pub fn load_batch(path: &Path) -> Result<Batch, InputError> {
    let text = std::fs::read_to_string(path)?;
    parse_batch_str(&text)
}

/// Hour from the `T`-delimited time portion, e.g. `10` for `2025-08-29T10:15:30Z`.
pub fn hour_of(ts: &str) -> Option<u32> {
    let time = ts.split('T').nth(1)?;
    time.split(':').next()?.trim().parse::<u32>().ok()
}

/// `(hour, date)` for timestamps with exactly one `T` separator.
pub fn time_components(ts: &str) -> Option<(u32, &str)> {
    let (date, time) = ts.split_once('T')?;
    if time.contains('T') {
        return None;
    }
    let hour = time.split(':').next()?.trim().parse::<u32>().ok()?;
    Some((hour, date))
}

/// `HH:MM` key of the time portion.
pub fn minute_key_of(ts: &str) -> Option<&str> {
    let time = ts.split('T').nth(1)?;
    time.get(..5)
}

/// ISO-8601 with optional `Z`/offset; naive timestamps are read as UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let s = ts.trim();
    if !s.contains('T') {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let with_offset = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];
    for f in with_offset.iter() {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
    for f in naive.iter() {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    None
}
