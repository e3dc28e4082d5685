use crate::anomaly::{Anomaly, AnomalyKind, Severity};
use crate::config::AnalyzerConfig;
use crate::context::LogContext;
use crate::record::LogRecord;
use crate::signature::{signature, SignatureStrategy};
use crate::stats;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const TERM_STOP_WORDS: [&str; 21] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "was", "are", "were", "be", "been", "being",
];

static RE_TERM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap());
static RE_CLUSTER_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSignature {
    pub pattern: String,
    pub count: usize,
    pub sources: Vec<String>,
    pub first_seen: String,
    pub last_seen: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCluster {
    pub signature: String,
    pub count: usize,
    pub sample_messages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub frequent_terms: Vec<TermCount>,
    pub error_signatures: Vec<ErrorSignature>,
    pub anomalous_patterns: Vec<Anomaly>,
    /// hour -> level -> count
    pub temporal_patterns: BTreeMap<u32, BTreeMap<String, usize>>,
    /// source -> level -> count
    pub source_patterns: BTreeMap<String, BTreeMap<String, usize>>,
    pub message_clusters: Vec<MessageCluster>,
}

pub fn detect_patterns(records: &[LogRecord], cfg: &AnalyzerConfig, ctx: &LogContext) -> PatternAnalysis {
    let ctx = ctx.child("detect_patterns");
    let out = PatternAnalysis {
        frequent_terms: frequent_terms(records.iter().map(|r| r.message.as_str()), cfg.top_terms),
        error_signatures: error_signatures(records),
        anomalous_patterns: flag_anomalous_patterns(records, cfg),
        temporal_patterns: level_breakdown(records.iter().filter_map(|r| r.hour().map(|h| (h, r)))),
        source_patterns: level_breakdown(records.iter().map(|r| (r.source.clone(), r))),
        message_clusters: message_clusters(records, cfg.top_clusters, cfg.cluster_samples),
    };
    debug!(
        parent: ctx.span(),
        terms = out.frequent_terms.len(),
        error_signatures = out.error_signatures.len(),
        anomalous_patterns = out.anomalous_patterns.len(),
        clusters = out.message_clusters.len(),
        "patterns detected"
    );
    out
}

/// Most common lowercase words of three or more letters, stop words removed.
/// Ties keep the order in which the words were first seen.
pub fn frequent_terms<'a, I>(messages: I, limit: usize) -> Vec<TermCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let words = messages.into_iter().flat_map(|m| {
        let lower = m.to_lowercase();
        RE_TERM
            .find_iter(&lower)
            .map(|w| w.as_str().to_string())
            .filter(|w| !TERM_STOP_WORDS.contains(&w.as_str()))
            .collect::<Vec<_>>()
    });
    stats::ordered_counts(words)
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(limit)
        .map(|(term, count)| TermCount { term, count })
        .collect()
}

/// Masking-signature groups of error/fatal records seen more than once,
/// most frequent first.
pub fn error_signatures(records: &[LogRecord]) -> Vec<ErrorSignature> {
    let groups = stats::group_ordered(
        records
            .iter()
            .filter(|r| r.is_error())
            .map(|r| (signature(SignatureStrategy::Masking, &r.message), r))
            .filter(|(p, _)| !p.is_empty()),
    );
    groups
        .into_iter()
        .filter(|(_, occ)| occ.len() > 1)
        .map(|(pattern, occ)| {
            let sources: BTreeSet<String> = occ.iter().map(|r| r.source.clone()).collect();
            let stamps = || occ.iter().map(|r| r.timestamp.as_deref().unwrap_or(""));
            ErrorSignature {
                pattern,
                count: occ.len(),
                sources: sources.into_iter().collect(),
                first_seen: stamps().min().unwrap_or("").to_string(),
                last_seen: stamps().max().unwrap_or("").to_string(),
            }
        })
        .sorted_by(|a, b| b.count.cmp(&a.count))
        .collect()
}

/// Sources with an unusually high error share and error signatures that
/// repeat far more than the others.
pub fn flag_anomalous_patterns(records: &[LogRecord], cfg: &AnalyzerConfig) -> Vec<Anomaly> {
    let mut out = Vec::new();

    for (source, group) in stats::group_ordered(records.iter().map(|r| (r.source.clone(), r))) {
        let total = group.len();
        let errors = group.iter().filter(|r| r.is_error()).count();
        let rate = errors as f64 / total as f64 * 100.0;
        if rate > cfg.source_error_rate_pct && total > cfg.source_min_records {
            let severity = if rate > cfg.source_error_rate_high_pct { Severity::High } else { Severity::Medium };
            out.push(
                Anomaly::new(
                    AnomalyKind::HighErrorRate,
                    errors as f64 / total as f64,
                    severity,
                    format!("High error rate in {source}: {rate:.1}% ({errors}/{total} logs)"),
                )
                .with_source(source)
                .with_metric("error_rate", rate)
                .with_metric("error_count", errors as f64)
                .with_metric("total_logs", total as f64),
            );
        }
    }

    let counts = stats::ordered_counts(
        records
            .iter()
            .filter(|r| r.is_error())
            .map(|r| signature(SignatureStrategy::Masking, &r.message))
            .filter(|p| !p.is_empty()),
    );
    if counts.len() > 1 {
        let xs: Vec<f64> = counts.iter().map(|(_, c)| *c as f64).collect();
        let threshold = stats::mean(&xs) + cfg.signature_stdev_multiplier * stats::sample_stdev(&xs);
        for (pattern, count) in counts {
            let c = count as f64;
            if c > threshold && count > cfg.signature_min_count {
                let severity = if c > threshold * 2.0 { Severity::High } else { Severity::Medium };
                let confidence = if threshold > 0.0 { (c / (2.0 * threshold)).min(1.0) } else { 1.0 };
                out.push(
                    Anomaly::new(
                        AnomalyKind::FrequentErrorPattern,
                        confidence,
                        severity,
                        format!("Error pattern '{pattern}' occurred {count} times (threshold {threshold:.1})"),
                    )
                    .with_pattern(pattern)
                    .with_count(count)
                    .with_metric("threshold", threshold),
                );
            }
        }
    }
    out
}

/// Groups by the sorted set of four-plus-letter words, keeping the first
/// three as the cluster key.
pub fn message_clusters(records: &[LogRecord], limit: usize, samples: usize) -> Vec<MessageCluster> {
    let groups = stats::group_ordered(records.iter().map(|r| {
        let lower = r.message.to_lowercase();
        let words: BTreeSet<&str> = RE_CLUSTER_WORD.find_iter(&lower).map(|m| m.as_str()).collect();
        let key = words.into_iter().take(3).join(" ");
        (key, r)
    }));
    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(signature, members)| MessageCluster {
            signature,
            count: members.len(),
            sample_messages: members.iter().take(samples).map(|r| r.message.clone()).collect(),
        })
        .sorted_by(|a, b| b.count.cmp(&a.count))
        .take(limit)
        .collect()
}

fn level_breakdown<'a, K, I>(keyed: I) -> BTreeMap<K, BTreeMap<String, usize>>
where
    K: Ord,
    I: IntoIterator<Item = (K, &'a LogRecord)>,
{
    let mut out: BTreeMap<K, BTreeMap<String, usize>> = BTreeMap::new();
    for (key, r) in keyed {
        *out.entry(key).or_default().entry(r.level.clone()).or_insert(0) += 1;
    }
    out
}
