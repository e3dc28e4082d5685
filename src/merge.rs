use crate::anomaly::Anomaly;

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Same kind, and the same source when both carry one; otherwise the same
/// pattern when both carry one.
pub fn are_similar(a: &Anomaly, b: &Anomaly) -> bool {
    if a.kind != b.kind {
        return false;
    }
    if let (Some(sa), Some(sb)) = (present(&a.source), present(&b.source)) {
        return sa == sb;
    }
    if let (Some(pa), Some(pb)) = (present(&a.pattern), present(&b.pattern)) {
        return pa == pb;
    }
    false
}

/// Collapses similar anomalies in a single left-to-right pass. Each
/// unvisited anomaly absorbs every later unvisited one similar to it; the
/// output keeps the position of each group's first member.
///
/// Grouping is not transitive: with three anomalies where only the outer two
/// are unrelated, the result depends on the input order.
pub fn merge_similar(anomalies: Vec<Anomaly>) -> Vec<Anomaly> {
    let mut used = vec![false; anomalies.len()];
    let mut merged = Vec::with_capacity(anomalies.len());
    for i in 0..anomalies.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group: Vec<&Anomaly> = vec![&anomalies[i]];
        for j in (i + 1)..anomalies.len() {
            if !used[j] && are_similar(&anomalies[i], &anomalies[j]) {
                used[j] = true;
                group.push(&anomalies[j]);
            }
        }
        if group.len() > 1 {
            merged.push(merge_group(&group));
        } else {
            merged.push(anomalies[i].clone());
        }
    }
    merged
}

fn merge_group(group: &[&Anomaly]) -> Anomaly {
    let mut out = group[0].clone();
    if out.count.is_some() {
        out.count = Some(group.iter().map(|a| a.count.unwrap_or(1)).sum());
    }
    out.confidence = group.iter().map(|a| a.confidence).fold(0.0, f64::max);
    out.description.push_str(&format!(" (merged from {} similar anomalies)", group.len()));
    out.merged_count = Some(group.len());
    out
}
