use ahash::AHashMap;
use std::hash::Hash;

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population variance (divides by n).
pub fn pop_variance(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64
}

pub fn pop_stdev(xs: &[f64]) -> f64 {
    pop_variance(xs).sqrt()
}

/// Sample standard deviation (divides by n - 1); 0 for fewer than two values.
pub fn sample_stdev(xs: &[f64]) -> f64 {
    if xs.len() < 2 { return 0.0; }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    let mut s = xs.to_vec();
    s.sort_by(|a, b| a.total_cmp(b));
    let mid = s.len() / 2;
    if s.len() % 2 == 0 {
        (s[mid - 1] + s[mid]) / 2.0
    } else {
        s[mid]
    }
}

/// Cut points dividing `xs` into `n` intervals, exclusive method: the data is
/// treated as a sample of a larger population. Needs at least two values.
pub fn quantiles(xs: &[f64], n: usize) -> Vec<f64> {
    if xs.len() < 2 || n < 2 { return Vec::new(); }
    let mut s = xs.to_vec();
    s.sort_by(|a, b| a.total_cmp(b));
    let ld = s.len();
    let m = ld + 1;
    (1..n)
        .map(|i| {
            let j = (i * m / n).clamp(1, ld - 1);
            let delta = (i * m) as f64 - (j * n) as f64;
            (s[j - 1] * (n as f64 - delta) + s[j] * delta) / n as f64
        })
        .collect()
}

/// Occurrence counts in first-seen order.
pub fn ordered_counts<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: AHashMap<K, usize> = AHashMap::new();
    let mut out: Vec<(K, usize)> = Vec::new();
    for item in items {
        match index.get(&item) {
            Some(&i) => out[i].1 += 1,
            None => {
                index.insert(item.clone(), out.len());
                out.push((item, 1));
            }
        }
    }
    out
}

/// Groups values by key, preserving first-seen key order.
pub fn group_ordered<K, V, I>(items: I) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = (K, V)>,
{
    let mut index: AHashMap<K, usize> = AHashMap::new();
    let mut out: Vec<(K, Vec<V>)> = Vec::new();
    for (k, v) in items {
        match index.get(&k) {
            Some(&i) => out[i].1.push(v),
            None => {
                index.insert(k.clone(), out.len());
                out.push((k, vec![v]));
            }
        }
    }
    out
}

/// Shannon entropy (base 2) of a count distribution.
pub fn entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 { return 0.0; }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}
