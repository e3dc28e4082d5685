use once_cell::sync::Lazy;
use regex::Regex;

/// Selects how a message is reduced to its signature.
///
/// `Masking` keeps the message shape and replaces volatile tokens in place.
/// The error analyzer uses it so error signatures stay readable in reports.
///
/// `Keyword` keeps only the first few meaningful words. The feature extractor
/// (message entropy) and the frequent/rare-pattern detector use it because it
/// groups messages that differ in punctuation or trailing detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureStrategy {
    Masking,
    Keyword,
}

const KEYWORD_LIMIT: usize = 5;
const KEYWORD_STOP_WORDS: [&str; 7] = ["the", "and", "for", "with", "from", "that", "this"];

static RE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{4}-\d{2}-\d{2}t\d{2}:\d{2}:\d{2}").unwrap()
});

static RE_IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap()
});

// Runs on lowercased text, so lowercase hex only.
static RE_HEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9a-f]{8,}\b").unwrap()
});

static RE_STANDALONE_INT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+\b").unwrap()
});

static RE_ANY_DIGITS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+").unwrap()
});

static RE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9/_-]+").unwrap()
});

static RE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap()
});

pub fn signature(strategy: SignatureStrategy, message: &str) -> String {
    match strategy {
        SignatureStrategy::Masking => masking_signature(message),
        SignatureStrategy::Keyword => keyword_signature(message),
    }
}

/// Lowercased message with timestamps, IPs, long hex ids, standalone numbers
/// and paths replaced by `TIMESTAMP`, `IP`, `ID`, `NUM` and `/PATH`.
pub fn masking_signature(message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    let lower = message.to_lowercase();
    let s = RE_TIMESTAMP.replace_all(&lower, "TIMESTAMP");
    let s = RE_IPV4.replace_all(&s, "IP");
    let s = RE_HEX.replace_all(&s, "ID");
    let s = RE_STANDALONE_INT.replace_all(&s, "NUM");
    let s = RE_PATH.replace_all(&s, "/PATH");
    s.trim().to_string()
}

/// First five non-stop-word tokens of the masked, lowercased message.
pub fn keyword_signature(message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    let lower = message.to_lowercase();
    let s = RE_IPV4.replace_all(&lower, "IP");
    let s = RE_HEX.replace_all(&s, "HASH");
    let s = RE_ANY_DIGITS.replace_all(&s, "NUM");
    let s = RE_PATH.replace_all(&s, "/PATH");
    RE_WORD
        .find_iter(&s)
        .map(|m| m.as_str())
        .filter(|w| !KEYWORD_STOP_WORDS.contains(w))
        .take(KEYWORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}
