//! Semantic distance between renderings.
//!
//! The checker only needs a number in `[0, 1]`: `0` for "says the same
//! thing", `1` for "unrelated". Anything from string metrics to model-backed
//! embeddings fits behind the trait.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub trait SemanticDistance: Send + Sync {
    /// Short identifier, recorded in logs.
    fn name(&self) -> &str;

    /// Distance in `[0, 1]`. Values outside the range are clamped by the
    /// checker and `NaN` counts as `1`.
    fn distance(&self, a: &str, b: &str) -> f64;

    /// Parts of `claimed` that `truth` gives no support for. A lossy
    /// rendering with any of these contradicts, however close it is.
    ///
    /// Defaults to the words of `claimed` that never occur in `truth`.
    fn unsupported(&self, truth: &str, claimed: &str) -> Vec<String> {
        let known = tokens(truth);
        tokens(claimed)
            .into_iter()
            .filter(|token| !known.contains(token))
            .collect()
    }
}

/// `1 - |A ∩ B| / |A ∪ B|` over lowercase word tokens.
///
/// Two texts without any tokens are at distance `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlapDistance;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("word regex must compile"))
}

/// Lowercase word tokens of `text`.
pub fn tokens(text: &str) -> BTreeSet<String> {
    word_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

impl SemanticDistance for TokenOverlapDistance {
    fn name(&self) -> &str {
        "token_overlap"
    }

    fn distance(&self, a: &str, b: &str) -> f64 {
        let (a, b) = (tokens(a), tokens(b));
        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        let shared = a.intersection(&b).count();
        1.0 - shared as f64 / union as f64
    }
}

/// `0` for identical text, `1` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactDistance;

impl SemanticDistance for ExactDistance {
    fn name(&self) -> &str {
        "exact"
    }

    fn distance(&self, a: &str, b: &str) -> f64 {
        if a == b { 0.0 } else { 1.0 }
    }
}

/// Clamp into `[0, 1]`; `NaN` is maximal.
pub(crate) fn normalized(distance: f64) -> f64 {
    if distance.is_nan() {
        1.0
    } else {
        distance.clamp(0.0, 1.0)
    }
}
