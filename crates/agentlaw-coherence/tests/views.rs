//! Integration tests: sheaves of text and record views.

use agentlaw_coherence::{
    Checker, CoherenceConfig, CoherenceResult, Renderings, SemanticDistance, View, check,
    make_sheaf, make_view,
};
use agentlaw_kernel::witness::failure_class;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn glue_from_any(renderings: &Renderings) -> Option<Value> {
    renderings
        .get("full")
        .or_else(|| renderings.get("round_trip"))
        .cloned()
}

#[test]
fn identity_and_case_round_trip_views_are_coherent() {
    let sheaf = make_sheaf(
        "note",
        vec![
            View::identity("full"),
            make_view(
                "round_trip",
                |v| json!(text(v).to_uppercase().to_lowercase()),
                false,
            ),
        ],
        "full",
        glue_from_any,
    )
    .unwrap();
    assert_eq!(check(&sheaf, &json!("hello world")), CoherenceResult::Coherent);
}

fn excerpt_sheaf<F>(excerpt: F) -> agentlaw_coherence::Sheaf
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    make_sheaf(
        "excerpted",
        vec![View::identity("full"), View::lossy("excerpt", excerpt)],
        "full",
        |r: &Renderings| r.get("full").cloned(),
    )
    .unwrap()
}

#[test]
fn truncated_excerpt_does_not_contradict() {
    let sheaf = excerpt_sheaf(|v| json!(text(v).chars().take(10).collect::<String>()));
    assert!(check(&sheaf, &json!("hello world")).is_coherent());
}

#[test]
fn unrelated_excerpt_is_named_in_the_conflict() {
    let sheaf = excerpt_sheaf(|_| json!("quarterly revenue grew"));
    let result = check(&sheaf, &json!("hello world"));
    let conflicts = result.conflicts();
    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.class, failure_class::LOSSY_VIEW_CONTRADICTION);
    assert_eq!(conflict.views, ["full".to_string(), "excerpt".to_string()]);
    assert_eq!(conflict.expected, json!("hello world"));
    assert_eq!(conflict.found, json!("quarterly revenue grew"));
    assert_eq!(conflict.distance, Some(1.0));
    assert!(conflict.involves("excerpt"));
    assert!(conflict.witness_id.starts_with("w1_"));
    assert_eq!(result, check(&sheaf, &json!("hello world")));
}

/// Record artifact with a JSON view, a `key=value` line view, and a lossy
/// title card.
fn record_sheaf() -> agentlaw_coherence::Sheaf {
    let lines = |v: &Value| {
        let mut out: Vec<String> = v
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}={}", text(v)))
                    .collect()
            })
            .unwrap_or_default();
        out.sort();
        json!(out.join("\n"))
    };
    make_sheaf(
        "record",
        vec![
            View::identity("json"),
            View::complete("lines", lines),
            View::lossy("card", |v| json!({"title": v["title"]})),
        ],
        "json",
        |r: &Renderings| {
            if let Some(json) = r.get("json") {
                return Some(json.clone());
            }
            let lines = r.get("lines")?.as_str()?;
            let mut fields = serde_json::Map::new();
            for line in lines.lines() {
                let (k, v) = line.split_once('=')?;
                fields.insert(k.to_string(), json!(v));
            }
            Some(Value::Object(fields))
        },
    )
    .unwrap()
}

#[test]
fn record_views_agree_and_card_is_entailed() {
    let instance = json!({"title": "Release notes", "body": "Fixes and features"});
    assert!(check(&record_sheaf(), &instance).is_coherent());
}

#[test]
fn lossy_views_are_not_required_to_round_trip() {
    // The card alone cannot rebuild the record, and is never asked to.
    let sheaf = record_sheaf();
    let instance = json!({"title": "T", "body": "B"});
    let only_card: Renderings = [("card".to_string(), json!({"title": "T"}))]
        .into_iter()
        .collect();
    assert_eq!(sheaf.glue(&only_card), None);
    assert!(check(&sheaf, &instance).is_coherent());
}

#[test]
fn lossless_view_that_drops_information_is_reported() {
    // `lines` cannot represent embedded newlines, so it fails to round-trip.
    let instance = json!({"title": "T", "body": "two\nlines"});
    let result = check(&record_sheaf(), &instance);
    assert!(!result.is_coherent());
    assert!(
        result
            .conflicts()
            .iter()
            .any(|c| c.class == failure_class::COMPLETE_VIEWS_DISAGREE
                || c.class == failure_class::GLUE_UNDEFINED)
    );
    assert!(result.conflicts().iter().all(|c| c.involves("lines")));
}

struct Counting {
    calls: Arc<AtomicUsize>,
}

impl SemanticDistance for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn distance(&self, _: &str, _: &str) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        f64::NAN
    }
}

#[test]
fn distance_is_only_consulted_when_entailment_fails() {
    let calls = Arc::new(AtomicUsize::new(0));
    let checker = Checker::with_distance(
        CoherenceConfig::default(),
        Counting {
            calls: Arc::clone(&calls),
        },
    );

    let entailed = excerpt_sheaf(|v| json!(text(v).chars().take(5).collect::<String>()));
    assert!(checker.check(&entailed, &json!("hello world")).is_coherent());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let unrelated = excerpt_sheaf(|_| json!("hello there"));
    let result = checker.check(&unrelated, &json!("hello world"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // NaN counts as maximally distant.
    assert_eq!(result.conflicts()[0].distance, Some(1.0));
}

#[test]
fn looser_threshold_admits_a_sparse_gist() {
    let sheaf = excerpt_sheaf(|_| json!("fox, quick"));
    let instance = json!("the quick brown fox jumps");
    // {fox, quick} / {the, quick, brown, fox, jumps}: distance 3/5.
    assert!(!check(&sheaf, &instance).is_coherent());
    let loose = Checker::new(CoherenceConfig {
        max_lossy_distance: 0.7,
    });
    assert!(loose.check(&sheaf, &instance).is_coherent());
}

#[test]
fn added_words_contradict_at_any_threshold() {
    let sheaf = excerpt_sheaf(|_| json!("hello there"));
    let loose = Checker::new(CoherenceConfig {
        max_lossy_distance: 1.0,
    });
    let result = loose.check(&sheaf, &json!("hello world"));
    assert_eq!(result.conflicts().len(), 1);
    assert!(result.conflicts()[0].description.contains("there"));
}
