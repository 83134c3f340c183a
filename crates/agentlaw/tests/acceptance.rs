//! Acceptance tests for the engine as a whole, driven through `Engine`.

use agentlaw::{
    Agent, AlgebraError, Directions, Engine, EngineConfig, Renderings, RetryOutcome, RetryStatus,
    Signature, TestInput, ValueType, VerificationResult, View, law_name, make_agent, make_sheaf,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

fn number() -> Signature {
    Signature::new(ValueType::Number, ValueType::Number)
}

fn scale(name: &str, mul: i64, add: i64) -> Agent {
    Agent::stateless(name, number(), move |x| {
        json!(x.as_i64().unwrap_or(0) * mul + add)
    })
}

/// Running sum modulo 5; outputs the sum.
fn tally() -> Agent {
    make_agent(
        "tally",
        number(),
        (0..5).map(|n| json!(n)).collect(),
        |_| Directions::Typed(ValueType::Number),
        |position, x| {
            let sum = (position.as_i64().unwrap_or(0) + x.as_i64().unwrap_or(0)).rem_euclid(5);
            (json!(sum), json!(sum))
        },
    )
    .unwrap()
}

fn sequence(values: &[i64]) -> TestInput {
    TestInput::sequence(values.iter().map(|v| json!(v)))
}

proptest! {
    #[test]
    fn identity_laws_hold(xs in prop::collection::vec(-50i64..50, 1..10)) {
        let engine = Engine::default();
        for law in [law_name::SEQ_LEFT_IDENTITY, law_name::SEQ_RIGHT_IDENTITY] {
            let result = engine.verify(law, &[tally()], &[sequence(&xs)]);
            prop_assert!(result.is_satisfied(), "{:?}", result);
        }
    }

    #[test]
    fn associativity_holds(
        a in -4i64..4, b in -4i64..4, xs in prop::collection::vec(-50i64..50, 1..10)
    ) {
        let engine = Engine::default();
        let result = engine.verify(
            law_name::SEQ_ASSOCIATIVITY,
            &[scale("f", a, 1), tally(), scale("g", 1, b)],
            &[sequence(&xs)],
        );
        prop_assert!(result.is_satisfied(), "{:?}", result);
    }

    #[test]
    fn sampled_agents_never_violate_identity(seed in any::<u64>()) {
        let engine = Engine::default();
        let primitives = [tally(), scale("double", 2, 0)];
        let agent = engine.sample(&primitives, seed, 3).unwrap();
        let result = engine.verify(law_name::SEQ_LEFT_IDENTITY, &[agent], &[sequence(&[1, 2, 3])]);
        prop_assert!(!matches!(result, VerificationResult::Violated(_)), "{:?}", result);
    }
}

#[test]
fn call_count_dependent_agent_is_caught() {
    let calls = Arc::new(AtomicI64::new(0));
    let sneaky = Agent::stateless("sneaky", number(), move |x| {
        json!(x.as_i64().unwrap_or(0) * (1 + calls.fetch_add(1, Ordering::SeqCst) % 2))
    });
    let engine = Engine::default();
    let result = engine.verify(
        law_name::SEQ_ASSOCIATIVITY,
        &[sneaky, scale("f", 1, 0), scale("g", 1, 0)],
        &[sequence(&[4, 4, 4])],
    );
    let VerificationResult::Violated(diagnostic) = &result else {
        panic!("expected a violation, got {result:?}");
    };
    assert_eq!(diagnostic.law, law_name::SEQ_ASSOCIATIVITY);
    assert_ne!(diagnostic.lhs.outputs, diagnostic.rhs.outputs);
    assert_ne!(diagnostic.divergence.lhs, diagnostic.divergence.rhs);
    assert_eq!(diagnostic.input, sequence(&[4, 4, 4]));
    assert!(diagnostic.message.contains(law_name::SEQ_ASSOCIATIVITY));
}

#[test]
fn mismatched_types_fail_at_composition_time() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&invoked);
    let shout = Agent::stateless(
        "shout",
        Signature::new(ValueType::Text, ValueType::Text),
        move |s| {
            seen.fetch_add(1, Ordering::SeqCst);
            json!(s.as_str().unwrap_or_default().to_uppercase())
        },
    );
    let err = (scale("f", 1, 0) >> shout).unwrap_err();
    assert!(matches!(err, AlgebraError::TypeMismatch { .. }), "{err}");
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

#[test]
fn complete_views_of_a_string_agree() {
    let sheaf = make_sheaf(
        "message",
        vec![
            View::identity("plain"),
            View::complete("folded", |v| json!(text(v).to_uppercase().to_lowercase())),
        ],
        "plain",
        |r: &Renderings| r.get("plain").or_else(|| r.get("folded")).cloned(),
    )
    .unwrap();
    assert!(Engine::default().check(&sheaf, &json!("hello world")).is_coherent());
}

fn excerpted<F>(render: F) -> agentlaw::Sheaf
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    make_sheaf(
        "excerpted",
        vec![View::identity("full"), View::lossy("first10", render)],
        "full",
        |r: &Renderings| r.get("full").cloned(),
    )
    .unwrap()
}

#[test]
fn lossy_prefix_is_coherent_and_unrelated_text_is_not() {
    let engine = Engine::default();
    let instance = json!("hello world");

    let prefix = excerpted(|v| json!(text(v).chars().take(10).collect::<String>()));
    assert!(engine.check(&prefix, &instance).is_coherent());

    let unrelated = excerpted(|_| json!("stock prices fell"));
    let result = engine.check(&unrelated, &instance);
    assert!(!result.is_coherent());
    assert!(result.conflicts().iter().all(|c| c.involves("first10")));
}

#[test]
fn retry_stops_after_exactly_the_configured_bound() {
    const BOUND: usize = 4;
    let config =
        EngineConfig::from_toml_str(&format!("[compose]\ndefault_retry_bound = {BOUND}\n"))
            .unwrap();
    let engine = Engine::new(config).unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&invocations);
    let attempt = Agent::stateless("attempt", number(), move |x| {
        seen.fetch_add(1, Ordering::SeqCst);
        x.clone()
    });
    let never = Agent::predicate("never", ValueType::Number, |_| false);
    let retry = engine.compose("fix", &[never, attempt]).unwrap();

    let step = retry.invoke(retry.initial(), &json!(7)).unwrap();
    let outcome = RetryOutcome::from_value(&step.output).unwrap();
    assert_eq!(outcome.status, RetryStatus::Exhausted);
    assert_eq!(outcome.attempts, BOUND);
    assert_eq!(invocations.load(Ordering::SeqCst), BOUND);
}

#[test]
fn extending_leaves_the_base_algebra_alone() {
    let engine = Engine::default();
    let before: Vec<String> = engine
        .algebra()
        .catalogue()
        .into_iter()
        .map(|op| op.name)
        .collect();
    let twice = agentlaw::make_operation("twice", 1, "(A -> A) -> (A -> A)", |args| {
        agentlaw::kernel::sequence(&args[0], &args[0])
    });
    let extended = engine
        .algebra()
        .extend("base+twice", vec![twice], Vec::new())
        .unwrap();
    let with_twice = engine.with_algebra(extended);

    assert!(with_twice.compose("twice", &[tally()]).is_ok());
    assert!(engine.compose("twice", &[tally()]).is_err());
    let after: Vec<String> = engine
        .algebra()
        .catalogue()
        .into_iter()
        .map(|op| op.name)
        .collect();
    assert_eq!(before, after);
}
