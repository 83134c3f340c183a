//! The base composition operations.
//!
//! - `sequence(a, b)`: `a: X→Y, b: Y→Z ⇒ X→Z`
//! - `parallel(a, b)`: `a: X→Y, b: X→Z ⇒ X→(Y, Z)`
//! - `branch(p, a, b)`: `p: X→bool, a: X→Y, b: X→Y ⇒ X→Y`
//! - `fix(p, a, policy)`: `p: Y→bool, a: X→Y ⇒ X→RetryOutcome<Y>`
//! - `observe(a)`: `a: X→Y ⇒ X→{output: Y, observation}`
//!
//! Every operation checks operand types before building anything and fails
//! with `AlgebraError::TypeMismatch`. The results are plain agents; no
//! operation introduces state beyond its children's positions.

use crate::agent::{Agent, Body, RetryOutcome, Signature};
use crate::error::AlgebraError;
use crate::value_type::ValueType;
use serde_json::Value;
use std::fmt;
use std::ops::Shr;
use std::sync::Arc;

/// Produces the next attempt's input from the previous input and output.
pub type RefineFn = dyn Fn(&Value, &Value) -> Value + Send + Sync;

/// How `fix` retries: a refinement step and a hard attempt bound.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    refine: Arc<RefineFn>,
}

impl RetryPolicy {
    pub fn new<F>(max_attempts: usize, refine: F) -> Result<Self, AlgebraError>
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        if max_attempts == 0 {
            return Err(AlgebraError::InvalidBound);
        }
        Ok(Self {
            max_attempts,
            refine: Arc::new(refine),
        })
    }

    /// Re-invoke with the same input every time.
    pub fn repeat(max_attempts: usize) -> Result<Self, AlgebraError> {
        Self::new(max_attempts, |input, _| input.clone())
    }

    /// Feed each output back in as the next input.
    pub fn feedback(max_attempts: usize) -> Result<Self, AlgebraError> {
        Self::new(max_attempts, |_, output| output.clone())
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn refine(&self, input: &Value, output: &Value) -> Value {
        (self.refine)(input, output)
    }
}

impl Default for RetryPolicy {
    /// `repeat` with the default bound of `ComposeConfig`.
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_RETRY_BOUND,
            refine: Arc::new(|input: &Value, _: &Value| input.clone()),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

fn composed(operation: &str, name: String, signature: Signature, body: Body) -> Agent {
    tracing::debug!(operation, agent = %name, signature = %signature, "composed agent");
    Agent::composite(name, signature, body)
}

fn mismatch(
    operation: &str,
    detail: String,
    expected: &ValueType,
    found: &ValueType,
) -> AlgebraError {
    AlgebraError::TypeMismatch {
        operation: operation.to_string(),
        detail,
        expected: expected.clone(),
        found: found.clone(),
    }
}

/// `a` then `b`: the output of `a` is the input of `b`.
pub fn sequence(a: &Agent, b: &Agent) -> Result<Agent, AlgebraError> {
    if !b.input_type().accepts(a.output_type()) {
        return Err(mismatch(
            "seq",
            format!("output of {} does not feed input of {}", a.name(), b.name()),
            b.input_type(),
            a.output_type(),
        ));
    }
    let signature = Signature::new(a.input_type().clone(), b.output_type().clone());
    Ok(composed(
        "seq",
        format!("seq({}, {})", a.name(), b.name()),
        signature,
        Body::Sequence(a.clone(), b.clone()),
    ))
}

/// `a` and `b` on the same input, outputs paired `[a, b]`.
pub fn parallel(a: &Agent, b: &Agent) -> Result<Agent, AlgebraError> {
    let input = ValueType::unify(a.input_type(), b.input_type()).ok_or_else(|| {
        mismatch(
            "par",
            format!("{} and {} take different inputs", a.name(), b.name()),
            a.input_type(),
            b.input_type(),
        )
    })?;
    let output = ValueType::pair(a.output_type().clone(), b.output_type().clone());
    Ok(composed(
        "par",
        format!("par({}, {})", a.name(), b.name()),
        Signature::new(input, output),
        Body::Parallel(a.clone(), b.clone()),
    ))
}

/// Runs `then` when `pred` holds on the input, `otherwise` when it does not.
pub fn branch(pred: &Agent, then: &Agent, otherwise: &Agent) -> Result<Agent, AlgebraError> {
    if !ValueType::Bool.accepts(pred.output_type()) {
        return Err(mismatch(
            "branch",
            format!("predicate {} does not produce a bool", pred.name()),
            &ValueType::Bool,
            pred.output_type(),
        ));
    }
    let arms_input = ValueType::unify(then.input_type(), otherwise.input_type()).ok_or_else(
        || {
            mismatch(
                "branch",
                format!("{} and {} take different inputs", then.name(), otherwise.name()),
                then.input_type(),
                otherwise.input_type(),
            )
        },
    )?;
    let input = ValueType::unify(pred.input_type(), &arms_input).ok_or_else(|| {
        mismatch(
            "branch",
            format!("predicate {} does not read the arms' input", pred.name()),
            &arms_input,
            pred.input_type(),
        )
    })?;
    let output = ValueType::unify(then.output_type(), otherwise.output_type()).ok_or_else(
        || {
            mismatch(
                "branch",
                format!("{} and {} produce different outputs", then.name(), otherwise.name()),
                then.output_type(),
                otherwise.output_type(),
            )
        },
    )?;
    Ok(composed(
        "branch",
        format!("branch({}, {}, {})", pred.name(), then.name(), otherwise.name()),
        Signature::new(input, output),
        Body::Branch {
            pred: pred.clone(),
            then: then.clone(),
            otherwise: otherwise.clone(),
        },
    ))
}

/// Retry `body` until `pred` holds on its output or the policy's bound is
/// reached. Always terminates after at most `policy.max_attempts()`
/// invocations of `body`.
pub fn fix(pred: &Agent, body: &Agent, policy: RetryPolicy) -> Result<Agent, AlgebraError> {
    if !pred.input_type().accepts(body.output_type()) {
        return Err(mismatch(
            "fix",
            format!(
                "predicate {} cannot read the output of {}",
                pred.name(),
                body.name()
            ),
            pred.input_type(),
            body.output_type(),
        ));
    }
    if !ValueType::Bool.accepts(pred.output_type()) {
        return Err(mismatch(
            "fix",
            format!("predicate {} does not produce a bool", pred.name()),
            &ValueType::Bool,
            pred.output_type(),
        ));
    }
    let signature = Signature::new(
        body.input_type().clone(),
        RetryOutcome::value_type(body.output_type().clone()),
    );
    Ok(composed(
        "fix",
        format!("fix({}, {})", pred.name(), body.name()),
        signature,
        Body::Fix {
            pred: pred.clone(),
            body: body.clone(),
            policy,
        },
    ))
}

/// Wraps `inner` so every transition is reported alongside its output.
pub fn observe(inner: &Agent) -> Agent {
    let output = ValueType::record([
        ("output", inner.output_type().clone()),
        (
            "observation",
            ValueType::record([
                ("agent", ValueType::Text),
                ("input", ValueType::Any),
                ("from", ValueType::Any),
                ("to", ValueType::Any),
            ]),
        ),
    ]);
    composed(
        "observe",
        format!("observe({})", inner.name()),
        Signature::new(inner.input_type().clone(), output),
        Body::Observe(inner.clone()),
    )
}

impl Shr for Agent {
    type Output = Result<Agent, AlgebraError>;

    fn shr(self, rhs: Agent) -> Self::Output {
        sequence(&self, &rhs)
    }
}

impl Shr<&Agent> for &Agent {
    type Output = Result<Agent, AlgebraError>;

    fn shr(self, rhs: &Agent) -> Self::Output {
        sequence(self, rhs)
    }
}

/// Lets `(a >> b) >> c` chain without unwrapping in between.
impl Shr<Agent> for Result<Agent, AlgebraError> {
    type Output = Result<Agent, AlgebraError>;

    fn shr(self, rhs: Agent) -> Self::Output {
        sequence(&self?, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Directions, RetryStatus, make_agent};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add(n: i64) -> Agent {
        Agent::stateless(
            format!("add{n}"),
            Signature::new(ValueType::Number, ValueType::Number),
            move |x| json!(x.as_i64().unwrap_or(0) + n),
        )
    }

    fn show() -> Agent {
        Agent::stateless(
            "show",
            Signature::new(ValueType::Number, ValueType::Text),
            |x| json!(x.to_string()),
        )
    }

    /// Counts inputs seen so far; position is the running count, capped at 3.
    fn tally() -> Agent {
        make_agent(
            "tally",
            Signature::new(ValueType::Number, ValueType::Number),
            vec![json!(0), json!(1), json!(2), json!(3)],
            |_| Directions::Typed(ValueType::Number),
            |position, _| {
                let next = (position.as_i64().unwrap_or(0) + 1).min(3);
                (json!(next), json!(next))
            },
        )
        .unwrap()
    }

    #[test]
    fn sequence_feeds_output_forward() {
        let pipeline = sequence(&add(1), &show()).unwrap();
        assert_eq!(pipeline.name(), "seq(add1, show)");
        assert_eq!(pipeline.signature().to_string(), "number -> text");
        let step = pipeline.invoke(pipeline.initial(), &json!(41)).unwrap();
        assert_eq!(step.output, json!("42"));
    }

    #[test]
    fn sequence_rejects_mismatched_types_at_composition() {
        let err = sequence(&show(), &add(1)).unwrap_err();
        match err {
            AlgebraError::TypeMismatch {
                operation,
                expected,
                found,
                ..
            } => {
                assert_eq!(operation, "seq");
                assert_eq!(expected, ValueType::Number);
                assert_eq!(found, ValueType::Text);
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn literal_pair_feeds_swap() {
        let flipped = (Agent::constant(json!([1, 2])) >> Agent::swap()).unwrap();
        assert_eq!(
            flipped.invoke(flipped.initial(), &json!(null)).unwrap().output,
            json!([2, 1])
        );
    }

    #[test]
    fn infix_sequencing_chains() {
        let chained = (add(1) >> add(2)) >> show();
        let agent = chained.unwrap();
        assert_eq!(agent.name(), "seq(seq(add1, add2), show)");
        assert_eq!(
            agent.invoke(agent.initial(), &json!(0)).unwrap().output,
            json!("3")
        );

        let by_ref = &add(1) >> &add(1);
        assert!(by_ref.is_ok());
        assert!(((show() >> add(1)) >> add(1)).is_err());
    }

    #[test]
    fn composite_positions_decompose_into_frontier() {
        let pipeline = sequence(&tally(), &sequence(&add(0), &tally()).unwrap()).unwrap();
        assert_eq!(pipeline.initial(), &json!([0, [null, 0]]));
        let trace = pipeline
            .trace(pipeline.initial(), &[json!(5), json!(5)])
            .unwrap();
        assert_eq!(trace.final_position, json!([2, [null, 2]]));
        assert_eq!(trace.final_frontier, vec![json!(2), json!(null), json!(2)]);
        assert_eq!(trace.steps[0].stages.len(), 3);
        assert_eq!(pipeline.positions().len(), 16);
    }

    #[test]
    fn parallel_pairs_outputs() {
        let both = parallel(&add(1), &show()).unwrap();
        assert_eq!(
            both.invoke(both.initial(), &json!(1)).unwrap().output,
            json!([2, "1"])
        );

        let text_in = Agent::identity(ValueType::Text);
        assert!(parallel(&add(1), &text_in).is_err());
    }

    #[test]
    fn branch_selects_by_predicate() {
        let positive = Agent::predicate("positive", ValueType::Number, |x| {
            x.as_i64().is_some_and(|n| n > 0)
        });
        let chooser = branch(&positive, &add(100), &add(-100)).unwrap();
        let up = chooser.invoke(chooser.initial(), &json!(1)).unwrap();
        let down = chooser.invoke(chooser.initial(), &json!(-1)).unwrap();
        assert_eq!(up.output, json!(101));
        assert_eq!(down.output, json!(-101));

        assert!(branch(&add(1), &add(1), &add(2)).is_err());
        assert!(branch(&positive, &add(1), &show()).is_err());
    }

    #[test]
    fn branch_advances_only_the_taken_arm() {
        let always = Agent::constant(json!(true));
        let chooser = branch(&always, &tally(), &tally()).unwrap();
        let step = chooser.invoke(chooser.initial(), &json!(9)).unwrap();
        assert_eq!(step.position, json!([null, 1, 0]));
    }

    #[test]
    fn fix_converges_with_feedback() {
        let big = Agent::predicate("big", ValueType::Number, |x| {
            x.as_i64().is_some_and(|n| n >= 10)
        });
        let doubler = Agent::stateless(
            "double",
            Signature::new(ValueType::Number, ValueType::Number),
            |x| json!(x.as_i64().unwrap_or(0) * 2),
        );
        let retry = fix(&big, &doubler, RetryPolicy::feedback(10).unwrap()).unwrap();
        let outcome =
            RetryOutcome::from_value(&retry.invoke(retry.initial(), &json!(1)).unwrap().output)
                .unwrap();
        assert_eq!(outcome.status, RetryStatus::Converged);
        assert_eq!(outcome.value, json!(16));
        assert_eq!(outcome.attempts, 4);
    }

    #[test]
    fn fix_exhausts_after_exactly_the_bound() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = {
            let calls = Arc::clone(&calls);
            Agent::stateless(
                "counted",
                Signature::new(ValueType::Number, ValueType::Number),
                move |x| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    x.clone()
                },
            )
        };
        let never = Agent::predicate("never", ValueType::Any, |_| false);
        let retry = fix(&never, &counter, RetryPolicy::repeat(5).unwrap()).unwrap();

        let step = retry.invoke(retry.initial(), &json!(0)).unwrap();
        let outcome = RetryOutcome::from_value(&step.output).unwrap();
        assert_eq!(outcome.status, RetryStatus::Exhausted);
        assert_eq!(outcome.attempts, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn fix_rejects_zero_bound_and_bad_predicates() {
        assert!(matches!(
            RetryPolicy::repeat(0),
            Err(AlgebraError::InvalidBound)
        ));
        let text_pred = Agent::predicate("t", ValueType::Text, |_| true);
        assert!(fix(&text_pred, &add(1), RetryPolicy::repeat(1).unwrap()).is_err());
    }

    #[test]
    fn observe_reports_transition() {
        let watched = observe(&tally());
        let step = watched.invoke(watched.initial(), &json!(4)).unwrap();
        assert_eq!(step.output["output"], json!(1));
        assert_eq!(step.output["observation"]["agent"], "tally");
        assert_eq!(step.output["observation"]["from"], json!(0));
        assert_eq!(step.output["observation"]["to"], json!(1));
        assert_eq!(step.position, json!(1));
    }
}
