//! Polynomial agents.
//!
//! An agent is a finite set of positions (modes), a function from position
//! to the legal inputs there (`directions`), and a deterministic transition
//! `(position, input) -> (position', output)`.
//!
//! Primitive agents wrap caller closures. Composite agents are produced by
//! the algebra (see `compose`) and keep their structure, so a composite
//! position can always be decomposed into its **frontier**: the ordered
//! list of primitive positions it is made of. Composite positions are JSON
//! arrays of their children's positions.
//!
//! ## Contract
//!
//! `invoke(position, input)` requires `position ∈ positions` and
//! `input ∈ directions(position)`. Anything else is a `ContractError`.
//! Agents must be referentially transparent; hidden state inside a closure
//! is exactly what the law verifier is built to expose.

use crate::compose::RetryPolicy;
use crate::error::{AgentError, ContractError};
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Legal inputs at a position.
pub type DirectionsFn = dyn Fn(&Value) -> Directions + Send + Sync;

/// Step function of a primitive agent.
pub type TransitionFn = dyn Fn(&Value, &Value) -> (Value, Value) + Send + Sync;

/// The set of legal inputs at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directions {
    /// Exactly these inputs.
    Finite(Vec<Value>),
    /// Every value of this type.
    Typed(ValueType),
}

impl Directions {
    /// No legal input at all.
    pub fn none() -> Self {
        Self::Finite(Vec::new())
    }

    pub fn contains(&self, input: &Value) -> bool {
        match self {
            Self::Finite(values) => values.contains(input),
            Self::Typed(ty) => ty.admits(input),
        }
    }

    /// Inputs legal in both `self` and `other`.
    pub fn intersect(self, other: Directions) -> Directions {
        match (self, other) {
            (Self::Finite(values), other) => {
                Self::Finite(values.into_iter().filter(|v| other.contains(v)).collect())
            }
            (typed, Self::Finite(values)) => {
                Self::Finite(values.into_iter().filter(|v| typed.contains(v)).collect())
            }
            (Self::Typed(a), Self::Typed(b)) => match ValueType::unify(&a, &b) {
                Some(ty) => Self::Typed(ty),
                None => Self::none(),
            },
        }
    }

    /// The enumerable inputs, when the set is finite.
    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Self::Finite(values) => Some(values),
            Self::Typed(_) => None,
        }
    }
}

/// Declared input and output types of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub input: ValueType,
    pub output: ValueType,
}

impl Signature {
    pub fn new(input: ValueType, output: ValueType) -> Self {
        Self { input, output }
    }

    /// `any -> any`.
    pub fn untyped() -> Self {
        Self::new(ValueType::Any, ValueType::Any)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.input, self.output)
    }
}

/// One invocation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub position: Value,
    pub output: Value,
}

/// Result of folding `invoke` over an input sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub final_position: Value,
    pub outputs: Vec<Value>,
}

/// A primitive invocation recorded while tracing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub agent: String,
    pub input: Value,
    pub output: Value,
}

/// Everything observed during one traced step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTrace {
    pub input: Value,
    pub output: Value,
    /// Primitive positions after the step.
    pub frontier: Vec<Value>,
    /// Primitive invocations in execution order.
    pub stages: Vec<Stage>,
}

/// A traced run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub initial: Value,
    pub final_position: Value,
    pub final_frontier: Vec<Value>,
    pub steps: Vec<StepTrace>,
}

impl Trace {
    pub fn outputs(&self) -> Vec<Value> {
        self.steps.iter().map(|s| s.output.clone()).collect()
    }
}

pub(crate) struct Primitive {
    positions: Vec<Value>,
    directions: Arc<DirectionsFn>,
    transition: Arc<TransitionFn>,
}

/// Structure of an agent. Only the algebra builds composite bodies.
pub(crate) enum Body {
    Primitive(Primitive),
    /// Passes its input through. Has the single position `null` and is
    /// never recorded as a stage.
    Identity,
    Sequence(Agent, Agent),
    Parallel(Agent, Agent),
    Branch {
        pred: Agent,
        then: Agent,
        otherwise: Agent,
    },
    Fix {
        pred: Agent,
        body: Agent,
        policy: RetryPolicy,
    },
    Observe(Agent),
}

/// A typed, finite-position, deterministic state-transition unit.
///
/// Cheap to clone: the body is shared.
#[derive(Clone)]
pub struct Agent {
    name: String,
    signature: Signature,
    initial: Value,
    body: Arc<Body>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Start building a primitive agent.
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// A single-position agent computing `f(input)`.
    pub fn stateless<F>(name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let input = signature.input.clone();
        Self::primitive(
            name.into(),
            signature,
            vec![Value::Null],
            Value::Null,
            Arc::new(move |_: &Value| Directions::Typed(input.clone())),
            Arc::new(move |position: &Value, x: &Value| (position.clone(), f(x))),
        )
    }

    /// A stateless `input -> bool` agent, for `branch` and `fix`.
    pub fn predicate<F>(name: impl Into<String>, input: ValueType, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::stateless(name, Signature::new(input, ValueType::Bool), move |x| {
            Value::Bool(f(x))
        })
    }

    /// The identity on `ty`.
    pub fn identity(ty: ValueType) -> Self {
        Self {
            name: "id".to_string(),
            signature: Signature::new(ty.clone(), ty),
            initial: Value::Null,
            body: Arc::new(Body::Identity),
        }
    }

    /// Ignores its input and emits `value`.
    pub fn constant(value: Value) -> Self {
        let name = format!("const({value})");
        let output = ValueType::of(&value);
        Self::stateless(name, Signature::new(ValueType::Any, output), move |_| {
            value.clone()
        })
    }

    /// `[a, b] -> [b, a]`.
    pub fn swap() -> Self {
        Self::stateless(
            "swap",
            Signature::new(
                ValueType::pair(ValueType::Any, ValueType::Any),
                ValueType::pair(ValueType::Any, ValueType::Any),
            ),
            |pair| match pair.as_array().map(Vec::as_slice) {
                Some([a, b]) => json!([b, a]),
                _ => Value::Null,
            },
        )
    }

    /// Extracts one field of a record.
    pub fn project(field: impl Into<String>) -> Self {
        let field = field.into();
        let name = format!("project({field})");
        let input = ValueType::record([(field.clone(), ValueType::Any)]);
        Self::stateless(name, Signature::new(input, ValueType::Any), move |record| {
            record.get(&field).cloned().unwrap_or(Value::Null)
        })
    }

    pub(crate) fn primitive(
        name: String,
        signature: Signature,
        positions: Vec<Value>,
        initial: Value,
        directions: Arc<DirectionsFn>,
        transition: Arc<TransitionFn>,
    ) -> Self {
        Self {
            name,
            signature,
            initial,
            body: Arc::new(Body::Primitive(Primitive {
                positions,
                directions,
                transition,
            })),
        }
    }

    pub(crate) fn composite(name: String, signature: Signature, body: Body) -> Self {
        let initial = match &body {
            Body::Primitive(_) | Body::Identity => Value::Null,
            Body::Sequence(a, b) | Body::Parallel(a, b) => json!([a.initial, b.initial]),
            Body::Branch {
                pred,
                then,
                otherwise,
            } => json!([pred.initial, then.initial, otherwise.initial]),
            Body::Fix { pred, body, .. } => json!([pred.initial, body.initial]),
            Body::Observe(inner) => inner.initial.clone(),
        };
        Self {
            name,
            signature,
            initial,
            body: Arc::new(body),
        }
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn input_type(&self) -> &ValueType {
        &self.signature.input
    }

    pub fn output_type(&self) -> &ValueType {
        &self.signature.output
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }

    pub fn is_primitive(&self) -> bool {
        matches!(&*self.body, Body::Primitive(_))
    }

    /// Same behavior under another name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Same behavior, starting from `position`.
    pub fn starting_at(&self, position: Value) -> Result<Self, ContractError> {
        if !self.is_position(&position) {
            return Err(ContractError::UnknownPosition {
                agent: self.name.clone(),
                position,
            });
        }
        Ok(Self {
            initial: position,
            ..self.clone()
        })
    }

    pub fn is_position(&self, position: &Value) -> bool {
        match &*self.body {
            Body::Primitive(p) => p.positions.contains(position),
            Body::Identity => position.is_null(),
            Body::Sequence(a, b) | Body::Parallel(a, b) => {
                split::<2>(position).is_some_and(|[pa, pb]| a.is_position(pa) && b.is_position(pb))
            }
            Body::Branch {
                pred,
                then,
                otherwise,
            } => split::<3>(position).is_some_and(|[pp, pt, po]| {
                pred.is_position(pp) && then.is_position(pt) && otherwise.is_position(po)
            }),
            Body::Fix { pred, body, .. } => split::<2>(position)
                .is_some_and(|[pp, pb]| pred.is_position(pp) && body.is_position(pb)),
            Body::Observe(inner) => inner.is_position(position),
        }
    }

    /// Every position, as a cartesian product for composites.
    pub fn positions(&self) -> Vec<Value> {
        match &*self.body {
            Body::Primitive(p) => p.positions.clone(),
            Body::Identity => vec![Value::Null],
            Body::Sequence(a, b) | Body::Parallel(a, b) => {
                product(&[a.positions(), b.positions()])
            }
            Body::Branch {
                pred,
                then,
                otherwise,
            } => product(&[pred.positions(), then.positions(), otherwise.positions()]),
            Body::Fix { pred, body, .. } => product(&[pred.positions(), body.positions()]),
            Body::Observe(inner) => inner.positions(),
        }
    }

    /// Legal inputs at `position`. Empty when `position` is not a position.
    pub fn directions(&self, position: &Value) -> Directions {
        if !self.is_position(position) {
            return Directions::none();
        }
        match &*self.body {
            Body::Primitive(p) => (p.directions)(position),
            Body::Identity => Directions::Typed(self.signature.input.clone()),
            Body::Sequence(a, _) => child_directions::<2>(a, position, 0),
            Body::Parallel(a, b) => child_directions::<2>(a, position, 0)
                .intersect(child_directions::<2>(b, position, 1)),
            Body::Branch {
                pred,
                then,
                otherwise,
            } => child_directions::<3>(pred, position, 0)
                .intersect(child_directions::<3>(then, position, 1))
                .intersect(child_directions::<3>(otherwise, position, 2)),
            Body::Fix { body, .. } => child_directions::<2>(body, position, 1),
            Body::Observe(inner) => inner.directions(position),
        }
    }

    /// Primitive positions inside `position`, left to right.
    ///
    /// Identities hold no state and contribute nothing, so `seq(id, a)` and
    /// `a` share a frontier.
    pub fn frontier(&self, position: &Value) -> Vec<Value> {
        let mut out = Vec::new();
        self.collect_frontier(position, &mut out);
        out
    }

    fn collect_frontier(&self, position: &Value, out: &mut Vec<Value>) {
        match &*self.body {
            Body::Primitive(_) => out.push(position.clone()),
            Body::Identity => {}
            Body::Sequence(a, b) | Body::Parallel(a, b) | Body::Fix { pred: a, body: b, .. } => {
                match split::<2>(position) {
                    Some([pa, pb]) => {
                        a.collect_frontier(pa, out);
                        b.collect_frontier(pb, out);
                    }
                    None => out.push(position.clone()),
                }
            }
            Body::Branch {
                pred,
                then,
                otherwise,
            } => match split::<3>(position) {
                Some([pp, pt, po]) => {
                    pred.collect_frontier(pp, out);
                    then.collect_frontier(pt, out);
                    otherwise.collect_frontier(po, out);
                }
                None => out.push(position.clone()),
            },
            Body::Observe(inner) => inner.collect_frontier(position, out),
        }
    }

    /// One transition.
    pub fn invoke(&self, position: &Value, input: &Value) -> Result<Step, ContractError> {
        let mut stages = Vec::new();
        self.step(position, input, &mut stages)
    }

    /// Fold `invoke` over `inputs`, left to right.
    pub fn run(&self, initial: &Value, inputs: &[Value]) -> Result<Run, ContractError> {
        let mut position = initial.clone();
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            let step = self.invoke(&position, input)?;
            position = step.position;
            outputs.push(step.output);
        }
        Ok(Run {
            final_position: position,
            outputs,
        })
    }

    /// `run` from the agent's initial position.
    pub fn run_from_start(&self, inputs: &[Value]) -> Result<Run, ContractError> {
        self.run(&self.initial, inputs)
    }

    /// `run`, recording frontiers and primitive stages for every step.
    pub fn trace(&self, initial: &Value, inputs: &[Value]) -> Result<Trace, ContractError> {
        if !self.is_position(initial) {
            return Err(self.unknown_position(initial));
        }
        let mut position = initial.clone();
        let mut steps = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut stages = Vec::new();
            let step = self.step(&position, input, &mut stages)?;
            steps.push(StepTrace {
                input: input.clone(),
                output: step.output,
                frontier: self.frontier(&step.position),
                stages,
            });
            position = step.position;
        }
        Ok(Trace {
            initial: initial.clone(),
            final_frontier: self.frontier(&position),
            final_position: position,
            steps,
        })
    }

    fn unknown_position(&self, position: &Value) -> ContractError {
        ContractError::UnknownPosition {
            agent: self.name.clone(),
            position: position.clone(),
        }
    }

    fn split_position<'a, const N: usize>(
        &self,
        position: &'a Value,
    ) -> Result<[&'a Value; N], ContractError> {
        split::<N>(position).ok_or_else(|| self.unknown_position(position))
    }

    fn step(
        &self,
        position: &Value,
        input: &Value,
        stages: &mut Vec<Stage>,
    ) -> Result<Step, ContractError> {
        if !self.is_position(position) {
            return Err(self.unknown_position(position));
        }
        if !self.directions(position).contains(input) {
            return Err(ContractError::IllegalInput {
                agent: self.name.clone(),
                position: position.clone(),
                input: input.clone(),
            });
        }

        match &*self.body {
            Body::Primitive(p) => {
                let (next, output) = (p.transition)(position, input);
                if !p.positions.contains(&next) {
                    return Err(ContractError::IllegalTransition {
                        agent: self.name.clone(),
                        position: position.clone(),
                        produced: next,
                    });
                }
                if !self.signature.output.admits(&output) {
                    return Err(ContractError::IllTypedOutput {
                        agent: self.name.clone(),
                        output,
                        expected: self.signature.output.clone(),
                    });
                }
                stages.push(Stage {
                    agent: self.name.clone(),
                    input: input.clone(),
                    output: output.clone(),
                });
                Ok(Step {
                    position: next,
                    output,
                })
            }

            Body::Identity => Ok(Step {
                position: Value::Null,
                output: input.clone(),
            }),

            Body::Sequence(a, b) => {
                let [pa, pb] = self.split_position::<2>(position)?;
                let first = a.step(pa, input, stages)?;
                let second = b.step(pb, &first.output, stages)?;
                Ok(Step {
                    position: json!([first.position, second.position]),
                    output: second.output,
                })
            }

            Body::Parallel(a, b) => {
                let [pa, pb] = self.split_position::<2>(position)?;
                let left = a.step(pa, input, stages)?;
                let right = b.step(pb, input, stages)?;
                Ok(Step {
                    position: json!([left.position, right.position]),
                    output: json!([left.output, right.output]),
                })
            }

            Body::Branch {
                pred,
                then,
                otherwise,
            } => {
                let [pp, pt, po] = self.split_position::<3>(position)?;
                let verdict = pred.step(pp, input, stages)?;
                if as_verdict(pred, &verdict.output)? {
                    let taken = then.step(pt, input, stages)?;
                    Ok(Step {
                        position: json!([verdict.position, taken.position, po]),
                        output: taken.output,
                    })
                } else {
                    let taken = otherwise.step(po, input, stages)?;
                    Ok(Step {
                        position: json!([verdict.position, pt, taken.position]),
                        output: taken.output,
                    })
                }
            }

            Body::Fix { pred, body, policy } => {
                let [pp, pb] = self.split_position::<2>(position)?;
                let mut pred_position = pp.clone();
                let mut body_position = pb.clone();
                let mut attempt_input = input.clone();
                let mut attempts = 0;
                loop {
                    attempts += 1;
                    let produced = body.step(&body_position, &attempt_input, stages)?;
                    body_position = produced.position;
                    let verdict = pred.step(&pred_position, &produced.output, stages)?;
                    pred_position = verdict.position;
                    let holds = as_verdict(pred, &verdict.output)?;
                    if holds || attempts >= policy.max_attempts() {
                        if !holds {
                            tracing::debug!(agent = %self.name, attempts, "retry bound exhausted");
                        }
                        let outcome = RetryOutcome {
                            status: if holds {
                                RetryStatus::Converged
                            } else {
                                RetryStatus::Exhausted
                            },
                            value: produced.output,
                            attempts,
                        };
                        return Ok(Step {
                            position: json!([pred_position, body_position]),
                            output: outcome.to_value(),
                        });
                    }
                    attempt_input = policy.refine(&attempt_input, &produced.output);
                }
            }

            Body::Observe(inner) => {
                let observed = inner.step(position, input, stages)?;
                tracing::debug!(
                    agent = %inner.name,
                    from = %position,
                    to = %observed.position,
                    "observed transition"
                );
                Ok(Step {
                    output: json!({
                        "output": observed.output,
                        "observation": {
                            "agent": inner.name,
                            "input": input,
                            "from": position,
                            "to": observed.position,
                        },
                    }),
                    position: observed.position,
                })
            }
        }
    }
}

/// Whether a `fix` converged or ran out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    Converged,
    Exhausted,
}

impl RetryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Output of a `fix` agent. Exhaustion is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub status: RetryStatus,
    /// The last value produced by the retried agent.
    pub value: Value,
    /// Invocations of the retried agent.
    pub attempts: usize,
}

impl RetryOutcome {
    pub fn to_value(&self) -> Value {
        json!({
            "status": self.status.as_str(),
            "value": self.value,
            "attempts": self.attempts,
        })
    }

    /// Parse the output of a `fix` agent.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Output type of every `fix` agent retrying something of type `value`.
    pub fn value_type(value: ValueType) -> ValueType {
        ValueType::record([
            ("status", ValueType::Text),
            ("value", value),
            ("attempts", ValueType::Number),
        ])
    }
}

fn as_verdict(pred: &Agent, output: &Value) -> Result<bool, ContractError> {
    output.as_bool().ok_or_else(|| ContractError::IllTypedOutput {
        agent: pred.name.clone(),
        output: output.clone(),
        expected: ValueType::Bool,
    })
}

fn split<const N: usize>(position: &Value) -> Option<[&Value; N]> {
    let items = position.as_array()?;
    items.iter().collect::<Vec<_>>().try_into().ok()
}

fn child_directions<const N: usize>(child: &Agent, position: &Value, index: usize) -> Directions {
    match split::<N>(position) {
        Some(parts) => child.directions(parts[index]),
        None => Directions::none(),
    }
}

fn product(factors: &[Vec<Value>]) -> Vec<Value> {
    let mut rows: Vec<Vec<Value>> = vec![Vec::new()];
    for factor in factors {
        rows = rows
            .into_iter()
            .flat_map(|row| {
                factor.iter().map(move |v| {
                    let mut next = row.clone();
                    next.push(v.clone());
                    next
                })
            })
            .collect();
    }
    rows.into_iter().map(Value::Array).collect()
}

/// Builder for primitive agents.
pub struct AgentBuilder {
    name: String,
    signature: Signature,
    positions: Vec<Value>,
    initial: Option<Value>,
    directions: Option<Arc<DirectionsFn>>,
    transition: Option<Arc<TransitionFn>>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: Signature::untyped(),
            positions: Vec::new(),
            initial: None,
            directions: None,
            transition: None,
        }
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn positions<I>(mut self, positions: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.positions = positions.into_iter().collect();
        self
    }

    /// Defaults to the first position.
    pub fn initial(mut self, position: Value) -> Self {
        self.initial = Some(position);
        self
    }

    /// Defaults to every value of the input type, at every position.
    pub fn directions<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Directions + Send + Sync + 'static,
    {
        self.directions = Some(Arc::new(f));
        self
    }

    pub fn transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> (Value, Value) + Send + Sync + 'static,
    {
        self.transition = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let Some(first) = self.positions.first().cloned() else {
            return Err(AgentError::NoPositions { agent: self.name });
        };
        for (i, position) in self.positions.iter().enumerate() {
            if self.positions[..i].contains(position) {
                return Err(AgentError::DuplicatePosition {
                    agent: self.name,
                    position: position.clone(),
                });
            }
        }
        let initial = self.initial.unwrap_or(first);
        if !self.positions.contains(&initial) {
            return Err(AgentError::InitialNotAPosition {
                agent: self.name,
                position: initial,
            });
        }
        let Some(transition) = self.transition else {
            return Err(AgentError::Incomplete {
                agent: self.name,
                part: "transition",
            });
        };
        let directions: Arc<DirectionsFn> = match self.directions {
            Some(directions) => directions,
            None => {
                let input = self.signature.input.clone();
                Arc::new(move |_: &Value| Directions::Typed(input.clone()))
            }
        };
        Ok(Agent::primitive(
            self.name,
            self.signature,
            self.positions,
            initial,
            directions,
            transition,
        ))
    }
}

/// Construct a primitive agent.
pub fn make_agent<D, T>(
    name: impl Into<String>,
    signature: Signature,
    positions: Vec<Value>,
    directions: D,
    transition: T,
) -> Result<Agent, AgentError>
where
    D: Fn(&Value) -> Directions + Send + Sync + 'static,
    T: Fn(&Value, &Value) -> (Value, Value) + Send + Sync + 'static,
{
    AgentBuilder::new(name)
        .signature(signature)
        .positions(positions)
        .directions(directions)
        .transition(transition)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-mode toggle: `"flip"` switches mode, `"read"` reports it.
    fn toggle() -> Agent {
        make_agent(
            "toggle",
            Signature::new(ValueType::Text, ValueType::Text),
            vec![json!("off"), json!("on")],
            |_| Directions::Finite(vec![json!("flip"), json!("read")]),
            |position, input| {
                let next = match (position.as_str(), input.as_str()) {
                    (Some("off"), Some("flip")) => json!("on"),
                    (Some("on"), Some("flip")) => json!("off"),
                    _ => position.clone(),
                };
                (next.clone(), next)
            },
        )
        .unwrap()
    }

    #[test]
    fn invoke_follows_transition() {
        let agent = toggle();
        let step = agent.invoke(&json!("off"), &json!("flip")).unwrap();
        assert_eq!(step.position, json!("on"));
        assert_eq!(step.output, json!("on"));
    }

    #[test]
    fn run_folds_left_to_right() {
        let agent = toggle();
        let run = agent
            .run_from_start(&[json!("flip"), json!("read"), json!("flip")])
            .unwrap();
        assert_eq!(run.final_position, json!("off"));
        assert_eq!(run.outputs, vec![json!("on"), json!("on"), json!("off")]);
    }

    #[test]
    fn illegal_input_is_a_contract_error() {
        let agent = toggle();
        let err = agent.invoke(&json!("off"), &json!("explode")).unwrap_err();
        assert!(matches!(err, ContractError::IllegalInput { .. }));
        assert_eq!(err.agent(), "toggle");

        let err = agent.invoke(&json!("dimmed"), &json!("flip")).unwrap_err();
        assert!(matches!(err, ContractError::UnknownPosition { .. }));
    }

    #[test]
    fn lying_transition_is_caught() {
        let escapes = make_agent(
            "escapes",
            Signature::untyped(),
            vec![json!(0)],
            |_| Directions::Typed(ValueType::Any),
            |_, x| (json!(99), x.clone()),
        )
        .unwrap();
        let err = escapes.invoke(&json!(0), &json!(1)).unwrap_err();
        assert!(matches!(err, ContractError::IllegalTransition { .. }));

        let mistyped = Agent::stateless(
            "mistyped",
            Signature::new(ValueType::Any, ValueType::Number),
            |_| json!("not a number"),
        );
        let err = mistyped.invoke(&Value::Null, &json!(1)).unwrap_err();
        assert!(matches!(err, ContractError::IllTypedOutput { .. }));
    }

    #[test]
    fn builder_validates_positions() {
        let err = Agent::builder("empty")
            .transition(|p, x| (p.clone(), x.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::NoPositions { .. }));

        let err = Agent::builder("dup")
            .positions([json!(1), json!(1)])
            .transition(|p, x| (p.clone(), x.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicatePosition { .. }));

        let err = Agent::builder("far")
            .positions([json!(1)])
            .initial(json!(2))
            .transition(|p, x| (p.clone(), x.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::InitialNotAPosition { .. }));

        let err = Agent::builder("inert")
            .positions([json!(1)])
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Incomplete { .. }));
    }

    #[test]
    fn starting_at_rejects_unknown_positions() {
        let agent = toggle();
        let moved = agent.starting_at(json!("on")).unwrap();
        assert_eq!(moved.initial(), &json!("on"));
        assert!(agent.starting_at(json!("sideways")).is_err());
    }

    #[test]
    fn directions_intersect() {
        let finite = Directions::Finite(vec![json!(1), json!("a"), json!(2)]);
        let numbers = Directions::Typed(ValueType::Number);
        assert_eq!(
            finite.clone().intersect(numbers.clone()),
            Directions::Finite(vec![json!(1), json!(2)])
        );
        assert_eq!(
            numbers.clone().intersect(finite),
            Directions::Finite(vec![json!(1), json!(2)])
        );
        assert_eq!(
            numbers.intersect(Directions::Typed(ValueType::Any)),
            Directions::Typed(ValueType::Number)
        );
        assert_eq!(
            Directions::Typed(ValueType::Text).intersect(Directions::Typed(ValueType::Bool)),
            Directions::none()
        );
    }

    #[test]
    fn builtin_primitives_behave() {
        let swap = Agent::swap();
        assert_eq!(
            swap.invoke(&Value::Null, &json!([1, "x"])).unwrap().output,
            json!(["x", 1])
        );

        let project = Agent::project("output");
        assert_eq!(
            project
                .invoke(&Value::Null, &json!({"output": 7, "other": 1}))
                .unwrap()
                .output,
            json!(7)
        );

        let constant = Agent::constant(json!(true));
        assert_eq!(constant.output_type(), &ValueType::Bool);
        assert_eq!(
            constant.invoke(&Value::Null, &json!("ignored")).unwrap().output,
            json!(true)
        );

        let id = Agent::identity(ValueType::Number);
        assert!(id.invoke(&Value::Null, &json!("text")).is_err());
        assert_eq!(id.frontier(&Value::Null), Vec::<Value>::new());
    }

    #[test]
    fn retry_outcome_round_trips_through_value() {
        let outcome = RetryOutcome {
            status: RetryStatus::Exhausted,
            value: json!(3),
            attempts: 4,
        };
        let value = outcome.to_value();
        assert_eq!(value["status"], "exhausted");
        assert_eq!(RetryOutcome::from_value(&value), Some(outcome));
        assert!(RetryOutcome::value_type(ValueType::Number).admits(&value));
    }
}
