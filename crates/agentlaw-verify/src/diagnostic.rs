//! Law violation diagnostics.
//!
//! A `Diagnostic` carries everything needed to understand and reproduce a
//! violation without access to the agents: the law, the input, what each
//! side was observed to do, and where they first parted ways.

use crate::case::TestInput;
use agentlaw_kernel::witness::compute_witness_id;
use agentlaw_kernel::{StepTrace, Trace};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// What differed at the divergence point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observable {
    Output,
    Frontier,
    /// Same outputs and frontier, different primitive stages.
    Stages,
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Output => "output",
            Self::Frontier => "frontier",
            Self::Stages => "stages",
        })
    }
}

/// The earliest point two traces disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    /// Index into the input sequence.
    pub step: usize,
    pub observable: Observable,
    /// Index of the first differing primitive stage within the step, when
    /// both sides ran the same pipeline of agents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_agent: Option<String>,
    pub lhs: Value,
    pub rhs: Value,
}

impl Divergence {
    /// First divergence between `left` and `right`, comparing frontiers only
    /// when `frontier` is set and stages only when `stages` is set.
    pub fn between(left: &Trace, right: &Trace, frontier: bool, stages: bool) -> Option<Self> {
        for (step, (l, r)) in left.steps.iter().zip(&right.steps).enumerate() {
            if l.output != r.output {
                let (stage, stage_agent) = first_stage_difference(l, r).unzip();
                return Some(Self {
                    step,
                    observable: Observable::Output,
                    stage,
                    stage_agent,
                    lhs: l.output.clone(),
                    rhs: r.output.clone(),
                });
            }
            if frontier && l.frontier != r.frontier {
                return Some(Self {
                    step,
                    observable: Observable::Frontier,
                    stage: None,
                    stage_agent: None,
                    lhs: json!(l.frontier),
                    rhs: json!(r.frontier),
                });
            }
            if stages && l.stages != r.stages {
                let (stage, stage_agent) = first_stage_difference(l, r).unzip();
                return Some(Self {
                    step,
                    observable: Observable::Stages,
                    stage,
                    stage_agent,
                    lhs: json!(l.stages),
                    rhs: json!(r.stages),
                });
            }
        }
        None
    }
}

/// Stage index and agent where identical pipelines first produce different
/// outputs. `None` when the sides ran different agents.
fn first_stage_difference(l: &StepTrace, r: &StepTrace) -> Option<(usize, String)> {
    let same_pipeline = l.stages.len() == r.stages.len()
        && l.stages.iter().zip(&r.stages).all(|(a, b)| a.agent == b.agent);
    if !same_pipeline {
        return None;
    }
    l.stages
        .iter()
        .zip(&r.stages)
        .position(|(a, b)| a != b)
        .map(|i| (i, l.stages[i].agent.clone()))
}

/// What one side was observed to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub agent: String,
    pub outputs: Vec<Value>,
    pub final_frontier: Vec<Value>,
}

impl Observation {
    pub fn of(agent: &str, trace: &Trace) -> Self {
        Self {
            agent: agent.to_string(),
            outputs: trace.outputs(),
            final_frontier: trace.final_frontier.clone(),
        }
    }
}

/// A self-contained law violation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub witness_id: String,
    /// `law_violation` or `replay_divergence`.
    pub class: String,
    pub law: String,
    pub equation: String,
    pub input: TestInput,
    pub lhs: Observation,
    pub rhs: Observation,
    pub divergence: Divergence,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        class: &str,
        law: &str,
        equation: &str,
        input: TestInput,
        lhs: Observation,
        rhs: Observation,
        divergence: Divergence,
    ) -> Self {
        let subject = format!("{} = {}", lhs.agent, rhs.agent);
        let context = json!({
            "input": input,
            "step": divergence.step,
            "observable": divergence.observable,
        });
        let message = format!(
            "{law} violated at step {} ({}): {} gave {}, {} gave {}",
            divergence.step,
            divergence.observable,
            lhs.agent,
            divergence.lhs,
            rhs.agent,
            divergence.rhs,
        );
        Self {
            witness_id: compute_witness_id(class, law, Some(&subject), Some(&context)),
            class: class.to_string(),
            law: law.to_string(),
            equation: equation.to_string(),
            input,
            lhs,
            rhs,
            divergence,
            message,
        }
    }
}
