//! What a law is checked against.

use agentlaw_kernel::Agent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One test: optional start positions per law variable and the inputs run
/// from there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestInput {
    /// Entry `i` overrides the initial position of agent `i`. Missing or
    /// `None` entries keep the agent's own initial position.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<Option<Value>>,
    pub inputs: Vec<Value>,
}

impl TestInput {
    pub fn single(input: Value) -> Self {
        Self::sequence([input])
    }

    pub fn sequence<I>(inputs: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            positions: Vec::new(),
            inputs: inputs.into_iter().collect(),
        }
    }

    /// Start agent `variable` at `position`.
    pub fn at(mut self, variable: usize, position: Value) -> Self {
        if self.positions.len() <= variable {
            self.positions.resize(variable + 1, None);
        }
        self.positions[variable] = Some(position);
        self
    }
}

/// A law to check, the agents bound to its variables, and the inputs.
#[derive(Debug, Clone)]
pub struct LawCase {
    pub law: String,
    pub agents: Vec<Agent>,
    pub inputs: Vec<TestInput>,
}

impl LawCase {
    pub fn new<A, I>(law: impl Into<String>, agents: A, inputs: I) -> Self
    where
        A: IntoIterator<Item = Agent>,
        I: IntoIterator<Item = TestInput>,
    {
        Self {
            law: law.into(),
            agents: agents.into_iter().collect(),
            inputs: inputs.into_iter().collect(),
        }
    }
}
