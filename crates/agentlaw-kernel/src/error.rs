//! Error types for kernel operations.
//!
//! Three families, matching when they can occur:
//! - `AgentError`: an agent definition is malformed (construction time)
//! - `ContractError`: an agent was driven outside its declared contract (invocation time)
//! - `AlgebraError`: operands or algebra definitions do not line up (composition time)
//!
//! Law violations are not errors; they are returned as data by the verifier.

use crate::value_type::ValueType;
use serde_json::Value;

/// A malformed agent definition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("agent {agent}: position set is empty")]
    NoPositions { agent: String },

    #[error("agent {agent}: duplicate position {position}")]
    DuplicatePosition { agent: String, position: Value },

    #[error("agent {agent}: initial position {position} is not a declared position")]
    InitialNotAPosition { agent: String, position: Value },

    #[error("agent {agent}: missing {part}")]
    Incomplete { agent: String, part: &'static str },
}

/// An agent was invoked outside its contract.
///
/// This signals a caller bug (or an agent whose transition lies about its
/// own signature), never a law violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    /// The position is not in the agent's position set.
    #[error("agent {agent}: {position} is not a position")]
    UnknownPosition { agent: String, position: Value },

    /// The input is not in `directions(position)`.
    #[error("agent {agent}: input {input} is not a legal direction at {position}")]
    IllegalInput {
        agent: String,
        position: Value,
        input: Value,
    },

    /// The transition produced a position outside the position set.
    #[error("agent {agent}: transition from {position} produced unknown position {produced}")]
    IllegalTransition {
        agent: String,
        position: Value,
        produced: Value,
    },

    /// The transition produced an output outside the declared output type.
    #[error("agent {agent}: output {output} is not a {expected}")]
    IllTypedOutput {
        agent: String,
        output: Value,
        expected: ValueType,
    },
}

impl ContractError {
    /// Name of the agent whose contract was broken.
    pub fn agent(&self) -> &str {
        match self {
            Self::UnknownPosition { agent, .. }
            | Self::IllegalInput { agent, .. }
            | Self::IllegalTransition { agent, .. }
            | Self::IllTypedOutput { agent, .. } => agent,
        }
    }
}

/// Composition-time failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlgebraError {
    /// Operand types do not line up. Raised before any execution.
    #[error("type mismatch in {operation}: {detail} (expected {expected}, found {found})")]
    TypeMismatch {
        operation: String,
        detail: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("operation {operation} takes {expected} agents, got {found}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        found: usize,
    },

    #[error("algebra {algebra} has no operation {operation}")]
    UnknownOperation { algebra: String, operation: String },

    /// Extension may add operations, never redefine them.
    #[error("algebra {algebra} already defines operation {operation}")]
    DuplicateOperation { algebra: String, operation: String },

    #[error("algebra {algebra} already declares law {law}")]
    DuplicateLaw { algebra: String, law: String },

    #[error("law {law} is ill-formed: {reason}")]
    InvalidLaw { law: String, reason: String },

    #[error("retry bound must be at least 1")]
    InvalidBound,

    #[error("exploration needs at least one primitive agent")]
    EmptyPrimitives,

    #[error(transparent)]
    Contract(#[from] ContractError),
}
