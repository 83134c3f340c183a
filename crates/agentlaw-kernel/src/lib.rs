//! # agentlaw kernel
//!
//! Typed agents and the algebra that combines them. An agent is a finite
//! set of positions, the legal inputs at each position, and a deterministic
//! transition. Combining agents is only allowed through an `Algebra`, whose
//! laws say which differently built agents must behave the same.
//!
//! This crate does not check laws; `agentlaw-verify` does. It only builds
//! agents and states the equations.
//!
//! ## Architecture
//!
//! ```text
//! ValueType           ← Runtime types of JSON values
//!     │
//! Agent               ← Positions, directions, transition
//!     │
//! compose             ← seq / par / branch / fix / observe
//!     │
//! Algebra + Law       ← Named operation catalogue and equations
//!     │
//! explore             ← enumerate / sample over an algebra
//! ```

pub mod agent;
pub mod algebra;
pub mod compose;
pub mod config;
pub mod error;
pub mod explore;
pub mod value_type;
pub mod witness;

pub use agent::{
    Agent, AgentBuilder, Directions, RetryOutcome, RetryStatus, Run, Signature, Stage, Step,
    StepTrace, Trace, make_agent,
};
pub use algebra::{
    Algebra, Builtin, Comparison, Expr, Law, Operation, OperationInfo, make_algebra,
    make_operation,
};
pub use compose::{RetryPolicy, branch, fix, observe, parallel, sequence};
pub use config::ComposeConfig;
pub use error::{AgentError, AlgebraError, ContractError};
pub use explore::{enumerate, enumerate_with, sample};
pub use value_type::ValueType;
pub use witness::compute_witness_id;
