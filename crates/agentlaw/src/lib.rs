//! # agentlaw
//!
//! Composition verification for agents. Agents are typed state machines
//! that compose under an algebra of operations; the algebra's laws are
//! checked at runtime against concrete inputs, and alternative renderings
//! of an artifact are checked for coherence.
//!
//! ```text
//! agentlaw-kernel     agents, composition, algebra, exploration, witness ids
//!     |
//!     +-- agentlaw-verify      laws run on test inputs -> diagnostics
//!     +-- agentlaw-coherence   views of one artifact -> conflicts
//!     |
//! agentlaw            EngineConfig (TOML) and Engine
//! ```
//!
//! ```ignore
//! use agentlaw::{Engine, EngineConfig, TestInput, law_name};
//!
//! let engine = Engine::new(EngineConfig::load("agentlaw.toml")?)?;
//! let result = engine.verify(
//!     law_name::SEQ_ASSOCIATIVITY,
//!     &[parse, validate, store],
//!     &[TestInput::sequence(samples)],
//! );
//! ```

pub mod config;
pub mod engine;

pub use agentlaw_coherence as coherence;
pub use agentlaw_kernel as kernel;
pub use agentlaw_verify as verify;

pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;

pub use agentlaw_coherence::{
    Checker, CoherenceConfig, CoherenceResult, Conflict, Renderings, SemanticDistance, Sheaf,
    SheafError, View, check, make_sheaf, make_view,
};
pub use agentlaw_kernel::algebra::law_name;
pub use agentlaw_kernel::{
    Agent, AgentError, Algebra, AlgebraError, Comparison, ComposeConfig, ContractError,
    Directions, Expr, Law, Operation, RetryOutcome, RetryPolicy, RetryStatus, Signature,
    ValueType, enumerate, make_agent, make_algebra, make_operation, sample,
};
pub use agentlaw_verify::{
    Diagnostic, LawCase, TestInput, VerificationReport, VerificationResult, Verifier,
    VerifyConfig,
};
