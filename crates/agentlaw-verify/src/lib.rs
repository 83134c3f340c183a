//! # agentlaw verify
//!
//! Runtime law verification for agent algebras. Given a law, agents for its
//! variables, and test inputs, both sides of the equation are built and run;
//! the law holds for those inputs when every observation matches.
//!
//! A violation is returned as data: a `Diagnostic` naming the law, the input,
//! both sides' observations and the first point of divergence, under a
//! deterministic witness id.

pub mod case;
pub mod config;
pub mod diagnostic;
pub mod verifier;

pub use case::{LawCase, TestInput};
pub use config::VerifyConfig;
pub use diagnostic::{Diagnostic, Divergence, Observable, Observation};
pub use verifier::{VerificationReport, VerificationResult, Verifier, verify};
