use crate::config::{ConfigError, EngineConfig};
use agentlaw_coherence::{Checker, CoherenceResult, Sheaf};
use agentlaw_kernel::{Agent, Algebra, AlgebraError, enumerate_with, sample};
use agentlaw_verify::{LawCase, TestInput, VerificationReport, VerificationResult, Verifier};
use serde_json::Value;
use std::path::Path;

/// A configured algebra, verifier and checker.
///
/// The algebra starts as the base algebra built with the `[compose]`
/// settings; `with_algebra` swaps in an extension.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    algebra: Algebra,
    verifier: Verifier,
    checker: Checker,
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            algebra: Algebra::base(),
            verifier: Verifier::new(config.verify.clone()),
            checker: Checker::new(config.coherence.clone()),
            config,
        }
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, AlgebraError> {
        let algebra = Algebra::base_with(&config.compose)?;
        Ok(Self {
            verifier: Verifier::new(config.verify.clone()),
            checker: Checker::new(config.coherence.clone()),
            algebra,
            config,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = EngineConfig::load(path)?;
        Ok(Self::new(config)?)
    }

    /// Same settings, different algebra.
    pub fn with_algebra(&self, algebra: Algebra) -> Self {
        Self {
            algebra,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn algebra(&self) -> &Algebra {
        &self.algebra
    }

    pub fn compose(&self, operation: &str, args: &[Agent]) -> Result<Agent, AlgebraError> {
        self.algebra.compose(operation, args)
    }

    pub fn verify(
        &self,
        law_name: &str,
        agents: &[Agent],
        test_inputs: &[TestInput],
    ) -> VerificationResult {
        self.verifier
            .verify(&self.algebra, law_name, agents, test_inputs)
    }

    pub fn verify_suite(&self, cases: &[LawCase]) -> VerificationReport {
        self.verifier.verify_suite(&self.algebra, cases)
    }

    pub fn check(&self, sheaf: &Sheaf, instance: &Value) -> CoherenceResult {
        self.checker.check(sheaf, instance)
    }

    /// Capped by `compose.max_enumerated`.
    pub fn enumerate(&self, primitives: &[Agent], depth: usize) -> Vec<Agent> {
        enumerate_with(&self.algebra, primitives, depth, &self.config.compose)
    }

    pub fn sample(
        &self,
        primitives: &[Agent],
        seed: u64,
        bound: usize,
    ) -> Result<Agent, AlgebraError> {
        sample(&self.algebra, primitives, seed, bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlaw_kernel::{Signature, ValueType};
    use serde_json::json;

    fn inc() -> Agent {
        Agent::stateless(
            "inc",
            Signature::new(ValueType::Number, ValueType::Number),
            |x| json!(x.as_i64().unwrap_or(0) + 1),
        )
    }

    #[test]
    fn enumeration_respects_configured_cap() {
        let config = EngineConfig::from_toml_str("[compose]\nmax_enumerated = 5\n").unwrap();
        let engine = Engine::new(config).unwrap();
        assert_eq!(engine.enumerate(&[inc()], 3).len(), 5);
    }

    #[test]
    fn with_algebra_keeps_settings() {
        let config = EngineConfig::from_toml_str("[verify]\nreplay = false\n").unwrap();
        let engine = Engine::new(config).unwrap();
        let extended = engine
            .algebra()
            .extend("base+none", Vec::new(), Vec::new())
            .unwrap();
        let swapped = engine.with_algebra(extended);
        assert_eq!(swapped.algebra().name(), "base+none");
        assert_eq!(swapped.algebra().parent(), Some(engine.algebra().name()));
        assert!(!swapped.config().verify.replay);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Engine::load("/nonexistent/engine.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
