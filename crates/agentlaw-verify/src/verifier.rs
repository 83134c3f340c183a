//! Behavioral law checking.
//!
//! Both sides of a law are instantiated with the caller's agents and run on
//! the same inputs. Nothing structural is compared: two agents satisfy a law
//! exactly when they are observed to behave the same.

use crate::case::{LawCase, TestInput};
use crate::config::VerifyConfig;
use crate::diagnostic::{Diagnostic, Divergence, Observation};
use agentlaw_kernel::witness::failure_class;
use agentlaw_kernel::{Agent, Algebra, AlgebraError, Comparison, Law, Trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of checking one law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VerificationResult {
    /// Every test input produced matching observations.
    Satisfied { law: String, cases: usize },
    Violated(Box<Diagnostic>),
    /// The law could not be exercised with what was supplied.
    Inapplicable { law: String, reason: String },
}

impl VerificationResult {
    pub fn law(&self) -> &str {
        match self {
            Self::Satisfied { law, .. } | Self::Inapplicable { law, .. } => law,
            Self::Violated(diagnostic) => &diagnostic.law,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Violated(diagnostic) => Some(diagnostic.as_ref()),
            _ => None,
        }
    }
}

/// Results of a suite of law checks against one algebra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub algebra: String,
    pub satisfied: usize,
    pub violated: usize,
    pub inapplicable: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    fn from_results(algebra: &str, results: Vec<VerificationResult>) -> Self {
        let (mut satisfied, mut violated, mut inapplicable) = (0, 0, 0);
        for result in &results {
            match result {
                VerificationResult::Satisfied { .. } => satisfied += 1,
                VerificationResult::Violated(_) => violated += 1,
                VerificationResult::Inapplicable { .. } => inapplicable += 1,
            }
        }
        Self {
            algebra: algebra.to_string(),
            satisfied,
            violated,
            inapplicable,
            results,
        }
    }

    /// No law was violated and none was inapplicable.
    pub fn is_clean(&self) -> bool {
        self.violated == 0 && self.inapplicable == 0
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.results.iter().filter_map(VerificationResult::diagnostic)
    }
}

/// Checks laws of an algebra. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifyConfig,
}

impl Verifier {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Check `law_name` of `algebra` with `agents` bound to its variables.
    ///
    /// Stops at the first test input whose observations differ.
    pub fn verify(
        &self,
        algebra: &Algebra,
        law_name: &str,
        agents: &[Agent],
        test_inputs: &[TestInput],
    ) -> VerificationResult {
        let inapplicable = |reason: String| {
            tracing::debug!(law = law_name, %reason, "law inapplicable");
            VerificationResult::Inapplicable {
                law: law_name.to_string(),
                reason,
            }
        };

        let Some(law) = algebra.law(law_name) else {
            return inapplicable(format!("algebra {} has no law {law_name}", algebra.name()));
        };
        if test_inputs.is_empty() {
            return inapplicable("no test inputs".to_string());
        }
        if agents.len() != law.variables() {
            return inapplicable(format!(
                "law binds {} agents, {} supplied",
                law.variables(),
                agents.len()
            ));
        }

        for input in test_inputs {
            match self.check_case(algebra, law, agents, input) {
                Ok(None) => {}
                Ok(Some(diagnostic)) => {
                    tracing::warn!(
                        law = law_name,
                        witness = %diagnostic.witness_id,
                        class = %diagnostic.class,
                        step = diagnostic.divergence.step,
                        "law violated"
                    );
                    return VerificationResult::Violated(Box::new(diagnostic));
                }
                Err(reason) => return inapplicable(reason),
            }
        }

        tracing::debug!(law = law_name, cases = test_inputs.len(), "law satisfied");
        VerificationResult::Satisfied {
            law: law_name.to_string(),
            cases: test_inputs.len(),
        }
    }

    /// `Err` carries the reason the case cannot be run.
    fn check_case(
        &self,
        algebra: &Algebra,
        law: &Law,
        agents: &[Agent],
        input: &TestInput,
    ) -> Result<Option<Diagnostic>, String> {
        if input.positions.len() > agents.len() {
            return Err(format!(
                "{} start positions for {} agents",
                input.positions.len(),
                agents.len()
            ));
        }
        let bound = bind(agents, &input.positions).map_err(|e| e.to_string())?;
        let (lhs, rhs) = law.sides(algebra, &bound).map_err(|e| e.to_string())?;

        let left = run(&lhs, input)?;
        let right = run(&rhs, input)?;
        let frontier = law.comparison() == Comparison::OutputsAndFrontier;
        if let Some(divergence) = Divergence::between(&left, &right, frontier, false) {
            return Ok(Some(Diagnostic::new(
                failure_class::LAW_VIOLATION,
                law.name(),
                law.equation(),
                input.clone(),
                Observation::of(lhs.name(), &left),
                Observation::of(rhs.name(), &right),
                divergence,
            )));
        }

        if self.config.replay {
            for (side, first) in [(&lhs, &left), (&rhs, &right)] {
                let again = run(side, input)?;
                if let Some(divergence) = Divergence::between(first, &again, true, true) {
                    return Ok(Some(Diagnostic::new(
                        failure_class::REPLAY_DIVERGENCE,
                        law.name(),
                        law.equation(),
                        input.clone(),
                        Observation::of(side.name(), first),
                        Observation::of(side.name(), &again),
                        divergence,
                    )));
                }
            }
        }
        Ok(None)
    }

    /// Check every case, in order.
    pub fn verify_suite(&self, algebra: &Algebra, cases: &[LawCase]) -> VerificationReport {
        let results = cases
            .iter()
            .map(|case| self.verify(algebra, &case.law, &case.agents, &case.inputs))
            .collect();
        let report = VerificationReport::from_results(algebra.name(), results);
        tracing::info!(
            algebra = algebra.name(),
            satisfied = report.satisfied,
            violated = report.violated,
            inapplicable = report.inapplicable,
            "verified law suite"
        );
        report
    }
}

/// `Verifier::default().verify(..)`.
pub fn verify(
    algebra: &Algebra,
    law_name: &str,
    agents: &[Agent],
    test_inputs: &[TestInput],
) -> VerificationResult {
    Verifier::default().verify(algebra, law_name, agents, test_inputs)
}

/// Agents moved to their per-variable start positions.
fn bind(agents: &[Agent], positions: &[Option<Value>]) -> Result<Vec<Agent>, AlgebraError> {
    agents
        .iter()
        .enumerate()
        .map(|(i, agent)| match positions.get(i) {
            Some(Some(position)) => Ok(agent.starting_at(position.clone())?),
            _ => Ok(agent.clone()),
        })
        .collect()
}

fn run(side: &Agent, input: &TestInput) -> Result<Trace, String> {
    side.trace(side.initial(), &input.inputs)
        .map_err(|e| format!("contract error: {e}"))
}
