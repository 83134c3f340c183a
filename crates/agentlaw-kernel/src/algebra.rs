//! Algebras: named operation catalogues plus the laws they must satisfy.
//!
//! The base catalogue is a closed enum (`Builtin`). Domain algebras grow by
//! `Algebra::extend`, which returns a new value containing everything the
//! parent had plus the additions. Existing operations cannot be redefined,
//! so every law of the parent keeps meaning what it meant.
//!
//! Laws are equations between two expressions over law variables `a, b, c, …`.
//! The verifier instantiates both sides with concrete agents and runs them.

use crate::agent::Agent;
use crate::compose::{self, RetryPolicy};
use crate::config::ComposeConfig;
use crate::error::AlgebraError;
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Base law names.
pub mod law_name {
    pub const SEQ_LEFT_IDENTITY: &str = "seq_left_identity";
    pub const SEQ_RIGHT_IDENTITY: &str = "seq_right_identity";
    pub const SEQ_ASSOCIATIVITY: &str = "seq_associativity";
    pub const PAR_SYMMETRY: &str = "par_symmetry";
    pub const BRANCH_TRUE: &str = "branch_true";
    pub const OBSERVE_TRANSPARENCY: &str = "observe_transparency";
}

/// The built-in operations.
#[derive(Debug, Clone)]
pub enum Builtin {
    Sequence,
    Parallel,
    Branch,
    Fix(RetryPolicy),
    Observe,
}

impl Builtin {
    /// Bumped whenever a variant is added or a builtin's semantics change.
    pub const CATALOGUE_VERSION: u32 = 1;

    pub fn catalogue(retry: RetryPolicy) -> Vec<Builtin> {
        vec![
            Self::Sequence,
            Self::Parallel,
            Self::Branch,
            Self::Fix(retry),
            Self::Observe,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequence => "seq",
            Self::Parallel => "par",
            Self::Branch => "branch",
            Self::Fix(_) => "fix",
            Self::Observe => "observe",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Sequence | Self::Parallel | Self::Fix(_) => 2,
            Self::Branch => 3,
            Self::Observe => 1,
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            Self::Sequence => "(X -> Y, Y -> Z) -> (X -> Z)",
            Self::Parallel => "(X -> Y, X -> Z) -> (X -> (Y, Z))",
            Self::Branch => "(X -> bool, X -> Y, X -> Y) -> (X -> Y)",
            Self::Fix(_) => "(Y -> bool, X -> Y) -> (X -> retry(Y))",
            Self::Observe => "(X -> Y) -> (X -> observed(Y))",
        }
    }

    fn compose(&self, args: &[Agent]) -> Result<Agent, AlgebraError> {
        match (self, args) {
            (Self::Sequence, [a, b]) => compose::sequence(a, b),
            (Self::Parallel, [a, b]) => compose::parallel(a, b),
            (Self::Branch, [p, a, b]) => compose::branch(p, a, b),
            (Self::Fix(policy), [p, a]) => compose::fix(p, a, policy.clone()),
            (Self::Observe, [a]) => Ok(compose::observe(a)),
            _ => Err(AlgebraError::ArityMismatch {
                operation: self.name().to_string(),
                expected: self.arity(),
                found: args.len(),
            }),
        }
    }
}

/// Composer of an extension operation.
pub type ComposerFn = dyn Fn(&[Agent]) -> Result<Agent, AlgebraError> + Send + Sync;

#[derive(Clone)]
enum Composer {
    Builtin(Builtin),
    Extension(Arc<ComposerFn>),
}

/// A named composition operation of fixed arity.
#[derive(Clone)]
pub struct Operation {
    name: String,
    arity: usize,
    signature: String,
    composer: Composer,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("signature", &self.signature)
            .field("builtin", &self.builtin().is_some())
            .finish()
    }
}

impl Operation {
    pub fn from_builtin(builtin: Builtin) -> Self {
        Self {
            name: builtin.name().to_string(),
            arity: builtin.arity(),
            signature: builtin.signature().to_string(),
            composer: Composer::Builtin(builtin),
        }
    }

    /// An extension operation. The composer always receives exactly `arity`
    /// agents.
    pub fn new<F>(
        name: impl Into<String>,
        arity: usize,
        signature: impl Into<String>,
        composer: F,
    ) -> Self
    where
        F: Fn(&[Agent]) -> Result<Agent, AlgebraError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            signature: signature.into(),
            composer: Composer::Extension(Arc::new(composer)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn builtin(&self) -> Option<&Builtin> {
        match &self.composer {
            Composer::Builtin(builtin) => Some(builtin),
            Composer::Extension(_) => None,
        }
    }

    pub fn apply(&self, args: &[Agent]) -> Result<Agent, AlgebraError> {
        if args.len() != self.arity {
            return Err(AlgebraError::ArityMismatch {
                operation: self.name.clone(),
                expected: self.arity,
                found: args.len(),
            });
        }
        match &self.composer {
            Composer::Builtin(builtin) => builtin.compose(args),
            Composer::Extension(composer) => composer(args),
        }
    }
}

/// Construct an extension operation.
pub fn make_operation<F>(
    name: impl Into<String>,
    arity: usize,
    signature: impl Into<String>,
    composer: F,
) -> Operation
where
    F: Fn(&[Agent]) -> Result<Agent, AlgebraError> + Send + Sync + 'static,
{
    Operation::new(name, arity, signature, composer)
}

/// A composition expression over law variables.
#[derive(Debug, Clone)]
pub enum Expr {
    /// The `i`-th agent supplied at verification time.
    Var(usize),
    /// A fixed agent, e.g. an identity or a projection.
    Agent(Agent),
    Apply { operation: String, args: Vec<Expr> },
}

impl Expr {
    pub fn var(index: usize) -> Self {
        Self::Var(index)
    }

    pub fn agent(agent: Agent) -> Self {
        Self::Agent(agent)
    }

    /// The untyped identity, usable on either side of any agent.
    pub fn identity() -> Self {
        Self::Agent(Agent::identity(ValueType::Any))
    }

    pub fn apply<I>(operation: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Self::Apply {
            operation: operation.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Number of variables referenced: highest index plus one.
    pub fn variables(&self) -> usize {
        match self {
            Self::Var(i) => i + 1,
            Self::Agent(_) => 0,
            Self::Apply { args, .. } => args.iter().map(Self::variables).max().unwrap_or(0),
        }
    }

    fn applications<'a>(&'a self, out: &mut Vec<(&'a str, usize)>) {
        if let Self::Apply { operation, args } = self {
            out.push((operation, args.len()));
            for arg in args {
                arg.applications(out);
            }
        }
    }

    /// Build the agent this expression denotes.
    pub fn instantiate(&self, algebra: &Algebra, agents: &[Agent]) -> Result<Agent, AlgebraError> {
        match self {
            Self::Var(i) => agents.get(*i).cloned().ok_or(AlgebraError::ArityMismatch {
                operation: format!("{self}"),
                expected: i + 1,
                found: agents.len(),
            }),
            Self::Agent(agent) => Ok(agent.clone()),
            Self::Apply { operation, args } => {
                let built = args
                    .iter()
                    .map(|arg| arg.instantiate(algebra, agents))
                    .collect::<Result<Vec<_>, _>>()?;
                algebra.compose(operation, &built)
            }
        }
    }
}

/// `a`, `b`, … `z`, then `x26`, `x27`, …
fn variable_name(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'a' + i).to_string(),
        _ => format!("x{index}"),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(i) => write!(f, "{}", variable_name(*i)),
            Self::Agent(agent) => write!(f, "{}", agent.name()),
            Self::Apply { operation, args } => {
                write!(f, "{operation}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// What a law compares between its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Output sequences only.
    Outputs,
    /// Output sequences and the primitive positions after every step.
    OutputsAndFrontier,
}

/// An equation between two composition expressions.
#[derive(Debug, Clone)]
pub struct Law {
    name: String,
    equation: String,
    variables: usize,
    lhs: Expr,
    rhs: Expr,
    comparison: Comparison,
}

impl Law {
    pub fn new(name: impl Into<String>, lhs: Expr, rhs: Expr, comparison: Comparison) -> Self {
        Self {
            name: name.into(),
            equation: format!("{lhs} = {rhs}"),
            variables: lhs.variables().max(rhs.variables()),
            lhs,
            rhs,
            comparison,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn equation(&self) -> &str {
        &self.equation
    }

    /// How many agents `sides` expects.
    pub fn variables(&self) -> usize {
        self.variables
    }

    pub fn lhs(&self) -> &Expr {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expr {
        &self.rhs
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Instantiate both sides.
    pub fn sides(&self, algebra: &Algebra, agents: &[Agent]) -> Result<(Agent, Agent), AlgebraError> {
        if agents.len() != self.variables {
            return Err(AlgebraError::ArityMismatch {
                operation: format!("law {}", self.name),
                expected: self.variables,
                found: agents.len(),
            });
        }
        Ok((
            self.lhs.instantiate(algebra, agents)?,
            self.rhs.instantiate(algebra, agents)?,
        ))
    }
}

fn base_laws() -> Vec<Law> {
    use law_name::*;
    let (a, b, c) = (Expr::var(0), Expr::var(1), Expr::var(2));
    vec![
        Law::new(
            SEQ_LEFT_IDENTITY,
            Expr::apply("seq", [Expr::identity(), a.clone()]),
            a.clone(),
            Comparison::OutputsAndFrontier,
        ),
        Law::new(
            SEQ_RIGHT_IDENTITY,
            Expr::apply("seq", [a.clone(), Expr::identity()]),
            a.clone(),
            Comparison::OutputsAndFrontier,
        ),
        Law::new(
            SEQ_ASSOCIATIVITY,
            Expr::apply("seq", [Expr::apply("seq", [a.clone(), b.clone()]), c.clone()]),
            Expr::apply("seq", [a.clone(), Expr::apply("seq", [b.clone(), c])]),
            Comparison::OutputsAndFrontier,
        ),
        Law::new(
            PAR_SYMMETRY,
            Expr::apply(
                "seq",
                [
                    Expr::apply("par", [a.clone(), b.clone()]),
                    Expr::agent(Agent::swap()),
                ],
            ),
            Expr::apply("par", [b.clone(), a.clone()]),
            Comparison::Outputs,
        ),
        Law::new(
            BRANCH_TRUE,
            Expr::apply(
                "branch",
                [Expr::agent(Agent::constant(json!(true))), a.clone(), b],
            ),
            a.clone(),
            Comparison::Outputs,
        ),
        Law::new(
            OBSERVE_TRANSPARENCY,
            Expr::apply(
                "seq",
                [
                    Expr::apply("observe", [a.clone()]),
                    Expr::agent(Agent::project("output")),
                ],
            ),
            a,
            Comparison::Outputs,
        ),
    ]
}

/// Introspection record for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    pub name: String,
    pub arity: usize,
    pub signature: String,
    pub builtin: bool,
}

/// A named, immutable set of operations plus laws.
#[derive(Debug, Clone)]
pub struct Algebra {
    name: String,
    parent: Option<String>,
    operations: Vec<Operation>,
    laws: Vec<Law>,
}

impl Algebra {
    /// Validate and assemble an algebra.
    pub fn new(
        name: impl Into<String>,
        operations: Vec<Operation>,
        laws: Vec<Law>,
    ) -> Result<Self, AlgebraError> {
        let empty = Self {
            name: name.into(),
            parent: None,
            operations: Vec::new(),
            laws: Vec::new(),
        };
        empty.with_additions(operations, laws)
    }

    /// Base catalogue: `seq`, `par`, `branch`, `fix`, `observe`, and the
    /// base laws. `fix` repeats its input with the default bound.
    pub fn base() -> Self {
        Self::base_from(RetryPolicy::default())
    }

    /// Base catalogue with `fix` bounded by `config.default_retry_bound`.
    pub fn base_with(config: &ComposeConfig) -> Result<Self, AlgebraError> {
        Ok(Self::base_from(RetryPolicy::repeat(
            config.default_retry_bound,
        )?))
    }

    fn base_from(retry: RetryPolicy) -> Self {
        Self {
            name: "base".to_string(),
            parent: None,
            operations: Builtin::catalogue(retry)
                .into_iter()
                .map(Operation::from_builtin)
                .collect(),
            laws: base_laws(),
        }
    }

    /// A new algebra with `operations` and `laws` added to this one's.
    ///
    /// `self` is untouched. Fails if any name is already taken or a new law
    /// refers to an operation the result does not have.
    pub fn extend(
        &self,
        name: impl Into<String>,
        operations: Vec<Operation>,
        laws: Vec<Law>,
    ) -> Result<Self, AlgebraError> {
        let child = Self {
            name: name.into(),
            parent: Some(self.name.clone()),
            operations: self.operations.clone(),
            laws: self.laws.clone(),
        };
        let extended = child.with_additions(operations, laws)?;
        tracing::debug!(
            algebra = %extended.name,
            parent = %self.name,
            operations = extended.operations.len(),
            laws = extended.laws.len(),
            "extended algebra"
        );
        Ok(extended)
    }

    fn with_additions(
        mut self,
        operations: Vec<Operation>,
        laws: Vec<Law>,
    ) -> Result<Self, AlgebraError> {
        for operation in operations {
            if self.operation(operation.name()).is_some() {
                return Err(AlgebraError::DuplicateOperation {
                    algebra: self.name,
                    operation: operation.name,
                });
            }
            self.operations.push(operation);
        }
        for law in laws {
            if self.law(law.name()).is_some() {
                return Err(AlgebraError::DuplicateLaw {
                    algebra: self.name,
                    law: law.name,
                });
            }
            self.validate_law(&law)?;
            self.laws.push(law);
        }
        Ok(self)
    }

    fn validate_law(&self, law: &Law) -> Result<(), AlgebraError> {
        let mut applications = Vec::new();
        law.lhs.applications(&mut applications);
        law.rhs.applications(&mut applications);
        for (name, argc) in applications {
            let Some(operation) = self.operation(name) else {
                return Err(AlgebraError::InvalidLaw {
                    law: law.name.clone(),
                    reason: format!("operation {name} is not in algebra {}", self.name),
                });
            };
            if operation.arity() != argc {
                return Err(AlgebraError::InvalidLaw {
                    law: law.name.clone(),
                    reason: format!(
                        "operation {name} takes {} agents, law applies it to {argc}",
                        operation.arity()
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The algebra this one extends, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn laws(&self) -> &[Law] {
        &self.laws
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name() == name)
    }

    pub fn law(&self, name: &str) -> Option<&Law> {
        self.laws.iter().find(|law| law.name() == name)
    }

    /// Apply the named operation.
    pub fn compose(&self, operation: &str, args: &[Agent]) -> Result<Agent, AlgebraError> {
        self.operation(operation)
            .ok_or_else(|| AlgebraError::UnknownOperation {
                algebra: self.name.clone(),
                operation: operation.to_string(),
            })?
            .apply(args)
    }

    pub fn catalogue(&self) -> Vec<OperationInfo> {
        self.operations
            .iter()
            .map(|op| OperationInfo {
                name: op.name.clone(),
                arity: op.arity,
                signature: op.signature.clone(),
                builtin: op.builtin().is_some(),
            })
            .collect()
    }
}

/// Construct a standalone algebra.
pub fn make_algebra(
    name: impl Into<String>,
    operations: Vec<Operation>,
    laws: Vec<Law>,
) -> Result<Algebra, AlgebraError> {
    Algebra::new(name, operations, laws)
}
