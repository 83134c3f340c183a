//! Exploring the space of composite agents an algebra can build.
//!
//! `enumerate` is exhaustive up to a composition depth; `sample` draws one
//! agent pseudo-randomly from a seed. Both skip ill-typed combinations
//! silently and are deterministic for the same arguments.

use crate::agent::Agent;
use crate::algebra::Algebra;
use crate::config::ComposeConfig;
use crate::error::AlgebraError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Tries per growth step before `sample` stops growing.
const SAMPLE_TRIES: usize = 16;

/// Every agent reachable from `primitives` with at most `depth` nested
/// operation applications, capped at the default `max_enumerated`.
pub fn enumerate(algebra: &Algebra, primitives: &[Agent], depth: usize) -> Vec<Agent> {
    enumerate_with(algebra, primitives, depth, &ComposeConfig::default())
}

/// `enumerate` with an explicit cap.
///
/// Order: primitives first, then each round's new agents in operation
/// order, argument tuples in lexicographic order. Agents are deduplicated
/// by structural name; the first occurrence wins.
pub fn enumerate_with(
    algebra: &Algebra,
    primitives: &[Agent],
    depth: usize,
    config: &ComposeConfig,
) -> Vec<Agent> {
    let cap = config.max_enumerated;
    let mut seen = BTreeSet::new();
    let mut pool: Vec<Agent> = Vec::new();
    for agent in primitives {
        if pool.len() >= cap {
            break;
        }
        if seen.insert(agent.name().to_string()) {
            pool.push(agent.clone());
        }
    }

    let mut fresh_from = 0;
    let mut skipped = 0usize;
    'rounds: for round in 1..=depth {
        let known = pool.len();
        if known >= cap {
            break;
        }
        let mut found = Vec::new();
        for operation in algebra.operations() {
            for tuple in Tuples::new(known, operation.arity()) {
                // Only tuples touching last round's agents can be new.
                let touches_fresh = tuple.iter().any(|&i| i >= fresh_from);
                if !(touches_fresh || (tuple.is_empty() && round == 1)) {
                    continue;
                }
                let args: Vec<Agent> = tuple.iter().map(|&i| pool[i].clone()).collect();
                match operation.apply(&args) {
                    Ok(agent) => {
                        if seen.insert(agent.name().to_string()) {
                            found.push(agent);
                            if known + found.len() >= cap {
                                pool.extend(found);
                                break 'rounds;
                            }
                        }
                    }
                    Err(_) => skipped += 1,
                }
            }
        }
        if found.is_empty() {
            break;
        }
        fresh_from = known;
        pool.extend(found);
    }

    tracing::debug!(
        algebra = algebra.name(),
        depth,
        agents = pool.len(),
        skipped,
        "enumerated agents"
    );
    pool
}

/// A pseudo-random agent built with up to `bound` operation applications.
///
/// Each step applies a random operation whose arguments are drawn from the
/// primitives and the agents built so far, with the current agent in one
/// slot. Steps that keep producing ill-typed combinations are skipped.
pub fn sample(
    algebra: &Algebra,
    primitives: &[Agent],
    seed: u64,
    bound: usize,
) -> Result<Agent, AlgebraError> {
    if primitives.is_empty() {
        return Err(AlgebraError::EmptyPrimitives);
    }
    let operations = algebra.operations();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pool: Vec<Agent> = primitives.to_vec();
    let mut current = pool[rng.gen_range(0..pool.len())].clone();
    if operations.is_empty() {
        return Ok(current);
    }

    for _ in 0..bound {
        for _ in 0..SAMPLE_TRIES {
            let operation = &operations[rng.gen_range(0..operations.len())];
            let arity = operation.arity();
            let mut args: Vec<Agent> = (0..arity)
                .map(|_| pool[rng.gen_range(0..pool.len())].clone())
                .collect();
            if arity > 0 {
                args[rng.gen_range(0..arity)] = current.clone();
            }
            if let Ok(agent) = operation.apply(&args) {
                current = agent;
                pool.push(current.clone());
                break;
            }
        }
    }

    tracing::debug!(algebra = algebra.name(), seed, bound, agent = current.name(), "sampled agent");
    Ok(current)
}

/// Every `arity`-tuple of indices below `len`, lexicographically.
struct Tuples {
    len: usize,
    next: Option<Vec<usize>>,
}

impl Tuples {
    fn new(len: usize, arity: usize) -> Self {
        let next = (len > 0 || arity == 0).then(|| vec![0; arity]);
        Self { len, next }
    }
}

impl Iterator for Tuples {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        let mut slot = following.len();
        while slot > 0 {
            slot -= 1;
            following[slot] += 1;
            if following[slot] < self.len {
                self.next = Some(following);
                return Some(current);
            }
            following[slot] = 0;
        }
        Some(current)
    }
}
