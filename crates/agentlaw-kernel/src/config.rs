//! Composition-time configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RETRY_BOUND: usize = 8;
pub const DEFAULT_MAX_ENUMERATED: usize = 4096;

/// Knobs for building and exploring agents. Every field has a default, so
/// an empty `[compose]` table (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeConfig {
    /// Attempt bound of the `fix` operation in `Algebra::base_with`.
    pub default_retry_bound: usize,
    /// Upper bound on the agents `enumerate` returns.
    pub max_enumerated: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            default_retry_bound: DEFAULT_RETRY_BOUND,
            max_enumerated: DEFAULT_MAX_ENUMERATED,
        }
    }
}
