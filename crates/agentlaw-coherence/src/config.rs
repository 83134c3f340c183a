use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LOSSY_DISTANCE: f64 = 0.5;

/// Checker settings, the `[coherence]` table of an engine config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoherenceConfig {
    /// A lossy rendering not entailed by a complete one is still accepted
    /// when their semantic distance is at most this.
    pub max_lossy_distance: f64,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            max_lossy_distance: DEFAULT_MAX_LOSSY_DISTANCE,
        }
    }
}
