use serde::{Deserialize, Serialize};

/// Verifier settings, the `[verify]` table of an engine config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Run both sides a second time and require identical traces.
    pub replay: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { replay: true }
    }
}
