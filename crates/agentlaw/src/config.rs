//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! [compose]
//! default_retry_bound = 8
//! max_enumerated = 4096
//!
//! [verify]
//! replay = true
//!
//! [coherence]
//! max_lossy_distance = 0.5
//! ```
//!
//! Every table and key is optional; unknown keys are rejected.

use agentlaw_coherence::CoherenceConfig;
use agentlaw_kernel::{AlgebraError, ComposeConfig};
use agentlaw_verify::VerifyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

const INLINE: &str = "<inline>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config at {path}: {field} {reason}")]
    Invalid {
        path: String,
        field: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub compose: ComposeConfig,
    pub verify: VerifyConfig,
    pub coherence: CoherenceConfig,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, INLINE)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: display.clone(),
            source,
        })?;
        Self::parse(&text, &display)
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: path.to_string(),
            source,
        })?;
        config.validate(path)?;
        tracing::debug!(path, ?config, "loaded engine config");
        Ok(config)
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| ConfigError::Invalid {
            path: path.to_string(),
            field,
            reason: reason.to_string(),
        };
        if self.compose.default_retry_bound == 0 {
            return Err(invalid("compose.default_retry_bound", "must be at least 1"));
        }
        if self.compose.max_enumerated == 0 {
            return Err(invalid("compose.max_enumerated", "must be at least 1"));
        }
        let distance = self.coherence.max_lossy_distance;
        if !(0.0..=1.0).contains(&distance) {
            return Err(invalid(
                "coherence.max_lossy_distance",
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}
