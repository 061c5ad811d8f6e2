//! # Evidence Engine Configuration
//!
//! Every tunable constant of the tracker and the constraint analyzer in one
//! place. All sections are `#[serde(default)]`, so a YAML file only needs the
//! fields it overrides.
//!
//! ```rust
//! use evidence_core::config::EvidenceConfig;
//!
//! let config = EvidenceConfig::default();
//! assert_eq!(config.effort.effort_per_session, 5);
//! let strict = EvidenceConfig::strict();
//! assert!(strict.transitions.high_effort_threshold > config.transitions.high_effort_threshold);
//! ```

mod constraint_config;
mod tracker_config;

pub use constraint_config::ConstraintConfig;
pub use tracker_config::{
    ConfidenceConfig, EffortConfig, ProgressConfig, StoreConfig, TransitionConfig,
};

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use crate::error::{EvidenceError, Result};

/// Environment variable naming a YAML configuration file
pub const CONFIG_ENV_VAR: &str = "EVIDENCE_CONFIG";

/// Environment variable selecting a preset when no file is given
pub const PROFILE_ENV_VAR: &str = "EVIDENCE_PROFILE";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EvidenceConfig {
    #[validate]
    pub effort: EffortConfig,
    #[validate]
    pub progress: ProgressConfig,
    #[validate]
    pub transitions: TransitionConfig,
    #[validate]
    pub confidence: ConfidenceConfig,
    #[validate]
    pub constraints: ConstraintConfig,
    #[validate]
    pub store: StoreConfig,
}

impl EvidenceConfig {
    /// Stricter proof gate: more effort and volume before a benchmark is requested
    pub fn strict() -> Self {
        Self {
            transitions: TransitionConfig { high_effort_threshold: 70, min_sessions_for_proof: 14 },
            confidence: ConfidenceConfig {
                min_sessions_for_high: 14,
                min_sessions_for_medium: 5,
                ..ConfidenceConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| EvidenceError::Config(format!("invalid YAML: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| EvidenceError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    /// File named by `EVIDENCE_CONFIG`, else the `EVIDENCE_PROFILE` preset, else defaults
    pub fn from_env_or_default() -> Self {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            match Self::load(&path) {
                Ok(config) => return config,
                Err(e) => warn!(path = %path, error = %e, "ignoring evidence config file"),
            }
        }

        match env::var(PROFILE_ENV_VAR).unwrap_or_default().to_lowercase().as_str() {
            "strict" => Self::strict(),
            _ => Self::default(),
        }
    }

    /// Field ranges plus the cross-field checks of each section
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| EvidenceError::Config(e.to_string()))
    }
}
