use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Effort curve: linear per session up to a ceiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EffortConfig {
    /// Effort points per completed session
    #[validate(range(min = 1, max = 150))]
    pub effort_per_session: u32,
    /// Saturation point (values above 100 mean effort beyond plan)
    #[validate(range(min = 1, max = 150))]
    pub max_effort_percent: u8,
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self { effort_per_session: 5, max_effort_percent: 150 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProgressConfig {
    /// Highest progress a non-passing reading can produce
    #[validate(range(max = 99))]
    pub unresolved_progress_cap: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { unresolved_progress_cap: 99 }
    }
}

/// Guards for the status state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TransitionConfig {
    /// Effort at which proof is requested (in_progress -> awaiting_proof)
    #[validate(range(min = 1, max = 150))]
    pub high_effort_threshold: u8,
    /// Session volume required alongside the effort threshold
    pub min_sessions_for_proof: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { high_effort_threshold: 50, min_sessions_for_proof: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_confidence_order"))]
pub struct ConfidenceConfig {
    pub min_sessions_for_high: u32,
    pub min_sessions_for_medium: u32,
    /// Days since the latest benchmark before a breaking point counts as stalled
    #[validate(range(min = 1))]
    pub stalled_threshold_days: u32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self { min_sessions_for_high: 10, min_sessions_for_medium: 3, stalled_threshold_days: 30 }
    }
}

fn validate_confidence_order(config: &ConfidenceConfig) -> Result<(), ValidationError> {
    if config.min_sessions_for_medium > config.min_sessions_for_high {
        return Err(ValidationError::new("medium_above_high"));
    }
    Ok(())
}

/// Optimistic write behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    /// Read-compute-write attempts before giving up on a version conflict
    #[validate(range(min = 1, max = 20))]
    pub max_write_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_write_attempts: 3 }
    }
}
