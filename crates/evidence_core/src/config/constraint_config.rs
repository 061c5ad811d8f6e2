use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Ranking and scoring of binding constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_weights"))]
pub struct ConstraintConfig {
    /// Constraints returned after ordering
    #[validate(range(min = 1, max = 50))]
    pub max_binding_constraints: u32,
    /// Readiness penalty per unit of normalized gap on a hard requirement
    #[validate(range(min = 0.0))]
    pub hard_weight: f64,
    /// Readiness penalty per unit of normalized gap on a soft requirement
    #[validate(range(min = 0.0))]
    pub soft_weight: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self { max_binding_constraints: 4, hard_weight: 2.0, soft_weight: 1.0 }
    }
}

fn validate_weights(config: &ConstraintConfig) -> Result<(), ValidationError> {
    if config.hard_weight <= config.soft_weight {
        return Err(ValidationError::new("hard_weight_not_above_soft"));
    }
    Ok(())
}
