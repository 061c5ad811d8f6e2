use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::category::{Gender, SkillCategory};
use super::domain::PerformanceDomain;

/// Which way a raw test value improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    #[default]
    HigherBetter,
    LowerBetter,
}

impl MetricDirection {
    /// `value` meets or beats `target` in this direction
    pub fn meets(&self, value: f64, target: f64) -> bool {
        match self {
            MetricDirection::HigherBetter => value >= target,
            MetricDirection::LowerBetter => value <= target,
        }
    }

    /// Signed improvement from `from` to `to` (positive = better)
    pub fn improvement(&self, from: f64, to: f64) -> f64 {
        match self {
            MetricDirection::HigherBetter => to - from,
            MetricDirection::LowerBetter => from - to,
        }
    }
}

/// Per-gender targets indexed by skill category (A first)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct CategoryTargets {
    #[serde(rename = "M")]
    pub male: Vec<f64>,
    #[serde(rename = "K")]
    pub female: Vec<f64>,
}

impl CategoryTargets {
    pub fn for_gender(&self, gender: Gender) -> &[f64] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    pub fn target_for(&self, category: SkillCategory, gender: Gender) -> Option<f64> {
        self.for_gender(gender).get(category.index()).copied()
    }

    /// Both tables cover every category
    pub fn is_complete(&self) -> bool {
        self.male.len() == SkillCategory::ALL.len() && self.female.len() == SkillCategory::ALL.len()
    }
}

/// A measurable proof of progress inside a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProofMetric {
    pub id: String,
    pub label: String,
    pub unit: String,
    pub direction: MetricDirection,
    pub test_number: u8,
    pub domain: PerformanceDomain,
    pub targets: CategoryTargets,
}

impl ProofMetric {
    pub fn target_for(&self, category: SkillCategory, gender: Gender) -> Option<f64> {
        self.targets.target_for(category, gender)
    }
}
