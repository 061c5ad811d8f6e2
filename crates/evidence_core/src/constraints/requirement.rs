use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::registry::{DomainRegistry, Gender, PerformanceDomain, SkillCategory};

/// Minimum result on one test needed to be placed in a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryRequirement {
    pub category: SkillCategory,
    pub gender: Gender,
    pub test_number: u8,
    /// Threshold in the test's own unit; a maximum for lower-is-better tests
    pub minimum_value: f64,
    pub is_hard_constraint: bool,
    pub domain: PerformanceDomain,
}

/// Requirement rows derived from the test catalog.
///
/// Used when the requirement store cannot be reached.
pub fn builtin_requirements(
    registry: &DomainRegistry,
    category: SkillCategory,
    gender: Gender,
) -> Vec<CategoryRequirement> {
    registry
        .metrics()
        .filter_map(|metric| {
            metric.target_for(category, gender).map(|minimum_value| CategoryRequirement {
                category,
                gender,
                test_number: metric.test_number,
                minimum_value,
                is_hard_constraint: registry.is_hard_constraint(metric.test_number),
                domain: metric.domain,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rows_for_category() {
        let registry = DomainRegistry::builtin().unwrap();
        let rows = builtin_requirements(&registry, SkillCategory::C, Gender::Male);
        assert_eq!(rows.len(), 20);

        let carry = rows.iter().find(|r| r.test_number == 1).unwrap();
        assert_eq!(carry.minimum_value, 250.0);
        assert!(carry.is_hard_constraint);
        assert_eq!(carry.domain, PerformanceDomain::TeeShots);

        let bench = rows.iter().find(|r| r.test_number == 12).unwrap();
        assert!(!bench.is_hard_constraint);
    }

    #[test]
    fn test_builtin_rows_differ_by_gender() {
        let registry = DomainRegistry::builtin().unwrap();
        let men = builtin_requirements(&registry, SkillCategory::A, Gender::Male);
        let women = builtin_requirements(&registry, SkillCategory::A, Gender::Female);
        let carry = |rows: &[CategoryRequirement]| {
            rows.iter().find(|r| r.test_number == 1).map(|r| r.minimum_value)
        };
        assert_eq!(carry(&men), Some(270.0));
        assert_eq!(carry(&women), Some(240.0));
        assert!(women.iter().all(|r| r.gender == Gender::Female));
    }
}
