use std::collections::HashMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::cache::{CacheStats, RequirementCache};
use super::requirement::{builtin_requirements, CategoryRequirement};
use crate::config::ConstraintConfig;
use crate::error::{EvidenceError, Result};
use crate::registry::{DomainRegistry, Gender, MetricDirection, PerformanceDomain, SkillCategory};
use crate::store::{RequirementStore, StoreError};

/// Hard constraints block advancement; soft ones only lower readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hard,
    Soft,
}

/// An unmet requirement for the next category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BindingConstraint {
    pub test_number: u8,
    pub domain: PerformanceDomain,
    pub severity: Severity,
    /// Shortfall relative to the requirement, always > 0
    pub gap_normalized: f64,
    pub current_value: f64,
    pub required_value: f64,
}

/// Where the requirement rows of a report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequirementSource {
    Store,
    Cache,
    BuiltinFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintReport {
    pub player_id: Uuid,
    pub current_category: SkillCategory,
    pub target_category: SkillCategory,
    pub gender: Gender,
    /// Hard first, then soft; largest gap first within a tier; truncated
    pub binding_constraints: Vec<BindingConstraint>,
    pub can_advance: bool,
    /// 0..=100, 100 when nothing measured falls short
    pub readiness_score: f64,
    /// Requirements that had a measured value
    pub requirements_evaluated: usize,
    /// Unmet requirements before truncation
    pub unmet_total: usize,
    pub requirements_source: RequirementSource,
}

/// Normalized shortfall of `current` against `required`, 0 when met.
///
/// Lower-is-better tests use the mirrored form. A zero requirement (score to
/// par) measures the raw difference.
pub fn normalized_gap(direction: MetricDirection, current: f64, required: f64) -> f64 {
    let shortfall = match direction {
        MetricDirection::HigherBetter => required - current,
        MetricDirection::LowerBetter => current - required,
    };
    let scale = if required == 0.0 { 1.0 } else { required.abs() };
    (shortfall / scale).max(0.0)
}

/// `100 * exp(-(hard_weight * hard_gaps + soft_weight * soft_gaps))`, one decimal
pub fn readiness_score(config: &ConstraintConfig, hard_gaps: f64, soft_gaps: f64) -> f64 {
    let penalty = config.hard_weight * hard_gaps + config.soft_weight * soft_gaps;
    let score = 100.0 * (-penalty).exp();
    ((score * 10.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Ranks which unmet requirements keep a player out of the next category.
///
/// The requirement cache belongs to this instance; share one analyzer (or
/// hand the same cache to several) to share cached tables.
pub struct CategoryConstraintAnalyzer {
    store: Arc<dyn RequirementStore>,
    registry: Arc<DomainRegistry>,
    cache: Arc<RequirementCache>,
    config: ConstraintConfig,
}

impl CategoryConstraintAnalyzer {
    pub fn new(
        store: Arc<dyn RequirementStore>,
        registry: Arc<DomainRegistry>,
        config: ConstraintConfig,
    ) -> Self {
        Self { store, registry, cache: Arc::new(RequirementCache::new()), config }
    }

    pub fn with_cache(mut self, cache: Arc<RequirementCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ConstraintConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget cached requirement tables, e.g. after the reference data changed.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    pub fn compute_category_constraints(
        &self,
        player_id: Uuid,
        current_category: SkillCategory,
        gender: Gender,
        latest_test_values: &HashMap<u8, f64>,
    ) -> Result<ConstraintReport> {
        let target_category = current_category.next_up().ok_or_else(|| {
            EvidenceError::not_found("requirement set above category", current_category)
        })?;

        let (rows, source) = self.load_requirements(target_category, gender)?;

        let mut evaluated = 0usize;
        let mut hard_gaps = 0.0;
        let mut soft_gaps = 0.0;
        let mut constraints: Vec<BindingConstraint> = Vec::new();

        for requirement in rows.iter() {
            let current = match latest_test_values.get(&requirement.test_number) {
                Some(value) if value.is_finite() => *value,
                _ => continue,
            };
            if !requirement.minimum_value.is_finite() {
                continue;
            }
            evaluated += 1;

            let direction = self.registry.direction_for_test(requirement.test_number);
            let gap = normalized_gap(direction, current, requirement.minimum_value);
            if gap <= 0.0 {
                continue;
            }

            let severity = if requirement.is_hard_constraint { Severity::Hard } else { Severity::Soft };
            match severity {
                Severity::Hard => hard_gaps += gap,
                Severity::Soft => soft_gaps += gap,
            }
            constraints.push(BindingConstraint {
                test_number: requirement.test_number,
                domain: requirement.domain,
                severity,
                gap_normalized: gap,
                current_value: current,
                required_value: requirement.minimum_value,
            });
        }

        let can_advance = constraints.iter().all(|c| c.severity != Severity::Hard);
        let unmet_total = constraints.len();

        constraints.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| b.gap_normalized.total_cmp(&a.gap_normalized))
                .then_with(|| a.test_number.cmp(&b.test_number))
        });
        constraints.truncate(self.config.max_binding_constraints as usize);

        let readiness_score = readiness_score(&self.config, hard_gaps, soft_gaps);

        debug!(
            %player_id,
            current = %current_category,
            target = %target_category,
            evaluated,
            unmet_total,
            can_advance,
            readiness_score,
            "computed category constraints"
        );

        Ok(ConstraintReport {
            player_id,
            current_category,
            target_category,
            gender,
            binding_constraints: constraints,
            can_advance,
            readiness_score,
            requirements_evaluated: evaluated,
            unmet_total,
            requirements_source: source,
        })
    }

    fn load_requirements(
        &self,
        category: SkillCategory,
        gender: Gender,
    ) -> Result<(Arc<Vec<CategoryRequirement>>, RequirementSource)> {
        if let Some(rows) = self.cache.get(category, gender) {
            return Ok((rows, RequirementSource::Cache));
        }

        let listed = self
            .store
            .list(category, gender)
            .map(|rows| rows.into_iter().filter(|r| r.gender == gender).collect::<Vec<_>>());
        match listed {
            Ok(rows) if !rows.is_empty() => {
                Ok((self.cache.insert(category, gender, rows), RequirementSource::Store))
            }
            Ok(_) => {
                debug!(%category, %gender, "requirement store returned no rows, using built-in table");
                self.builtin(category, gender)
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!(%category, %gender, %reason, "requirement store unavailable, using built-in table");
                self.builtin(category, gender)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn builtin(
        &self,
        category: SkillCategory,
        gender: Gender,
    ) -> Result<(Arc<Vec<CategoryRequirement>>, RequirementSource)> {
        let rows = builtin_requirements(&self.registry, category, gender);
        if rows.is_empty() {
            return Err(EvidenceError::not_found(
                "requirement set",
                format!("{}/{}", category, gender),
            ));
        }
        Ok((Arc::new(rows), RequirementSource::BuiltinFallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRequirementStore;
    use proptest::prelude::*;

    fn registry() -> Arc<DomainRegistry> {
        Arc::new(DomainRegistry::builtin().unwrap())
    }

    fn requirement(test_number: u8, minimum_value: f64, hard: bool) -> CategoryRequirement {
        CategoryRequirement {
            category: SkillCategory::B,
            gender: Gender::Male,
            test_number,
            minimum_value,
            is_hard_constraint: hard,
            domain: crate::registry::map_test_number_to_domain(test_number)
                .unwrap_or(PerformanceDomain::Physical),
        }
    }

    fn analyzer_with(rows: Vec<CategoryRequirement>) -> CategoryConstraintAnalyzer {
        let store = Arc::new(MemoryRequirementStore::new(rows));
        CategoryConstraintAnalyzer::new(store, registry(), ConstraintConfig::default())
    }

    fn values(pairs: &[(u8, f64)]) -> HashMap<u8, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_normalized_gap_directions() {
        assert_eq!(normalized_gap(MetricDirection::HigherBetter, 200.0, 250.0), 0.2);
        assert_eq!(normalized_gap(MetricDirection::HigherBetter, 260.0, 250.0), 0.0);
        assert_eq!(normalized_gap(MetricDirection::LowerBetter, 12.0, 10.0), 0.2);
        assert_eq!(normalized_gap(MetricDirection::LowerBetter, 9.0, 10.0), 0.0);
        // score to par
        assert_eq!(normalized_gap(MetricDirection::LowerBetter, 3.0, 0.0), 3.0);
    }

    #[test]
    fn test_satisfied_and_missing_requirements_are_excluded() {
        let analyzer = analyzer_with(vec![
            requirement(1, 250.0, true),
            requirement(5, 105.0, true),
            requirement(12, 90.0, false),
        ]);
        // test 5 missing, test 1 met, test 12 short
        let report = analyzer
            .compute_category_constraints(
                Uuid::new_v4(),
                SkillCategory::C,
                Gender::Male,
                &values(&[(1, 255.0), (12, 72.0)]),
            )
            .unwrap();

        assert_eq!(report.target_category, SkillCategory::B);
        assert_eq!(report.requirements_evaluated, 2);
        assert_eq!(report.binding_constraints.len(), 1);
        let bench = &report.binding_constraints[0];
        assert_eq!(bench.test_number, 12);
        assert_eq!(bench.severity, Severity::Soft);
        assert!((bench.gap_normalized - 0.2).abs() < 1e-9);
        assert!(report.can_advance);
        assert!(report.readiness_score < 100.0);
    }

    #[test]
    fn test_hard_precede_soft_regardless_of_gap() {
        let analyzer = analyzer_with(vec![
            requirement(1, 250.0, true),
            requirement(12, 100.0, false),
            requirement(13, 200.0, false),
        ]);
        let report = analyzer
            .compute_category_constraints(
                Uuid::new_v4(),
                SkillCategory::C,
                Gender::Male,
                &values(&[(1, 245.0), (12, 20.0), (13, 100.0)]),
            )
            .unwrap();

        let order: Vec<u8> = report.binding_constraints.iter().map(|c| c.test_number).collect();
        assert_eq!(order, vec![1, 12, 13]);
        assert!(!report.can_advance);
    }

    #[test]
    fn test_truncation_keeps_hard_constraints() {
        let mut rows = Vec::new();
        let mut current = Vec::new();
        // 3 hard with small gaps, 7 soft with large gaps
        for (test, hard) in [(1, true), (3, true), (4, true)] {
            rows.push(requirement(test, 100.0, hard));
            current.push((test, 99.0));
        }
        for test in [2, 6, 7, 12, 13, 16, 20] {
            rows.push(requirement(test, 100.0, false));
            current.push((test, if test == 20 { 200.0 } else { 10.0 }));
        }

        let analyzer = analyzer_with(rows);
        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::C, Gender::Male, &values(&current))
            .unwrap();

        assert_eq!(report.unmet_total, 10);
        assert_eq!(report.binding_constraints.len(), 4);
        let hard = report.binding_constraints.iter().filter(|c| c.severity == Severity::Hard).count();
        assert_eq!(hard, 3);
        assert_eq!(report.binding_constraints[3].severity, Severity::Soft);
    }

    #[test]
    fn test_empty_values_give_full_readiness() {
        let analyzer = analyzer_with(vec![requirement(1, 250.0, true)]);
        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::D, Gender::Male, &HashMap::new())
            .unwrap();
        assert!(report.binding_constraints.is_empty());
        assert!(report.can_advance);
        assert_eq!(report.readiness_score, 100.0);
    }

    #[test]
    fn test_lower_is_better_requirement() {
        // test 19: nine-hole score, lower is better
        let analyzer = analyzer_with(vec![requirement(19, 40.0, true)]);
        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::C, Gender::Male, &values(&[(19, 44.0)]))
            .unwrap();
        assert_eq!(report.binding_constraints.len(), 1);
        assert!((report.binding_constraints[0].gap_normalized - 0.1).abs() < 1e-9);

        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::C, Gender::Male, &values(&[(19, 38.0)]))
            .unwrap();
        assert!(report.binding_constraints.is_empty());
    }

    #[test]
    fn test_category_a_has_nothing_above() {
        let analyzer = analyzer_with(vec![]);
        let err = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::A, Gender::Male, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, EvidenceError::NotFound { .. }));
    }

    #[test]
    fn test_unavailable_store_falls_back_without_caching() {
        let store = Arc::new(MemoryRequirementStore::new(vec![requirement(1, 250.0, true)]));
        store.set_available(false);
        let analyzer =
            CategoryConstraintAnalyzer::new(store.clone(), registry(), ConstraintConfig::default());

        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::D, Gender::Male, &values(&[(1, 200.0)]))
            .unwrap();
        assert_eq!(report.requirements_source, RequirementSource::BuiltinFallback);
        // built-in C target for carry is 250
        assert_eq!(report.binding_constraints[0].required_value, 250.0);
        assert_eq!(analyzer.cache_stats().entries, 0);

        store.set_available(true);
        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::C, Gender::Male, &values(&[(1, 200.0)]))
            .unwrap();
        assert_eq!(report.requirements_source, RequirementSource::Store);
    }

    /// Returns every row it holds, whatever gender was asked for
    struct GenderBlindStore(Vec<CategoryRequirement>);

    impl RequirementStore for GenderBlindStore {
        fn list(
            &self,
            _category: SkillCategory,
            _gender: Gender,
        ) -> crate::store::StoreResult<Vec<CategoryRequirement>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_other_gender_rows_fall_back_to_builtin() {
        let mut female = requirement(1, 230.0, true);
        female.gender = Gender::Female;
        let store = Arc::new(GenderBlindStore(vec![female]));
        let analyzer = CategoryConstraintAnalyzer::new(store, registry(), ConstraintConfig::default());

        let report = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::D, Gender::Male, &values(&[(1, 200.0)]))
            .unwrap();
        assert_eq!(report.requirements_source, RequirementSource::BuiltinFallback);
        assert!(!report.binding_constraints.is_empty());
        assert_eq!(report.binding_constraints[0].required_value, 250.0);
        assert_eq!(analyzer.cache_stats().entries, 0);
    }

    #[test]
    fn test_cache_serves_repeat_lookups_until_invalidated() {
        let store = Arc::new(MemoryRequirementStore::new(vec![requirement(1, 250.0, true)]));
        let analyzer =
            CategoryConstraintAnalyzer::new(store.clone(), registry(), ConstraintConfig::default());
        let readings = values(&[(1, 240.0)]);
        let player = Uuid::new_v4();

        let first = analyzer
            .compute_category_constraints(player, SkillCategory::C, Gender::Male, &readings)
            .unwrap();
        let second = analyzer
            .compute_category_constraints(player, SkillCategory::C, Gender::Male, &readings)
            .unwrap();
        assert_eq!(first.requirements_source, RequirementSource::Store);
        assert_eq!(second.requirements_source, RequirementSource::Cache);
        assert_eq!(store.list_calls(), 1);
        assert_eq!(analyzer.cache_stats().hits, 1);

        store.replace_rows(vec![requirement(1, 235.0, true)]);
        analyzer.invalidate_cache();
        let refreshed = analyzer
            .compute_category_constraints(player, SkillCategory::C, Gender::Male, &readings)
            .unwrap();
        assert_eq!(store.list_calls(), 2);
        assert!(refreshed.binding_constraints.is_empty());
        assert!(refreshed.can_advance);
    }

    #[test]
    fn test_non_availability_store_errors_propagate() {
        let store = Arc::new(MemoryRequirementStore::new(vec![]));
        store.fail_with(StoreError::InvalidRecord("corrupt row".into()));
        let analyzer = CategoryConstraintAnalyzer::new(store, registry(), ConstraintConfig::default());
        let err = analyzer
            .compute_category_constraints(Uuid::new_v4(), SkillCategory::C, Gender::Male, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, EvidenceError::Store(StoreError::InvalidRecord(_))));
    }

    #[test]
    fn test_readiness_decreases_with_gap() {
        let config = ConstraintConfig::default();
        assert_eq!(readiness_score(&config, 0.0, 0.0), 100.0);
        let soft = readiness_score(&config, 0.0, 0.1);
        let hard = readiness_score(&config, 0.1, 0.0);
        assert!(hard < soft);
        assert!(soft < 100.0);
        assert!(readiness_score(&config, 50.0, 50.0) >= 0.0);
    }

    proptest! {
        #[test]
        fn prop_ordering_truncation_and_bounds(
            entries in proptest::collection::vec((1u8..=20, 1.0f64..300.0, 0.0f64..400.0, any::<bool>()), 0..20)
        ) {
            let mut rows = Vec::new();
            let mut current = HashMap::new();
            for (test, minimum, value, hard) in entries {
                if current.contains_key(&test) {
                    continue;
                }
                rows.push(requirement(test, minimum, hard));
                current.insert(test, value);
            }
            let hard_unmet = rows.iter().filter(|r| {
                let direction = registry().direction_for_test(r.test_number);
                r.is_hard_constraint && normalized_gap(direction, current[&r.test_number], r.minimum_value) > 0.0
            }).count();

            let analyzer = analyzer_with(rows);
            let report = analyzer
                .compute_category_constraints(Uuid::new_v4(), SkillCategory::C, Gender::Male, &current)
                .unwrap();

            prop_assert!(report.binding_constraints.len() <= 4);
            prop_assert!(report.readiness_score >= 0.0 && report.readiness_score <= 100.0);
            prop_assert_eq!(report.can_advance, hard_unmet == 0);

            let first_soft = report.binding_constraints.iter().position(|c| c.severity == Severity::Soft);
            if let Some(idx) = first_soft {
                prop_assert!(report.binding_constraints[idx..].iter().all(|c| c.severity == Severity::Soft));
            }
            let shown_hard = report.binding_constraints.iter().filter(|c| c.severity == Severity::Hard).count();
            prop_assert_eq!(shown_hard, hard_unmet.min(4));
            for pair in report.binding_constraints.windows(2) {
                if pair[0].severity == pair[1].severity {
                    prop_assert!(pair[0].gap_normalized >= pair[1].gap_normalized);
                }
            }
        }
    }
}
