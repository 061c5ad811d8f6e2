use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::domain::PerformanceDomain;
use super::proof_metric::{MetricDirection, ProofMetric};
use crate::data::{builtin_test_catalog, TestCatalog};
use crate::error::Result;

/// Config-backed lookup of proof metrics, keyed by test number.
///
/// Built once per service instance and shared behind an `Arc`; it is
/// read-only after construction.
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    metrics: BTreeMap<u8, ProofMetric>,
    hard_tests: BTreeSet<u8>,
}

impl DomainRegistry {
    /// Registry over the embedded test catalog
    pub fn builtin() -> Result<Self> {
        Ok(Self::from_catalog(builtin_test_catalog()?))
    }

    pub fn from_catalog(catalog: TestCatalog) -> Self {
        let mut metrics = BTreeMap::new();
        let mut hard_tests = BTreeSet::new();

        for entry in catalog.tests {
            if !entry.targets.is_complete() {
                warn!(
                    test_number = entry.test_number,
                    metric_id = %entry.metric_id,
                    "catalog entry does not cover every category"
                );
            }
            if entry.hard_constraint {
                hard_tests.insert(entry.test_number);
            }
            metrics.insert(
                entry.test_number,
                ProofMetric {
                    id: entry.metric_id,
                    label: entry.label,
                    unit: entry.unit,
                    direction: entry.direction,
                    test_number: entry.test_number,
                    domain: entry.domain,
                    targets: entry.targets,
                },
            );
        }

        Self { metrics, hard_tests }
    }

    /// Proof metrics for a stored domain code.
    ///
    /// An unknown code yields an empty list: a domain without metrics is a
    /// valid state, not a fault.
    pub fn get_proof_metrics(&self, domain_code: &str) -> Vec<ProofMetric> {
        match domain_code.parse::<PerformanceDomain>() {
            Ok(domain) => self.proof_metrics_for(domain).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn proof_metrics_for(&self, domain: PerformanceDomain) -> impl Iterator<Item = &ProofMetric> {
        self.metrics.values().filter(move |metric| metric.domain == domain)
    }

    pub fn metric_for_test(&self, test_number: u8) -> Option<&ProofMetric> {
        self.metrics.get(&test_number)
    }

    /// Find a metric by its rule identifier (`CARRY`, `PEI_50`, ...) or by
    /// test number written as text.
    pub fn metric_by_id(&self, id: &str) -> Option<&ProofMetric> {
        self.metrics.values().find(|metric| metric.id == id).or_else(|| {
            id.parse::<u8>().ok().and_then(|number| self.metrics.get(&number))
        })
    }

    /// Direction for a test, higher-is-better when the test is unknown
    pub fn direction_for_test(&self, test_number: u8) -> MetricDirection {
        self.metric_for_test(test_number).map(|m| m.direction).unwrap_or_default()
    }

    pub fn is_hard_constraint(&self, test_number: u8) -> bool {
        self.hard_tests.contains(&test_number)
    }

    pub fn metrics(&self) -> impl Iterator<Item = &ProofMetric> {
        self.metrics.values()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
