//! Benchmark Test Catalog - Embedded Reference Data
//!
//! The 20 academy benchmark tests with units, direction, domain, hard/soft
//! flag and A-K targets per gender. Parsed once by
//! [`crate::registry::DomainRegistry::builtin`] and owned by the registry
//! instance; nothing here is cached globally.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::{CategoryTargets, MetricDirection, PerformanceDomain};

// =============================================================================
// Embedded YAML Data
// =============================================================================

/// Test catalog YAML (embedded at compile time)
pub const TEST_CATALOG_YAML: &str = include_str!("../../../../data/catalog/test_catalog.yaml");

// =============================================================================
// Raw catalog rows
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCatalog {
    pub tests: Vec<TestCatalogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCatalogEntry {
    pub test_number: u8,
    pub metric_id: String,
    pub label: String,
    pub unit: String,
    pub direction: MetricDirection,
    pub domain: PerformanceDomain,
    #[serde(default)]
    pub hard_constraint: bool,
    pub targets: CategoryTargets,
}

/// Parse a catalog document.
pub fn parse_test_catalog(yaml: &str) -> Result<TestCatalog> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Parse the embedded catalog.
pub fn builtin_test_catalog() -> Result<TestCatalog> {
    parse_test_catalog(TEST_CATALOG_YAML)
}
