//! Performance domains and their strokes-gained roll-up.
//!
//! Test numbers map to exactly one domain through a static table. Domains roll
//! up into SG components; the four approach domains are yardage bands of the
//! single `approach` component and keep their own identity for test lookup
//! and requirement filtering.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{EvidenceError, Result};

/// Performance domain a benchmark test measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
pub enum PerformanceDomain {
    /// Tee shots (driver, fairway woods, speed)
    #[serde(rename = "TEE")]
    TeeShots,
    /// Approach from ~200m
    #[serde(rename = "INN200")]
    Approach200,
    /// Approach from ~150m
    #[serde(rename = "INN150")]
    Approach150,
    /// Approach from ~100m
    #[serde(rename = "INN100")]
    Approach100,
    /// Approach from 50m and in
    #[serde(rename = "INN50")]
    Approach50,
    /// Chipping and bunker play
    #[serde(rename = "ARG")]
    AroundGreen,
    #[serde(rename = "PUTT")]
    Putting,
    #[serde(rename = "PHYS")]
    Physical,
    /// On-course scoring simulations
    #[serde(rename = "SCORE")]
    Scoring,
}

/// Strokes-gained component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SgComponent {
    OffTheTee,
    Approach,
    AroundGreen,
    Putting,
    Total,
}

/// Result of resolving a domain against the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DomainMapping {
    pub domain: PerformanceDomain,
    pub component: SgComponent,
    pub related_test_numbers: Vec<u8>,
    pub description: String,
}

/// Test number -> domain. Reference data, kept in sync with the test catalog.
const TEST_DOMAINS: [(u8, PerformanceDomain); 20] = [
    (1, PerformanceDomain::TeeShots),
    (2, PerformanceDomain::TeeShots),
    (3, PerformanceDomain::Approach200),
    (4, PerformanceDomain::Approach150),
    (5, PerformanceDomain::TeeShots),
    (6, PerformanceDomain::TeeShots),
    (7, PerformanceDomain::TeeShots),
    (8, PerformanceDomain::Approach50),
    (9, PerformanceDomain::Approach50),
    (10, PerformanceDomain::Approach100),
    (11, PerformanceDomain::Approach100),
    (12, PerformanceDomain::Physical),
    (13, PerformanceDomain::Physical),
    (14, PerformanceDomain::Physical),
    (15, PerformanceDomain::Putting),
    (16, PerformanceDomain::Putting),
    (17, PerformanceDomain::AroundGreen),
    (18, PerformanceDomain::AroundGreen),
    (19, PerformanceDomain::Scoring),
    (20, PerformanceDomain::Scoring),
];

impl PerformanceDomain {
    pub const ALL: [PerformanceDomain; 9] = [
        PerformanceDomain::TeeShots,
        PerformanceDomain::Approach200,
        PerformanceDomain::Approach150,
        PerformanceDomain::Approach100,
        PerformanceDomain::Approach50,
        PerformanceDomain::AroundGreen,
        PerformanceDomain::Putting,
        PerformanceDomain::Physical,
        PerformanceDomain::Scoring,
    ];

    /// Stored code (`TEE`, `INN150`, ...)
    pub fn code(&self) -> &'static str {
        match self {
            PerformanceDomain::TeeShots => "TEE",
            PerformanceDomain::Approach200 => "INN200",
            PerformanceDomain::Approach150 => "INN150",
            PerformanceDomain::Approach100 => "INN100",
            PerformanceDomain::Approach50 => "INN50",
            PerformanceDomain::AroundGreen => "ARG",
            PerformanceDomain::Putting => "PUTT",
            PerformanceDomain::Physical => "PHYS",
            PerformanceDomain::Scoring => "SCORE",
        }
    }

    pub fn component(&self) -> SgComponent {
        match self {
            PerformanceDomain::TeeShots => SgComponent::OffTheTee,
            PerformanceDomain::Approach200
            | PerformanceDomain::Approach150
            | PerformanceDomain::Approach100
            | PerformanceDomain::Approach50 => SgComponent::Approach,
            PerformanceDomain::AroundGreen => SgComponent::AroundGreen,
            PerformanceDomain::Putting => SgComponent::Putting,
            PerformanceDomain::Physical | PerformanceDomain::Scoring => SgComponent::Total,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PerformanceDomain::TeeShots => "Tee shots: driver carry, club and ball speed",
            PerformanceDomain::Approach200 => "Approach shots from around 200 meters",
            PerformanceDomain::Approach150 => "Approach shots from around 150 meters",
            PerformanceDomain::Approach100 => "Approach shots from 75 to 100 meters",
            PerformanceDomain::Approach50 => "Wedge approaches from 50 meters and in",
            PerformanceDomain::AroundGreen => "Chipping and bunker play around the green",
            PerformanceDomain::Putting => "Short and mid-range putting",
            PerformanceDomain::Physical => "Strength and endurance",
            PerformanceDomain::Scoring => "On-course scoring simulations",
        }
    }

    /// Whether this is one of the approach yardage bands
    pub fn is_approach_band(&self) -> bool {
        self.component() == SgComponent::Approach
    }

    pub fn related_test_numbers(&self) -> Vec<u8> {
        TEST_DOMAINS
            .iter()
            .filter(|(_, domain)| domain == self)
            .map(|(number, _)| *number)
            .collect()
    }

    pub fn mapping(&self) -> DomainMapping {
        DomainMapping {
            domain: *self,
            component: self.component(),
            related_test_numbers: self.related_test_numbers(),
            description: self.description().to_string(),
        }
    }
}

impl fmt::Display for PerformanceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PerformanceDomain {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self> {
        PerformanceDomain::ALL
            .iter()
            .find(|domain| domain.code() == s)
            .copied()
            .ok_or_else(|| EvidenceError::InvalidDomain(s.to_string()))
    }
}

/// Resolve a stored domain code to its SG component and related tests.
pub fn map_domain_to_component(code: &str) -> Result<DomainMapping> {
    let domain: PerformanceDomain = code.parse()?;
    Ok(domain.mapping())
}

/// Look up the domain a test number belongs to.
pub fn map_test_number_to_domain(test_number: u8) -> Option<PerformanceDomain> {
    TEST_DOMAINS
        .iter()
        .find(|(number, _)| *number == test_number)
        .map(|(_, domain)| *domain)
}

/// All test numbers known to the static table, ascending.
pub fn known_test_numbers() -> impl Iterator<Item = u8> {
    TEST_DOMAINS.iter().map(|(number, _)| *number)
}
