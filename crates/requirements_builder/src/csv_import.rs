//! Requirement CSV import
//!
//! CSV → Vec<CategoryRequirement>, one row per (category, gender, test).
//!
//! Expected columns:
//! `category,gender,test_number,minimum_value,is_hard_constraint,domain`

use std::path::Path;

use anyhow::{Context, Result};
use evidence_core::constraints::CategoryRequirement;
use evidence_core::registry::{map_test_number_to_domain, Gender, PerformanceDomain, SkillCategory};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::warn;

/// CSV parsing statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub total_rows: u32,
    pub parsed: u32,
    pub failed: u32,
    /// Rows whose domain disagrees with the test-number mapping (kept as given)
    pub domain_mismatches: u32,
    /// Rows that replaced an earlier row for the same (category, gender, test)
    pub duplicates: u32,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    category: String,
    gender: String,
    test_number: String,
    minimum_value: String,
    is_hard_constraint: String,
    domain: String,
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" | "" => Some(false),
        _ => None,
    }
}

fn parse_row(raw: &RawRow) -> std::result::Result<CategoryRequirement, String> {
    let category: SkillCategory = raw.category.trim().parse().map_err(|e| format!("{}", e))?;
    let gender: Gender = raw.gender.trim().parse().map_err(|e| format!("{}", e))?;
    let test_number: u8 = raw
        .test_number
        .trim()
        .parse()
        .map_err(|_| format!("Invalid test_number value: '{}'", raw.test_number.trim()))?;
    let minimum_value = raw
        .minimum_value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid minimum_value value: '{}'", raw.minimum_value.trim()))?;
    let is_hard_constraint = parse_flag(&raw.is_hard_constraint)
        .ok_or_else(|| format!("Invalid is_hard_constraint value: '{}'", raw.is_hard_constraint.trim()))?;
    let domain: PerformanceDomain = raw.domain.trim().parse().map_err(|e| format!("{}", e))?;

    Ok(CategoryRequirement { category, gender, test_number, minimum_value, is_hard_constraint, domain })
}

/// Parse a requirement CSV export.
///
/// Malformed rows are counted and skipped; the first row is the header.
/// A later row for the same (category, gender, test) replaces the earlier one.
pub fn parse_requirements_csv(csv_path: &Path) -> Result<(Vec<CategoryRequirement>, ParseStats)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {}", csv_path.display()))?;

    let mut stats = ParseStats::default();
    let mut rows: FxHashMap<(SkillCategory, Gender, u8), CategoryRequirement> = FxHashMap::default();

    for (index, record) in reader.deserialize::<RawRow>().enumerate() {
        let line = index + 2;
        stats.total_rows += 1;

        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                stats.failed += 1;
                warn!(line, error = %e, "unreadable CSV row");
                continue;
            }
        };

        let requirement = match parse_row(&raw) {
            Ok(requirement) => requirement,
            Err(reason) => {
                stats.failed += 1;
                warn!(line, %reason, "skipping requirement row");
                continue;
            }
        };

        match map_test_number_to_domain(requirement.test_number) {
            Some(expected) if expected != requirement.domain => {
                stats.domain_mismatches += 1;
                warn!(
                    line,
                    test_number = requirement.test_number,
                    given = %requirement.domain,
                    expected = %expected,
                    "domain does not match test-number mapping"
                );
            }
            None => {
                warn!(line, test_number = requirement.test_number, "test number not in the catalog");
            }
            _ => {}
        }

        let key = (requirement.category, requirement.gender, requirement.test_number);
        if rows.insert(key, requirement).is_some() {
            stats.duplicates += 1;
        }
        stats.parsed += 1;
    }

    let mut requirements: Vec<CategoryRequirement> = rows.into_values().collect();
    requirements.sort_by_key(|r| (r.gender.code(), r.category, r.test_number));
    Ok((requirements, stats))
}
