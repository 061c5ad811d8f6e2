//! Requirement rows indexed by (category, gender), loaded from a built table.

use std::path::Path;

use anyhow::Result;
use evidence_core::constraints::CategoryRequirement;
use evidence_core::registry::{Gender, SkillCategory};
use evidence_core::store::{RequirementStore, StoreResult};
use rustc_hash::FxHashMap;

use crate::{load_table, RequirementTableFile};

/// Read-only requirement store over a decoded table
#[derive(Debug, Clone, Default)]
pub struct TableRequirementStore {
    rows: FxHashMap<(SkillCategory, Gender), Vec<CategoryRequirement>>,
    schema_version: String,
}

impl TableRequirementStore {
    pub fn from_table(table: RequirementTableFile) -> Self {
        let mut rows: FxHashMap<(SkillCategory, Gender), Vec<CategoryRequirement>> =
            FxHashMap::default();
        for row in table.rows {
            rows.entry((row.category, row.gender)).or_default().push(row);
        }
        for group in rows.values_mut() {
            group.sort_by_key(|r| r.test_number);
        }
        Self { rows, schema_version: table.schema_version }
    }

    /// Load and index a table file
    pub fn open(table_file: &Path) -> Result<Self> {
        Ok(Self::from_table(load_table(table_file)?))
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Total row count
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RequirementStore for TableRequirementStore {
    fn list(&self, category: SkillCategory, gender: Gender) -> StoreResult<Vec<CategoryRequirement>> {
        Ok(self.rows.get(&(category, gender)).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_core::registry::PerformanceDomain;

    fn row(category: SkillCategory, gender: Gender, test_number: u8, minimum_value: f64) -> CategoryRequirement {
        CategoryRequirement {
            category,
            gender,
            test_number,
            minimum_value,
            is_hard_constraint: true,
            domain: PerformanceDomain::TeeShots,
        }
    }

    #[test]
    fn test_index_groups_by_category_and_gender() {
        let store = TableRequirementStore::from_table(RequirementTableFile {
            schema_version: "v1".into(),
            generated_at: "2026-01-01T00:00:00Z".into(),
            rows: vec![
                row(SkillCategory::C, Gender::Male, 2, 150.0),
                row(SkillCategory::C, Gender::Male, 1, 250.0),
                row(SkillCategory::C, Gender::Female, 1, 220.0),
            ],
        });

        assert_eq!(store.len(), 3);
        assert_eq!(store.schema_version(), "v1");

        let men = store.list(SkillCategory::C, Gender::Male).unwrap();
        assert_eq!(men.iter().map(|r| r.test_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.list(SkillCategory::C, Gender::Female).unwrap().len(), 1);
        assert!(store.list(SkillCategory::A, Gender::Male).unwrap().is_empty());
    }
}
