use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::requirement::CategoryRequirement;
use crate::registry::{Gender, SkillCategory};

/// Cache statistics, passive only
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

type CacheKey = (SkillCategory, Gender);

/// Requirement rows per (category, gender), owned by one analyzer instance.
///
/// Only rows read from the backing store are cached; built-in fallback rows
/// are never stored so the next call retries the store.
#[derive(Debug, Default)]
pub struct RequirementCache {
    entries: RwLock<HashMap<CacheKey, Arc<Vec<CategoryRequirement>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RequirementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: SkillCategory, gender: Gender) -> Option<Arc<Vec<CategoryRequirement>>> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(&(category, gender)) {
            Some(rows) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(rows))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(
        &self,
        category: SkillCategory,
        gender: Gender,
        rows: Vec<CategoryRequirement>,
    ) -> Arc<Vec<CategoryRequirement>> {
        let rows = Arc::new(rows);
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert((category, gender), Arc::clone(&rows));
        rows
    }

    /// Drop every cached table; the next lookup goes to the store.
    pub fn invalidate(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
    }

    /// Drop one (category, gender) table.
    pub fn invalidate_entry(&self, category: SkillCategory, gender: Gender) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(&(category, gender));
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
        }
    }
}
