//! In-memory adapters for every store seam.
//!
//! Used by tests and benches. Each adapter can be switched to a failing
//! mode to exercise fallback and retry paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{
    BreakingPointStore, RequirementStore, SessionCounter, SessionScope, StoreError, StoreResult,
    TestResult, TestResultReader,
};
use crate::constraints::CategoryRequirement;
use crate::registry::{Gender, SkillCategory};
use crate::tracker::{BreakingPoint, BreakingPointPatch};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared failure switch
#[derive(Debug, Default)]
struct FailureMode {
    failure: RwLock<Option<StoreError>>,
}

impl FailureMode {
    fn set(&self, error: Option<StoreError>) {
        *write(&self.failure) = error;
    }

    fn check(&self) -> StoreResult<()> {
        match read(&self.failure).as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Breaking points keyed by id, versioned compare-and-update writes
#[derive(Debug, Default)]
pub struct MemoryBreakingPointStore {
    records: RwLock<HashMap<Uuid, BreakingPoint>>,
    failure: FailureMode,
    injected_conflicts: AtomicU32,
}

impl MemoryBreakingPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record, rejecting it if it fails validation.
    pub fn insert(&self, bp: BreakingPoint) -> StoreResult<()> {
        self.failure.check()?;
        bp.validate().map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        log::debug!("Inserted breaking point {} for player {}", bp.id, bp.player_id);
        write(&self.records).insert(bp.id, bp);
        Ok(())
    }

    pub fn len(&self) -> usize {
        read(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.records).is_empty()
    }

    pub fn set_available(&self, available: bool) {
        self.failure.set((!available).then(|| StoreError::Unavailable("breaking point store offline".into())));
    }

    /// The next `count` updates lose a race against a concurrent writer.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl BreakingPointStore for MemoryBreakingPointStore {
    fn get(&self, id: Uuid) -> StoreResult<Option<BreakingPoint>> {
        self.failure.check()?;
        Ok(read(&self.records).get(&id).cloned())
    }

    fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        patch: &BreakingPointPatch,
    ) -> StoreResult<BreakingPoint> {
        self.failure.check()?;
        let mut records = write(&self.records);
        let stored = records.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if self.take_injected_conflict() {
            // another writer got there first
            stored.version += 1;
        }

        if stored.version != expected_version {
            log::warn!(
                "Version conflict on breaking point {}: expected {}, found {}",
                id,
                expected_version,
                stored.version
            );
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                found: stored.version,
            });
        }

        let mut updated = stored.clone();
        patch.apply_to(&mut updated);
        updated.version += 1;
        updated.validate().map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        *stored = updated.clone();
        log::debug!("Updated breaking point {} to version {}", id, updated.version);
        Ok(updated)
    }

    fn list_for_player(&self, player_id: Uuid) -> StoreResult<Vec<BreakingPoint>> {
        self.failure.check()?;
        let mut found: Vec<BreakingPoint> =
            read(&self.records).values().filter(|bp| bp.player_id == player_id).cloned().collect();
        found.sort_by_key(|bp| (bp.created_at, bp.id));
        Ok(found)
    }
}

/// Benchmark results, latest-in-window lookups
#[derive(Debug, Default)]
pub struct MemoryTestResults {
    results: RwLock<Vec<TestResult>>,
    failure: FailureMode,
}

impl MemoryTestResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, result: TestResult) {
        write(&self.results).push(result);
    }

    pub fn fail_with(&self, error: StoreError) {
        self.failure.set(Some(error));
    }

    pub fn recover(&self) {
        self.failure.set(None);
    }
}

impl TestResultReader for MemoryTestResults {
    fn find_latest_test_result(
        &self,
        player_id: Uuid,
        test_id: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> StoreResult<Option<TestResult>> {
        self.failure.check()?;
        Ok(read(&self.results)
            .iter()
            .filter(|r| r.player_id == player_id && r.test_id == test_id)
            .filter(|r| r.test_date >= window_start && r.test_date <= window_end)
            .max_by_key(|r| r.test_date)
            .cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SessionRecord {
    player_id: Uuid,
    breaking_point_id: Option<Uuid>,
    completed_at: DateTime<Utc>,
}

/// Completed training sessions, optionally linked to a breaking point
#[derive(Debug, Default)]
pub struct MemorySessionLog {
    sessions: RwLock<Vec<SessionRecord>>,
    failure: FailureMode,
}

impl MemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, player_id: Uuid, breaking_point_id: Option<Uuid>, completed_at: DateTime<Utc>) {
        write(&self.sessions).push(SessionRecord { player_id, breaking_point_id, completed_at });
    }

    /// Records `count` sessions for a breaking point at `completed_at`.
    pub fn record_many(&self, player_id: Uuid, breaking_point_id: Uuid, count: u32, completed_at: DateTime<Utc>) {
        let mut sessions = write(&self.sessions);
        for _ in 0..count {
            sessions.push(SessionRecord { player_id, breaking_point_id: Some(breaking_point_id), completed_at });
        }
    }

    pub fn fail_with(&self, error: StoreError) {
        self.failure.set(Some(error));
    }
}

impl SessionCounter for MemorySessionLog {
    fn count_sessions(&self, scope: SessionScope, since: DateTime<Utc>) -> StoreResult<u32> {
        self.failure.check()?;
        let count = read(&self.sessions)
            .iter()
            .filter(|s| s.completed_at >= since)
            .filter(|s| match scope {
                SessionScope::Player(id) => s.player_id == id,
                SessionScope::BreakingPoint(id) => s.breaking_point_id == Some(id),
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// Requirement rows; counts `list` calls so cache behavior is observable
#[derive(Debug)]
pub struct MemoryRequirementStore {
    rows: RwLock<Vec<CategoryRequirement>>,
    failure: FailureMode,
    available: AtomicBool,
    calls: AtomicU64,
}

impl MemoryRequirementStore {
    pub fn new(rows: Vec<CategoryRequirement>) -> Self {
        Self {
            rows: RwLock::new(rows),
            failure: FailureMode::default(),
            available: AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }

    pub fn replace_rows(&self, rows: Vec<CategoryRequirement>) {
        *write(&self.rows) = rows;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_with(&self, error: StoreError) {
        self.failure.set(Some(error));
    }

    pub fn list_calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RequirementStore for MemoryRequirementStore {
    fn list(&self, category: SkillCategory, gender: Gender) -> StoreResult<Vec<CategoryRequirement>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("requirement store offline".into()));
        }
        self.failure.check()?;
        Ok(read(&self.rows)
            .iter()
            .filter(|r| r.category == category && r.gender == gender)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PerformanceDomain;
    use crate::tracker::BreakingPointStatus;

    fn sample() -> BreakingPoint {
        BreakingPoint::new(Uuid::new_v4(), PerformanceDomain::Putting, "15", 14, "15:pass")
    }

    #[test]
    fn test_update_bumps_version() {
        let store = MemoryBreakingPointStore::new();
        let bp = sample();
        let id = bp.id;
        store.insert(bp).unwrap();

        let updated = store.update(id, 0, &BreakingPointPatch::effort(10)).unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.effort_percent, 10);
        assert_eq!(store.get(id).unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_stale_version_is_rejected() {
        let store = MemoryBreakingPointStore::new();
        let bp = sample();
        let id = bp.id;
        store.insert(bp).unwrap();
        store.update(id, 0, &BreakingPointPatch::effort(10)).unwrap();

        let err = store.update(id, 0, &BreakingPointPatch::effort(20)).unwrap_err();
        assert_eq!(err, StoreError::VersionConflict { id: id.to_string(), expected: 0, found: 1 });
        assert_eq!(store.get(id).unwrap().unwrap().effort_percent, 10);
    }

    #[test]
    fn test_invalid_writes_are_rejected() {
        let store = MemoryBreakingPointStore::new();
        let mut bad = sample();
        bad.effort_percent = 200;
        assert!(matches!(store.insert(bad), Err(StoreError::InvalidRecord(_))));

        let bp = sample();
        let id = bp.id;
        store.insert(bp).unwrap();
        // resolved without a resolution date
        let err = store.update(id, 0, &BreakingPointPatch::status(BreakingPointStatus::Resolved)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(store.get(id).unwrap().unwrap().version, 0);
    }

    #[test]
    fn test_injected_conflicts_are_consumed() {
        let store = MemoryBreakingPointStore::new();
        let bp = sample();
        let id = bp.id;
        store.insert(bp).unwrap();
        store.inject_conflicts(1);

        assert!(store.update(id, 0, &BreakingPointPatch::effort(5)).is_err());
        assert!(store.update(id, 1, &BreakingPointPatch::effort(5)).is_ok());
    }

    #[test]
    fn test_unavailable_store() {
        let store = MemoryBreakingPointStore::new();
        store.set_available(false);
        assert!(matches!(store.get(Uuid::new_v4()), Err(StoreError::Unavailable(_))));
        store.set_available(true);
        assert_eq!(store.get(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_latest_result_in_window() {
        let results = MemoryTestResults::new();
        let player = Uuid::new_v4();
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
        for (d, v) in [(1, 200.0), (10, 210.0), (20, 220.0)] {
            results.add(TestResult {
                player_id: player,
                test_id: "1".into(),
                value: v.into(),
                passed: None,
                test_date: day(d),
            });
        }

        let latest = results.find_latest_test_result(player, "1", day(1), day(15)).unwrap().unwrap();
        assert_eq!(latest.test_date, day(10));
        assert!(results.find_latest_test_result(player, "2", day(1), day(31)).unwrap().is_none());
        assert!(results.find_latest_test_result(Uuid::new_v4(), "1", day(1), day(31)).unwrap().is_none());
    }

    #[test]
    fn test_session_scopes() {
        let log = MemorySessionLog::new();
        let player = Uuid::new_v4();
        let bp = Uuid::new_v4();
        let now = Utc::now();
        log.record_many(player, bp, 3, now);
        log.record(player, None, now);
        log.record(player, Some(bp), now - chrono::Duration::days(10));

        let since = now - chrono::Duration::days(1);
        assert_eq!(log.count_sessions(SessionScope::BreakingPoint(bp), since).unwrap(), 3);
        assert_eq!(log.count_sessions(SessionScope::Player(player), since).unwrap(), 4);
    }

    #[test]
    fn test_requirement_store_filters_and_counts() {
        let store = MemoryRequirementStore::new(vec![CategoryRequirement {
            category: SkillCategory::B,
            gender: Gender::Female,
            test_number: 1,
            minimum_value: 230.0,
            is_hard_constraint: true,
            domain: PerformanceDomain::TeeShots,
        }]);
        assert_eq!(store.list(SkillCategory::B, Gender::Female).unwrap().len(), 1);
        assert!(store.list(SkillCategory::B, Gender::Male).unwrap().is_empty());
        assert_eq!(store.list_calls(), 2);

        store.set_available(false);
        assert!(store.list(SkillCategory::B, Gender::Female).unwrap_err().is_recoverable());
    }
}
