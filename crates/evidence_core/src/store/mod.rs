//! Data-access seams for the collaborators this engine consumes.
//!
//! Persistence lives elsewhere; the engine only sees these traits. Writes to
//! breaking points are compare-and-update keyed by `(id, version)` so that
//! concurrent effort and benchmark submissions for the same player never
//! overwrite each other's field.

pub mod memory;

pub use memory::*;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::registry::{Gender, SkillCategory};
use crate::constraints::CategoryRequirement;
use crate::tracker::{BreakingPoint, BreakingPointPatch};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::VersionConflict { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Raw value as recorded by the test-entry workflow.
///
/// Legacy rows carry numbers as text; [`RecordedValue::as_number`] coerces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RecordedValue {
    Number(f64),
    Text(String),
}

impl RecordedValue {
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RecordedValue::Number(value) => Some(*value),
            RecordedValue::Text(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        };
        value.filter(|value| value.is_finite())
    }
}

impl From<f64> for RecordedValue {
    fn from(value: f64) -> Self {
        RecordedValue::Number(value)
    }
}

/// A stored benchmark reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestResult {
    pub player_id: Uuid,
    /// Test number or metric id the reading was recorded under
    pub test_id: String,
    pub value: RecordedValue,
    /// Pass flag set by the test protocol, when it has one
    pub passed: Option<bool>,
    pub test_date: NaiveDate,
}

/// What a session count is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionScope {
    Player(Uuid),
    BreakingPoint(Uuid),
}

pub trait TestResultReader: Send + Sync {
    /// Most recent result for the player and test within `[window_start, window_end]`.
    fn find_latest_test_result(
        &self,
        player_id: Uuid,
        test_id: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> StoreResult<Option<TestResult>>;
}

pub trait SessionCounter: Send + Sync {
    /// Completed training sessions in scope since `since`.
    fn count_sessions(&self, scope: SessionScope, since: DateTime<Utc>) -> StoreResult<u32>;
}

pub trait BreakingPointStore: Send + Sync {
    fn get(&self, id: Uuid) -> StoreResult<Option<BreakingPoint>>;

    /// Apply `patch` only if the stored version still equals `expected_version`.
    /// Returns the updated record with its new version.
    fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        patch: &BreakingPointPatch,
    ) -> StoreResult<BreakingPoint>;

    fn list_for_player(&self, player_id: Uuid) -> StoreResult<Vec<BreakingPoint>>;
}

pub trait RequirementStore: Send + Sync {
    fn list(&self, category: SkillCategory, gender: Gender) -> StoreResult<Vec<CategoryRequirement>>;
}
