use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::registry::PerformanceDomain;

/// Progress value that only a passing benchmark may produce
pub const PROGRESS_RESOLVED: u8 = 100;

/// Effort ceiling; values above 100 signal work beyond the nominal plan
pub const EFFORT_CEILING: u8 = 150;

/// Breaking point lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
pub enum BreakingPointStatus {
    #[default]
    NotStarted,
    InProgress,
    AwaitingProof,
    Resolved,
}

impl BreakingPointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakingPointStatus::NotStarted => "not_started",
            BreakingPointStatus::InProgress => "in_progress",
            BreakingPointStatus::AwaitingProof => "awaiting_proof",
            BreakingPointStatus::Resolved => "resolved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == BreakingPointStatus::Resolved
    }

    /// The single forward step out of this status, if any
    pub fn next(&self) -> Option<BreakingPointStatus> {
        match self {
            BreakingPointStatus::NotStarted => Some(BreakingPointStatus::InProgress),
            BreakingPointStatus::InProgress => Some(BreakingPointStatus::AwaitingProof),
            BreakingPointStatus::AwaitingProof => Some(BreakingPointStatus::Resolved),
            BreakingPointStatus::Resolved => None,
        }
    }
}

impl fmt::Display for BreakingPointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's identified weakness, tracked by separate effort and progress signals.
///
/// `effort_percent` is written only by effort recording and
/// `progress_percent` only by benchmark evaluation. `version` is bumped by
/// the store on every successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_resolution", skip_on_field_errors = false))]
pub struct BreakingPoint {
    pub id: Uuid,
    pub player_id: Uuid,
    pub domain: PerformanceDomain,
    pub status: BreakingPointStatus,
    #[validate(range(max = 150))]
    pub effort_percent: u8,
    #[validate(range(max = 100))]
    pub progress_percent: u8,
    #[validate(length(min = 1))]
    pub benchmark_test_id: String,
    #[validate(range(min = 1, max = 365))]
    pub benchmark_window_days: u32,
    pub baseline_measurement: Option<f64>,
    pub target_measurement: Option<f64>,
    pub current_measurement: Option<f64>,
    pub success_rule: String,
    pub created_at: DateTime<Utc>,
    pub resolved_date: Option<NaiveDate>,
    #[serde(default)]
    pub version: u64,
}

fn validate_resolution(bp: &BreakingPoint) -> Result<(), ValidationError> {
    if bp.status == BreakingPointStatus::Resolved
        && (bp.resolved_date.is_none() || bp.progress_percent != PROGRESS_RESOLVED)
    {
        return Err(ValidationError::new("resolved_without_proof"));
    }
    if bp.status != BreakingPointStatus::Resolved && bp.resolved_date.is_some() {
        return Err(ValidationError::new("resolved_date_before_resolution"));
    }
    Ok(())
}

impl BreakingPoint {
    /// New breaking point in `not_started`, as the identification workflow creates it
    pub fn new(
        player_id: Uuid,
        domain: PerformanceDomain,
        benchmark_test_id: impl Into<String>,
        benchmark_window_days: u32,
        success_rule: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            domain,
            status: BreakingPointStatus::NotStarted,
            effort_percent: 0,
            progress_percent: 0,
            benchmark_test_id: benchmark_test_id.into(),
            benchmark_window_days,
            baseline_measurement: None,
            target_measurement: None,
            current_measurement: None,
            success_rule: success_rule.into(),
            created_at: Utc::now(),
            resolved_date: None,
            version: 0,
        }
    }

    pub fn with_measurements(mut self, baseline: f64, target: f64) -> Self {
        self.baseline_measurement = Some(baseline);
        self.target_measurement = Some(target);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Field-level update applied by the store as one compare-and-update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakingPointPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_measurement: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BreakingPointStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_date: Option<NaiveDate>,
}

impl BreakingPointPatch {
    pub fn effort(effort_percent: u8) -> Self {
        Self { effort_percent: Some(effort_percent), ..Self::default() }
    }

    pub fn status(status: BreakingPointStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, bp: &mut BreakingPoint) {
        if let Some(effort) = self.effort_percent {
            bp.effort_percent = effort;
        }
        if let Some(progress) = self.progress_percent {
            bp.progress_percent = progress;
        }
        if let Some(measurement) = self.current_measurement {
            bp.current_measurement = Some(measurement);
        }
        if let Some(status) = self.status {
            bp.status = status;
        }
        if let Some(date) = self.resolved_date {
            bp.resolved_date = Some(date);
        }
    }
}
