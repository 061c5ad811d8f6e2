//! Status state machine.
//!
//! | From | To | Guard |
//! |---|---|---|
//! | not_started | in_progress | effort > 0 |
//! | in_progress | awaiting_proof | effort >= high-effort threshold and enough sessions |
//! | awaiting_proof | resolved | progress == 100 |
//!
//! There are no backward transitions and `resolved` is terminal.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::breaking_point::{BreakingPoint, BreakingPointStatus, PROGRESS_RESOLVED};
use crate::config::{ConfidenceConfig, TransitionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct StatusTransition {
    pub from: BreakingPointStatus,
    pub to: BreakingPointStatus,
}

impl StatusTransition {
    pub fn new(from: BreakingPointStatus, to: BreakingPointStatus) -> Self {
        Self { from, to }
    }

    /// Whether `to` is the single forward step out of `from`
    pub fn is_forward_step(&self) -> bool {
        self.from.next() == Some(self.to)
    }
}

/// The transition whose guard currently holds, if any.
///
/// `sessions` is the number of sessions linked to the breaking point since it
/// was created.
pub fn decide_transition(
    config: &TransitionConfig,
    bp: &BreakingPoint,
    sessions: u32,
) -> Option<StatusTransition> {
    let to = match bp.status {
        BreakingPointStatus::NotStarted if bp.effort_percent > 0 => BreakingPointStatus::InProgress,
        BreakingPointStatus::InProgress
            if bp.effort_percent >= config.high_effort_threshold
                && sessions >= config.min_sessions_for_proof =>
        {
            BreakingPointStatus::AwaitingProof
        }
        BreakingPointStatus::AwaitingProof if bp.progress_percent == PROGRESS_RESOLVED => {
            BreakingPointStatus::Resolved
        }
        _ => return None,
    };
    Some(StatusTransition::new(bp.status, to))
}

/// How much evidence backs the current effort/progress picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

pub fn determine_confidence(config: &ConfidenceConfig, sessions: u32, has_benchmark: bool) -> Confidence {
    if sessions >= config.min_sessions_for_high && has_benchmark {
        Confidence::High
    } else if sessions >= config.min_sessions_for_medium || has_benchmark {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
