use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::breaking_point::{BreakingPoint, BreakingPointPatch, BreakingPointStatus, PROGRESS_RESOLVED};
use super::effort::{effort_from_sessions, gap_closed_percent, unresolved_progress};
use super::transition::{decide_transition, determine_confidence, Confidence, StatusTransition};
use crate::config::EvidenceConfig;
use crate::error::{EvidenceError, Result};
use crate::registry::{DomainRegistry, MetricDirection, PerformanceDomain, SgComponent};
use crate::rules::{
    evaluate_reading, parse_success_rule, window_start, BenchmarkReading, RuleEvaluation, RuleOutcomeReason,
};
use crate::store::{BreakingPointStore, SessionCounter, SessionScope, StoreError, TestResultReader};

const ENTITY: &str = "breaking point";

/// Stalled breaking points are those below this progress with an old benchmark
const STALLED_PROGRESS_CEILING: u8 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EffortUpdate {
    pub breaking_point_id: Uuid,
    pub previous_effort: u8,
    pub new_effort: u8,
    pub sessions_counted: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BenchmarkOutcome {
    pub breaking_point_id: Uuid,
    pub meets_target: bool,
    pub previous_progress: u8,
    pub new_progress: u8,
    /// Share of the baseline-to-target distance this reading covers
    pub improvement_percent: Option<f64>,
    pub is_resolved: bool,
    pub benchmark_result: RuleEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BreakingPointStatusView {
    pub breaking_point_id: Uuid,
    pub domain: PerformanceDomain,
    pub status: BreakingPointStatus,
    pub effort_percent: u8,
    pub progress_percent: u8,
    pub is_resolved: bool,
}

/// Read-only snapshot combining both evidence signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BreakingPointEvaluation {
    pub breaking_point_id: Uuid,
    pub player_id: Uuid,
    pub domain: PerformanceDomain,
    pub component: SgComponent,
    pub status: BreakingPointStatus,
    pub effort_percent: u8,
    pub progress_percent: u8,
    pub sessions_counted: u32,
    pub baseline_measurement: Option<f64>,
    pub target_measurement: Option<f64>,
    pub current_measurement: Option<f64>,
    pub latest_benchmark_date: Option<NaiveDate>,
    pub benchmark_in_window: bool,
    pub confidence: Confidence,
    pub stalled: bool,
    pub recommended_transition: Option<StatusTransition>,
    pub evaluated_on: NaiveDate,
}

/// Tracks training effort and proven progress for breaking points.
///
/// Effort is written only by [`record_training_effort`](Self::record_training_effort)
/// and progress only by [`evaluate_benchmark`](Self::evaluate_benchmark). Every
/// write is a compare-and-update against the version that was read, retried
/// on conflict up to `store.max_write_attempts` times.
pub struct BreakingPointTracker {
    store: Arc<dyn BreakingPointStore>,
    sessions: Arc<dyn SessionCounter>,
    results: Arc<dyn TestResultReader>,
    registry: Arc<DomainRegistry>,
    config: EvidenceConfig,
}

impl BreakingPointTracker {
    pub fn new(
        store: Arc<dyn BreakingPointStore>,
        sessions: Arc<dyn SessionCounter>,
        results: Arc<dyn TestResultReader>,
        registry: Arc<DomainRegistry>,
        config: EvidenceConfig,
    ) -> Self {
        Self { store, sessions, results, registry, config }
    }

    pub fn config(&self) -> &EvidenceConfig {
        &self.config
    }

    fn load(&self, id: Uuid) -> Result<BreakingPoint> {
        self.store.get(id)?.ok_or_else(|| EvidenceError::not_found(ENTITY, id))
    }

    fn count_sessions(&self, bp: &BreakingPoint) -> Result<u32> {
        Ok(self.sessions.count_sessions(SessionScope::BreakingPoint(bp.id), bp.created_at)?)
    }

    /// Read, plan, compare-and-update; re-plans from a fresh read on conflict.
    ///
    /// `plan` returns the patch to write (or `None` for no write) and the
    /// outcome to report once the write, if any, has landed.
    fn compare_and_update<T>(
        &self,
        id: Uuid,
        mut plan: impl FnMut(&BreakingPoint) -> Result<(Option<BreakingPointPatch>, T)>,
    ) -> Result<(T, Option<BreakingPoint>)> {
        let attempts = self.config.store.max_write_attempts.max(1);
        for attempt in 1..=attempts {
            let current = self.load(id)?;
            let (patch, outcome) = plan(&current)?;
            let Some(patch) = patch.filter(|p| !p.is_empty()) else {
                return Ok((outcome, None));
            };

            match self.store.update(id, current.version, &patch) {
                Ok(updated) => return Ok((outcome, Some(updated))),
                Err(StoreError::VersionConflict { expected, found, .. }) => {
                    debug!(breaking_point_id = %id, attempt, expected, found, "write conflict, re-reading");
                }
                Err(StoreError::NotFound(_)) => return Err(EvidenceError::not_found(ENTITY, id)),
                Err(err) => return Err(err.into()),
            }
        }

        warn!(breaking_point_id = %id, attempts, "giving up after repeated write conflicts");
        Err(EvidenceError::Conflict { id: id.to_string(), attempts })
    }

    /// Recomputes effort from the sessions linked since creation and stores it.
    /// Never touches progress or status.
    pub fn record_training_effort(&self, breaking_point_id: Uuid) -> Result<EffortUpdate> {
        let (update, written) = self.compare_and_update(breaking_point_id, |bp| {
            let sessions_counted = self.count_sessions(bp)?;
            let previous_effort = bp.effort_percent;

            if bp.is_resolved() {
                let update = EffortUpdate {
                    breaking_point_id,
                    previous_effort,
                    new_effort: previous_effort,
                    sessions_counted,
                };
                return Ok((None, update));
            }

            let new_effort = effort_from_sessions(&self.config.effort, sessions_counted);
            let patch = (new_effort != previous_effort).then(|| BreakingPointPatch::effort(new_effort));
            Ok((patch, EffortUpdate { breaking_point_id, previous_effort, new_effort, sessions_counted }))
        })?;

        if written.is_some() {
            info!(
                breaking_point_id = %breaking_point_id,
                previous = update.previous_effort,
                effort = update.new_effort,
                sessions = update.sessions_counted,
                "recorded training effort"
            );
        }
        Ok(update)
    }

    /// Evaluates a fresh benchmark reading against `success_rule`.
    ///
    /// A passing reading resolves the breaking point in the same write
    /// (progress 100, status resolved, resolution date = `test_date`). A
    /// failing one can only raise progress, and never to 100. Effort is never
    /// touched. Repeating the call with the same reading is a no-op.
    ///
    /// Non-finite readings are rejected before the record is read, and a
    /// `proof_metric` that the catalog cannot resolve (directly or through the
    /// breaking point's benchmark test) is an error.
    pub fn evaluate_benchmark(
        &self,
        breaking_point_id: Uuid,
        proof_metric: &str,
        test_value: f64,
        test_date: NaiveDate,
        success_rule: &str,
    ) -> Result<BenchmarkOutcome> {
        if !test_value.is_finite() {
            return Err(EvidenceError::InvalidReading(test_value));
        }

        let (outcome, written) = self.compare_and_update(breaking_point_id, |bp| {
            let direction = self.direction_for(proof_metric, &bp.benchmark_test_id)?;
            let mut evaluation = self.evaluate_direct(success_rule, bp, test_value, direction);
            evaluation.test_date = Some(test_date);

            let improvement = match (bp.baseline_measurement, bp.target_measurement) {
                (Some(baseline), Some(target)) => gap_closed_percent(baseline, target, test_value),
                _ => None,
            };
            let previous_progress = bp.progress_percent;

            if bp.is_resolved() {
                let outcome = BenchmarkOutcome {
                    breaking_point_id,
                    meets_target: evaluation.passed,
                    previous_progress,
                    new_progress: previous_progress,
                    improvement_percent: improvement,
                    is_resolved: true,
                    benchmark_result: evaluation,
                };
                return Ok((None, outcome));
            }

            let meets_target = evaluation.passed;
            let (new_progress, patch) = if meets_target {
                let patch = BreakingPointPatch {
                    progress_percent: Some(PROGRESS_RESOLVED),
                    current_measurement: Some(test_value),
                    status: Some(BreakingPointStatus::Resolved),
                    resolved_date: Some(test_date),
                    ..BreakingPointPatch::default()
                };
                (PROGRESS_RESOLVED, patch)
            } else {
                let progress = unresolved_progress(
                    previous_progress,
                    improvement,
                    self.config.progress.unresolved_progress_cap,
                );
                let patch = BreakingPointPatch {
                    progress_percent: (progress != previous_progress).then_some(progress),
                    current_measurement: Some(test_value).filter(|v| bp.current_measurement != Some(*v)),
                    ..BreakingPointPatch::default()
                };
                (progress, patch)
            };

            let outcome = BenchmarkOutcome {
                breaking_point_id,
                meets_target,
                previous_progress,
                new_progress,
                improvement_percent: improvement,
                is_resolved: meets_target,
                benchmark_result: evaluation,
            };
            Ok((Some(patch), outcome))
        })?;

        if written.is_some() {
            info!(
                breaking_point_id = %breaking_point_id,
                metric = proof_metric,
                value = test_value,
                progress = outcome.new_progress,
                resolved = outcome.is_resolved,
                "evaluated benchmark"
            );
        }
        Ok(outcome)
    }

    fn direction_for(&self, proof_metric: &str, benchmark_test_id: &str) -> Result<MetricDirection> {
        self.registry
            .metric_by_id(proof_metric)
            .or_else(|| self.registry.metric_by_id(benchmark_test_id))
            .map(|metric| metric.direction)
            .ok_or_else(|| EvidenceError::not_found("proof metric", proof_metric))
    }

    /// A `test_pass` rule on a direct reading passes when the reading meets the
    /// breaking point's target in the metric's direction.
    fn evaluate_direct(
        &self,
        success_rule: &str,
        bp: &BreakingPoint,
        test_value: f64,
        direction: MetricDirection,
    ) -> RuleEvaluation {
        let Some(rule) = parse_success_rule(success_rule) else {
            debug!(breaking_point_id = %bp.id, rule = success_rule, "unparseable success rule");
            return RuleEvaluation::rejected(RuleOutcomeReason::InvalidRuleFormat);
        };
        let reading = BenchmarkReading {
            passed: bp.target_measurement.map(|target| direction.meets(test_value, target)),
            ..BenchmarkReading::numeric(test_value)
        };
        evaluate_reading(&rule, &reading, bp.baseline_measurement, direction)
    }

    pub fn get_breaking_point_status(&self, breaking_point_id: Uuid) -> Result<BreakingPointStatusView> {
        let bp = self.load(breaking_point_id)?;
        Ok(BreakingPointStatusView {
            breaking_point_id,
            domain: bp.domain,
            status: bp.status,
            effort_percent: bp.effort_percent,
            progress_percent: bp.progress_percent,
            is_resolved: bp.is_resolved(),
        })
    }

    /// The transition whose guard holds now; `None` for unknown ids. Never writes.
    pub fn should_transition_status(&self, breaking_point_id: Uuid) -> Result<Option<StatusTransition>> {
        let Some(bp) = self.store.get(breaking_point_id)? else {
            return Ok(None);
        };
        if bp.is_resolved() {
            return Ok(None);
        }
        let sessions = self.count_sessions(&bp)?;
        Ok(decide_transition(&self.config.transitions, &bp, sessions))
    }

    /// Applies `transition` if its guard still holds against the stored record.
    ///
    /// Returns the updated record, or `None` when the record has moved on or
    /// the guard no longer holds.
    pub fn apply_status_transition(
        &self,
        breaking_point_id: Uuid,
        transition: StatusTransition,
    ) -> Result<Option<BreakingPoint>> {
        let today = Utc::now().date_naive();
        let (_, written) = self.compare_and_update(breaking_point_id, |bp| {
            if bp.status != transition.from {
                return Ok((None, ()));
            }
            let sessions = self.count_sessions(bp)?;
            if decide_transition(&self.config.transitions, bp, sessions) != Some(transition) {
                return Ok((None, ()));
            }

            let mut patch = BreakingPointPatch::status(transition.to);
            if transition.to == BreakingPointStatus::Resolved && bp.resolved_date.is_none() {
                patch.resolved_date = Some(today);
            }
            Ok((Some(patch), ()))
        })?;

        match &written {
            Some(bp) => info!(breaking_point_id = %bp.id, from = %transition.from, to = %transition.to, "status transition applied"),
            None => debug!(breaking_point_id = %breaking_point_id, from = %transition.from, to = %transition.to, "status transition skipped"),
        }
        Ok(written)
    }

    /// Read-only summary: both signals, session volume, benchmark recency,
    /// confidence and whether the breaking point looks stalled.
    pub fn evaluate_breaking_point(
        &self,
        breaking_point_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<BreakingPointEvaluation> {
        let bp = self.load(breaking_point_id)?;
        let sessions_counted = self.count_sessions(&bp)?;

        let created_on = bp.created_at.date_naive();
        let latest = self
            .results
            .find_latest_test_result(bp.player_id, &bp.benchmark_test_id, created_on.min(as_of), as_of)?;
        let latest_benchmark_date = latest.as_ref().map(|result| result.test_date);

        let window_start = window_start(as_of, bp.benchmark_window_days);
        let benchmark_in_window = latest_benchmark_date.is_some_and(|date| date >= window_start);

        let stalled = !bp.is_resolved()
            && bp.progress_percent < STALLED_PROGRESS_CEILING
            && latest_benchmark_date.is_some_and(|date| {
                (as_of - date).num_days() > i64::from(self.config.confidence.stalled_threshold_days)
            });

        let confidence = determine_confidence(&self.config.confidence, sessions_counted, benchmark_in_window);
        let recommended_transition = if bp.is_resolved() {
            None
        } else {
            decide_transition(&self.config.transitions, &bp, sessions_counted)
        };

        debug!(
            breaking_point_id = %breaking_point_id,
            sessions = sessions_counted,
            ?confidence,
            stalled,
            "evaluated breaking point"
        );

        Ok(BreakingPointEvaluation {
            breaking_point_id,
            player_id: bp.player_id,
            domain: bp.domain,
            component: bp.domain.component(),
            status: bp.status,
            effort_percent: bp.effort_percent,
            progress_percent: bp.progress_percent,
            sessions_counted,
            baseline_measurement: bp.baseline_measurement,
            target_measurement: bp.target_measurement,
            current_measurement: bp.current_measurement,
            latest_benchmark_date,
            benchmark_in_window,
            confidence,
            stalled,
            recommended_transition,
            evaluated_on: as_of,
        })
    }

    /// Evaluates one reading against every unresolved breaking point of the
    /// player that is benchmarked by `benchmark_test_id`.
    ///
    /// Breaking points are evaluated in parallel; each gets its own result and
    /// a failure on one does not affect the others.
    pub fn record_benchmark_for_player(
        &self,
        player_id: Uuid,
        benchmark_test_id: &str,
        proof_metric: &str,
        test_value: f64,
        test_date: NaiveDate,
    ) -> Result<Vec<(Uuid, Result<BenchmarkOutcome>)>> {
        let targets: Vec<BreakingPoint> = self
            .store
            .list_for_player(player_id)?
            .into_iter()
            .filter(|bp| !bp.is_resolved() && bp.benchmark_test_id == benchmark_test_id)
            .collect();

        let outcomes: Vec<(Uuid, Result<BenchmarkOutcome>)> = targets
            .par_iter()
            .map(|bp| {
                let outcome = self.evaluate_benchmark(bp.id, proof_metric, test_value, test_date, &bp.success_rule);
                (bp.id, outcome)
            })
            .collect();

        let failed = outcomes.iter().filter(|(_, outcome)| outcome.is_err()).count();
        if failed > 0 {
            warn!(%player_id, test_id = benchmark_test_id, failed, "some breaking points could not be evaluated");
        }
        info!(%player_id, test_id = benchmark_test_id, evaluated = outcomes.len(), "recorded benchmark for player");
        Ok(outcomes)
    }
}
