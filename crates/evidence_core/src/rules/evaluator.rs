use std::sync::Arc;

use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::grammar::{parse_success_rule, ComparisonOp, SuccessRule};
use crate::error::Result;
use crate::registry::{DomainRegistry, MetricDirection};
use crate::store::TestResultReader;

/// Expected non-events, returned inline instead of raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcomeReason {
    InvalidRuleFormat,
    NoTestInWindow,
    NonNumericValue,
    MissingBaseline,
}

impl RuleOutcomeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleOutcomeReason::InvalidRuleFormat => "invalid_rule_format",
            RuleOutcomeReason::NoTestInWindow => "no_test_in_window",
            RuleOutcomeReason::NonNumericValue => "non_numeric_value",
            RuleOutcomeReason::MissingBaseline => "missing_baseline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RuleEvaluation {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RuleOutcomeReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<ComparisonOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_date: Option<NaiveDate>,
}

impl RuleEvaluation {
    pub fn rejected(reason: RuleOutcomeReason) -> Self {
        Self { passed: false, reason: Some(reason), ..Self::default() }
    }
}

/// One benchmark reading as seen by a rule
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BenchmarkReading {
    /// Numeric value, `None` if the stored value could not be coerced
    pub value: Option<f64>,
    /// Pass flag recorded with the result
    pub passed: Option<bool>,
}

impl BenchmarkReading {
    pub fn numeric(value: f64) -> Self {
        Self { value: Some(value).filter(|v| v.is_finite()), passed: None }
    }
}

/// Percent improvement from `baseline` to `value` in the metric's direction
pub fn improvement_percent(direction: MetricDirection, baseline: f64, value: f64) -> Option<f64> {
    if !baseline.is_finite() || !value.is_finite() || baseline == 0.0 {
        return None;
    }
    Some(direction.improvement(baseline, value) * 100.0 / baseline.abs())
}

/// Evaluates a parsed rule against a reading that is already at hand.
pub fn evaluate_reading(
    rule: &SuccessRule,
    reading: &BenchmarkReading,
    baseline: Option<f64>,
    direction: MetricDirection,
) -> RuleEvaluation {
    match rule {
        SuccessRule::TestPass { .. } => RuleEvaluation {
            passed: reading.passed.unwrap_or(false),
            actual_value: reading.value,
            ..RuleEvaluation::default()
        },
        SuccessRule::MetricThreshold { operator, threshold, .. } => match reading.value {
            Some(actual) => RuleEvaluation {
                passed: operator.compare(actual, *threshold),
                operator: Some(*operator),
                actual_value: Some(actual),
                required_value: Some(*threshold),
                ..RuleEvaluation::default()
            },
            None => RuleEvaluation {
                operator: Some(*operator),
                required_value: Some(*threshold),
                ..RuleEvaluation::rejected(RuleOutcomeReason::NonNumericValue)
            },
        },
        SuccessRule::ImprovementPercent { percent } => {
            let Some(value) = reading.value else {
                return RuleEvaluation::rejected(RuleOutcomeReason::NonNumericValue);
            };
            match baseline.and_then(|b| improvement_percent(direction, b, value)) {
                Some(change) => RuleEvaluation {
                    passed: change >= *percent,
                    operator: Some(ComparisonOp::AtLeast),
                    actual_value: Some((change * 10.0).round() / 10.0),
                    required_value: Some(*percent),
                    ..RuleEvaluation::default()
                },
                None => RuleEvaluation {
                    required_value: Some(*percent),
                    ..RuleEvaluation::rejected(RuleOutcomeReason::MissingBaseline)
                },
            }
        }
    }
}

/// First day of a `window_days` look-back ending on `as_of`, inclusive.
/// Windows reaching past the calendar's start begin at [`NaiveDate::MIN`].
pub fn window_start(as_of: NaiveDate, window_days: u32) -> NaiveDate {
    as_of.checked_sub_days(Days::new(u64::from(window_days))).unwrap_or(NaiveDate::MIN)
}

/// Inputs of one windowed rule evaluation
#[derive(Debug, Clone)]
pub struct RuleRequest<'a> {
    pub player_id: Uuid,
    pub success_rule: &'a str,
    pub benchmark_test_id: &'a str,
    pub benchmark_window_days: u32,
    pub as_of: NaiveDate,
    /// Only consulted by improvement rules
    pub baseline: Option<f64>,
}

impl<'a> RuleRequest<'a> {
    pub fn new(
        player_id: Uuid,
        success_rule: &'a str,
        benchmark_test_id: &'a str,
        benchmark_window_days: u32,
        as_of: NaiveDate,
    ) -> Self {
        Self { player_id, success_rule, benchmark_test_id, benchmark_window_days, as_of, baseline: None }
    }

    pub fn with_baseline(mut self, baseline: Option<f64>) -> Self {
        self.baseline = baseline;
        self
    }

    /// First day of the window, inclusive
    pub fn window_start(&self) -> NaiveDate {
        window_start(self.as_of, self.benchmark_window_days)
    }
}

/// Evaluates stored success rules against the latest reading in a time window.
pub struct SuccessRuleEngine {
    results: Arc<dyn TestResultReader>,
    registry: Arc<DomainRegistry>,
}

impl SuccessRuleEngine {
    pub fn new(results: Arc<dyn TestResultReader>, registry: Arc<DomainRegistry>) -> Self {
        Self { results, registry }
    }

    /// Read-only; an `Err` is a store failure, expected misses come back as reasons.
    pub fn evaluate_success_rule(&self, request: &RuleRequest<'_>) -> Result<RuleEvaluation> {
        let Some(rule) = parse_success_rule(request.success_rule) else {
            debug!(player_id = %request.player_id, rule = request.success_rule, "unparseable success rule");
            return Ok(RuleEvaluation::rejected(RuleOutcomeReason::InvalidRuleFormat));
        };

        let window_start = request.window_start();
        let latest = self.results.find_latest_test_result(
            request.player_id,
            request.benchmark_test_id,
            window_start,
            request.as_of,
        )?;

        let Some(result) = latest else {
            debug!(
                player_id = %request.player_id,
                test_id = request.benchmark_test_id,
                %window_start,
                as_of = %request.as_of,
                "no benchmark in window"
            );
            return Ok(RuleEvaluation::rejected(RuleOutcomeReason::NoTestInWindow));
        };

        let reading = BenchmarkReading { value: result.value.as_number(), passed: result.passed };
        let direction = self
            .registry
            .metric_by_id(request.benchmark_test_id)
            .map(|metric| metric.direction)
            .unwrap_or_default();

        let mut evaluation = evaluate_reading(&rule, &reading, request.baseline, direction);
        evaluation.test_date = Some(result.test_date);

        debug!(
            player_id = %request.player_id,
            kind = rule.kind(),
            passed = evaluation.passed,
            "evaluated success rule"
        );
        Ok(evaluation)
    }
}
