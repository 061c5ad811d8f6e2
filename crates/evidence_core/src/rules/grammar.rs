//! Success rule grammar.
//!
//! Rules are stored as compact strings and parsed into [`SuccessRule`]:
//!
//! | Form | Example |
//! |---|---|
//! | `<testId>:pass` | `15:pass` |
//! | `<metricId>:<op>:<number>` with op `>=` or `<=` | `CARRY:>=:220` |
//! | `improvement:percent:<number>` | `improvement:percent:10` |
//!
//! The first matching form wins and matching is case-sensitive. Anything
//! else parses to `None`; malformed legacy strings are data, not faults.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::registry::MetricDirection;

/// Normalized gap below which the absolute target is used as the rule
pub const DIRECT_TARGET_GAP: f64 = 0.15;

/// Bounds of the improvement step proposed for large gaps, in percent
pub const MIN_IMPROVEMENT_STEP: f64 = 5.0;
pub const MAX_IMPROVEMENT_STEP: f64 = 20.0;

const IMPROVEMENT_KEYWORD: &str = "improvement";
const PERCENT_KEYWORD: &str = "percent";
const PASS_KEYWORD: &str = "pass";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ComparisonOp {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
}

impl ComparisonOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">=" => Some(ComparisonOp::AtLeast),
            "<=" => Some(ComparisonOp::AtMost),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::AtLeast => ">=",
            ComparisonOp::AtMost => "<=",
        }
    }

    pub fn compare(&self, actual: f64, required: f64) -> bool {
        match self {
            ComparisonOp::AtLeast => actual >= required,
            ComparisonOp::AtMost => actual <= required,
        }
    }

    /// The operator that means "meets the target" for a metric direction
    pub fn for_direction(direction: MetricDirection) -> Self {
        match direction {
            MetricDirection::HigherBetter => ComparisonOp::AtLeast,
            MetricDirection::LowerBetter => ComparisonOp::AtMost,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessRule {
    TestPass { test_id: String },
    MetricThreshold { metric_id: String, operator: ComparisonOp, threshold: f64 },
    ImprovementPercent { percent: f64 },
}

impl SuccessRule {
    pub fn kind(&self) -> &'static str {
        match self {
            SuccessRule::TestPass { .. } => "test_pass",
            SuccessRule::MetricThreshold { .. } => "metric_threshold",
            SuccessRule::ImprovementPercent { .. } => "improvement_percent",
        }
    }
}

/// Renders the storage form, which parses back to the same rule
impl fmt::Display for SuccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessRule::TestPass { test_id } => write!(f, "{}:{}", test_id, PASS_KEYWORD),
            SuccessRule::MetricThreshold { metric_id, operator, threshold } => {
                write!(f, "{}:{}:{}", metric_id, operator, threshold)
            }
            SuccessRule::ImprovementPercent { percent } => {
                write!(f, "{}:{}:{}", IMPROVEMENT_KEYWORD, PERCENT_KEYWORD, percent)
            }
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_identifier(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| !c.is_whitespace())
}

pub fn parse_success_rule(rule: &str) -> Option<SuccessRule> {
    let parts: Vec<&str> = rule.trim().split(':').collect();

    match parts.as_slice() {
        [test_id, PASS_KEYWORD] if is_identifier(test_id) => {
            Some(SuccessRule::TestPass { test_id: (*test_id).to_string() })
        }
        [metric_id, op, number] if is_identifier(metric_id) && ComparisonOp::from_symbol(op).is_some() => {
            let operator = ComparisonOp::from_symbol(op)?;
            let threshold = parse_number(number)?;
            Some(SuccessRule::MetricThreshold { metric_id: (*metric_id).to_string(), operator, threshold })
        }
        [IMPROVEMENT_KEYWORD, PERCENT_KEYWORD, number] => {
            let percent = parse_number(number)?;
            Some(SuccessRule::ImprovementPercent { percent })
        }
        _ => None,
    }
}

/// Default rule for a newly identified breaking point.
///
/// A target within 15% of the baseline is used directly as a threshold.
/// Larger gaps get an improvement step of half the gap, clamped to 5..=20%.
/// Without usable measurements the rule falls back to the test's pass flag.
pub fn build_default_success_rule(
    test_id: &str,
    baseline: f64,
    target: f64,
    operator: ComparisonOp,
) -> String {
    if !baseline.is_finite() || !target.is_finite() {
        return SuccessRule::TestPass { test_id: test_id.to_string() }.to_string();
    }

    let scale = if target == 0.0 { 1.0 } else { target.abs() };
    let gap = (target - baseline).abs() / scale;

    let rule = if gap < DIRECT_TARGET_GAP {
        SuccessRule::MetricThreshold { metric_id: test_id.to_string(), operator, threshold: target }
    } else {
        let step = (gap * 100.0 / 2.0).clamp(MIN_IMPROVEMENT_STEP, MAX_IMPROVEMENT_STEP).round();
        SuccessRule::ImprovementPercent { percent: step }
    };
    rule.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_pass() {
        assert_eq!(
            parse_success_rule("15:pass"),
            Some(SuccessRule::TestPass { test_id: "15".into() })
        );
        assert_eq!(
            parse_success_rule("PUTT_3M:pass"),
            Some(SuccessRule::TestPass { test_id: "PUTT_3M".into() })
        );
    }

    #[test]
    fn test_parse_metric_threshold_at_least() {
        assert_eq!(
            parse_success_rule("CARRY:>=:220"),
            Some(SuccessRule::MetricThreshold {
                metric_id: "CARRY".into(),
                operator: ComparisonOp::AtLeast,
                threshold: 220.0,
            })
        );
    }

    #[test]
    fn test_parse_metric_threshold_at_most() {
        assert_eq!(
            parse_success_rule("PEI_50:<=:0.085"),
            Some(SuccessRule::MetricThreshold {
                metric_id: "PEI_50".into(),
                operator: ComparisonOp::AtMost,
                threshold: 0.085,
            })
        );
        assert_eq!(
            parse_success_rule("NINE_HOLE_SCORE:<=:-2"),
            Some(SuccessRule::MetricThreshold {
                metric_id: "NINE_HOLE_SCORE".into(),
                operator: ComparisonOp::AtMost,
                threshold: -2.0,
            })
        );
    }

    #[test]
    fn test_parse_improvement_percent() {
        assert_eq!(
            parse_success_rule("improvement:percent:12.5"),
            Some(SuccessRule::ImprovementPercent { percent: 12.5 })
        );
    }

    #[test]
    fn test_first_match_wins() {
        // a metric literally called "improvement" is still a threshold rule
        assert_eq!(
            parse_success_rule("improvement:>=:5"),
            Some(SuccessRule::MetricThreshold {
                metric_id: "improvement".into(),
                operator: ComparisonOp::AtLeast,
                threshold: 5.0,
            })
        );
        assert_eq!(
            parse_success_rule("pass:pass"),
            Some(SuccessRule::TestPass { test_id: "pass".into() })
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "",
            "invalid",
            "foo:bar",
            ":pass",
            "CARRY:>:220",
            "CARRY:==:220",
            "CARRY:>=:abc",
            "CARRY:>=:",
            "CARRY:>=:NaN",
            "CARRY:>=:inf",
            ":>=:220",
            "improvement:percent:",
            "improvement:percent:ten",
            "Improvement:percent:10",
            "15:PASS",
            "a:b:c:d",
        ] {
            assert_eq!(parse_success_rule(raw), None, "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let rules = [
            SuccessRule::TestPass { test_id: "17".into() },
            SuccessRule::MetricThreshold {
                metric_id: "CLUB_SPEED".into(),
                operator: ComparisonOp::AtLeast,
                threshold: 104.5,
            },
            SuccessRule::ImprovementPercent { percent: 8.0 },
        ];
        for rule in rules {
            assert_eq!(parse_success_rule(&rule.to_string()), Some(rule.clone()));
        }
    }

    #[test]
    fn test_default_rule_small_gap_uses_target() {
        assert_eq!(build_default_success_rule("CARRY", 200.0, 220.0, ComparisonOp::AtLeast), "CARRY:>=:220");
        assert_eq!(
            build_default_success_rule("PUTT_3M", 7.0, 7.5, ComparisonOp::AtLeast),
            "PUTT_3M:>=:7.5"
        );
    }

    #[test]
    fn test_default_rule_large_gap_uses_improvement_step() {
        // gap 50% -> step 25 clamped to 20
        assert_eq!(
            build_default_success_rule("CARRY", 100.0, 200.0, ComparisonOp::AtLeast),
            "improvement:percent:20"
        );
        // gap 20% -> step 10
        assert_eq!(
            build_default_success_rule("CARRY", 160.0, 200.0, ComparisonOp::AtLeast),
            "improvement:percent:10"
        );
        // lower-is-better gap uses the absolute difference as well
        assert_eq!(
            build_default_success_rule("RUN_3000M", 900.0, 720.0, ComparisonOp::AtMost),
            "improvement:percent:13"
        );
    }

    #[test]
    fn test_default_rule_is_always_parseable() {
        for (baseline, target) in [(200.0, 220.0), (1.0, 300.0), (5.0, 0.0), (f64::NAN, 10.0)] {
            let rule = build_default_success_rule("CARRY", baseline, target, ComparisonOp::AtLeast);
            assert!(parse_success_rule(&rule).is_some(), "{} should parse", rule);
        }
    }

    #[test]
    fn test_operator_for_direction() {
        assert_eq!(ComparisonOp::for_direction(MetricDirection::HigherBetter), ComparisonOp::AtLeast);
        assert_eq!(ComparisonOp::for_direction(MetricDirection::LowerBetter), ComparisonOp::AtMost);
        assert!(ComparisonOp::AtMost.compare(3.0, 3.0));
        assert!(!ComparisonOp::AtLeast.compare(2.9, 3.0));
    }
}
