/// Shared scoring types: context, per-criterion results, rule outcomes and
/// the aggregate scoring result.
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// SCORING CONTEXT
// ============================================================================

/// Context for scoring a content item at a specific slot.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    /// When the content would start.
    pub current_time: Option<NaiveDateTime>,
    /// Absolute start of the containing block instance.
    pub block_start: Option<NaiveDateTime>,
    /// Absolute end of the containing block instance.
    pub block_end: Option<NaiveDateTime>,
    pub is_first_in_block: bool,
    pub is_last_in_block: bool,
    /// Whether this is the very first program of the entire schedule.
    pub is_schedule_start: bool,
}

// ============================================================================
// RULE OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Mandatory,
    Forbidden,
    Preferred,
}

/// Rule match or violation detected by a criterion's M/F/P check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule_type: RuleKind,
    /// Values involved in the violation/match.
    pub values: Vec<String>,
    /// Points applied (negative for penalties).
    pub delta: f64,
}

impl RuleOutcome {
    pub fn new(rule_type: RuleKind, values: Vec<String>, delta: f64) -> Self {
        Self {
            rule_type,
            values,
            delta,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.rule_type == RuleKind::Forbidden
    }
}

// ============================================================================
// CRITERION RESULT
// ============================================================================

/// Timing breakdown kept for audit display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingDetails {
    pub is_first_in_block: bool,
    pub is_last_in_block: bool,
    pub overflow_minutes: Option<f64>,
    pub late_start_minutes: Option<f64>,
    pub early_start_minutes: Option<f64>,
    pub final_score: Option<f64>,
}

/// Bonus breakdown: human-readable applied bonuses plus earned categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusDetails {
    pub bonuses_applied: Vec<String>,
    pub categories_earned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionDetails {
    Timing(TimingDetails),
    Bonus(BonusDetails),
}

/// Result of a single criterion evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    pub name: String,
    /// Clamped to [0, 100]. Meaningless when `skipped`.
    pub score: f64,
    pub weight: f64,
    pub weighted_score: f64,
    pub multiplier: f64,
    pub multiplied_weighted_score: f64,
    /// Skipped criteria are excluded from the weighted-total denominator.
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub details: Option<CriterionDetails>,
    #[serde(default)]
    pub rule_violation: Option<RuleOutcome>,
}

impl CriterionResult {
    /// Build a result from a raw score, clamping and deriving the weighted
    /// values the way the engine aggregates them.
    pub fn build(name: &str, score: f64, weight: f64, multiplier: f64) -> Self {
        let clamped = score.clamp(0.0, 100.0);
        let weighted_score = clamped * weight / 100.0;
        Self {
            name: name.to_string(),
            score: clamped,
            weight,
            weighted_score,
            multiplier,
            multiplied_weighted_score: weighted_score * multiplier,
            skipped: false,
            details: None,
            rule_violation: None,
        }
    }

    pub fn with_details(mut self, details: CriterionDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_rule_violation(mut self, violation: Option<RuleOutcome>) -> Self {
        self.rule_violation = violation;
        self
    }

    /// A skipped result: zero weight so it drops out of the denominator.
    pub fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            score: 0.0,
            weight: 0.0,
            weighted_score: 0.0,
            multiplier: 1.0,
            multiplied_weighted_score: 0.0,
            skipped: true,
            details: None,
            rule_violation: None,
        }
    }
}

// ============================================================================
// SCORING RESULT
// ============================================================================

/// A schedule-level forbidden violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenViolation {
    /// Machine-readable rule id, e.g. `forbidden_genre`, `forbidden_age_rule`.
    pub rule: String,
    pub value: String,
    pub message: String,
    #[serde(default)]
    pub criterion: Option<String>,
    #[serde(default)]
    pub penalty: Option<f64>,
}

/// A mandatory-rule penalty applied to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandatoryPenalty {
    pub rule: String,
    pub message: String,
    pub penalty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMatch {
    Exclude,
    Include,
}

/// Complete scoring result for one content item at one slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Final score in [0, 100]; zero whenever a forbidden violation exists.
    pub total_score: f64,
    /// Weighted criterion aggregate before penalties and multiplier.
    pub weighted_total: f64,
    /// Per-criterion results, keyed by criterion name (stable order).
    pub criteria: BTreeMap<String, CriterionResult>,
    pub forbidden_violations: Vec<ForbiddenViolation>,
    pub mandatory_penalties: Vec<MandatoryPenalty>,
    pub bonuses_applied: Vec<String>,
    /// 0.5 on exclude-keyword hit, 1.1 on include hit, else 1.0.
    pub keyword_multiplier: f64,
    #[serde(default)]
    pub keyword_match: Option<KeywordMatch>,
    /// Per-criterion rule outcomes, keyed by criterion name.
    pub criterion_rule_violations: BTreeMap<String, RuleOutcome>,
}

impl ScoringResult {
    pub fn mandatory_met(&self) -> bool {
        self.mandatory_penalties.is_empty()
    }

    pub fn forbidden_violated(&self) -> bool {
        !self.forbidden_violations.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_result_build_clamps_and_weights() {
        let result = CriterionResult::build("genre", 120.0, 25.0, 2.0);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.weighted_score, 25.0);
        assert_eq!(result.multiplied_weighted_score, 50.0);

        let result = CriterionResult::build("genre", -5.0, 25.0, 1.0);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.weighted_score, 0.0);
    }

    #[test]
    fn test_skipped_result_carries_no_weight() {
        let result = CriterionResult::skipped("timing");
        assert!(result.skipped);
        assert_eq!(result.weight, 0.0);
        assert_eq!(result.multiplied_weighted_score, 0.0);
    }

    #[test]
    fn test_details_serialization_shapes() {
        let timing = CriterionDetails::Timing(TimingDetails {
            is_last_in_block: true,
            overflow_minutes: Some(12.5),
            ..TimingDetails::default()
        });
        let json = serde_json::to_value(&timing).unwrap();
        assert_eq!(json["overflow_minutes"], 12.5);

        let bonus = CriterionDetails::Bonus(BonusDetails {
            bonuses_applied: vec!["Recent release (2024): +10".to_string()],
            categories_earned: vec!["recent".to_string()],
        });
        let json = serde_json::to_value(&bonus).unwrap();
        assert_eq!(json["categories_earned"][0], "recent");
    }
}
