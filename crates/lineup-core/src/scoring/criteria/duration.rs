/// Duration fit against the block's (or profile's) min/max bounds.
use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionResult, ScoringContext};

pub struct DurationCriterion;

/// Bucket a runtime into the category tokens used by duration rules.
pub fn duration_category(duration_ms: i64) -> Option<&'static str> {
    if duration_ms <= 0 {
        return None;
    }
    let minutes = duration_ms as f64 / 60_000.0;
    Some(if minutes < 60.0 {
        "short"
    } else if minutes < 120.0 {
        "standard"
    } else if minutes < 180.0 {
        "long"
    } else if minutes < 240.0 {
        "very_long"
    } else {
        "epic"
    })
}

impl DurationCriterion {
    fn calculate(&self, content: &Content, profile: &Profile, block: Option<&TimeBlock>) -> f64 {
        if content.duration_ms <= 0 {
            return 0.0;
        }
        let minutes = content.duration_minutes();

        let (min_duration, max_duration) = match block {
            Some(block) => (
                block.criteria.min_duration_min.unwrap_or(1.0),
                block.criteria.max_duration_min.unwrap_or(240.0),
            ),
            None => {
                let global = &profile.mandatory_forbidden_criteria;
                (
                    global.min_duration_min.unwrap_or(1.0),
                    global.max_duration_min.unwrap_or(240.0),
                )
            }
        };

        if minutes < min_duration {
            let ratio = minutes / min_duration;
            return (ratio * 50.0).max(0.0);
        }

        if minutes > max_duration {
            let excess = minutes - max_duration;
            let penalty = (excess / max_duration * 100.0).min(50.0);
            return (100.0 - penalty).max(0.0);
        }

        // Inside the bounds: maximal at the midpoint, decaying to 70 at the edges
        let ideal = (min_duration + max_duration) / 2.0;
        let half_range = (max_duration - min_duration) / 2.0;
        if half_range > 0.0 {
            let fit = 1.0 - (minutes - ideal).abs() / half_range;
            70.0 + fit * 30.0
        } else {
            85.0
        }
    }
}

impl Criterion for DurationCriterion {
    fn name(&self) -> &'static str {
        "duration"
    }

    fn default_weight(&self) -> f64 {
        15.0
    }

    fn evaluate(
        &self,
        content: &Content,
        _meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        _ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let mut score = self.calculate(content, profile, block);
        let policy = policy_of(profile, block);

        // Rules see the category plus an exact-minute alias token
        let mut violation = None;
        if let Some(category) = duration_category(content.duration_ms) {
            let tokens = vec![
                category.to_string(),
                format!("{}min", content.duration_minutes() as i64),
            ];
            let (adjustment, outcome) =
                mfp::check_alias_tokens(&tokens, block_rules(block, self.name()), &policy);
            score += adjustment;
            violation = outcome;
        }

        CriterionResult::build(
            self.name(),
            score,
            weight_of(profile, self),
            multiplier_of(profile, block, self.name()),
        )
        .with_rule_violation(violation)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockCriteria;
    use crate::testing::fixtures::{block_with_criteria, movie, profile_with_block};

    fn bounded_block(min: f64, max: f64) -> TimeBlock {
        block_with_criteria(
            "b",
            "00:00",
            "23:59",
            BlockCriteria {
                min_duration_min: Some(min),
                max_duration_min: Some(max),
                ..BlockCriteria::default()
            },
        )
    }

    #[test]
    fn test_midpoint_is_maximal() {
        let block = bounded_block(60.0, 120.0);
        let profile = profile_with_block(&block);

        let result = DurationCriterion.evaluate(
            &movie("m", "Mid", 90),
            None,
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 100.0);

        // Edge of the range decays to 70
        let result = DurationCriterion.evaluate(
            &movie("m", "Edge", 120),
            None,
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 70.0);
    }

    #[test]
    fn test_below_min_scales_to_half() {
        let block = bounded_block(60.0, 120.0);
        let profile = profile_with_block(&block);

        let result = DurationCriterion.evaluate(
            &movie("m", "Short", 30),
            None,
            &profile,
            Some(&block),
            None,
        );
        // (30/60) * 50
        assert_eq!(result.score, 25.0);
    }

    #[test]
    fn test_above_max_penalized_proportionally() {
        let block = bounded_block(60.0, 120.0);
        let profile = profile_with_block(&block);

        let result = DurationCriterion.evaluate(
            &movie("m", "Long", 150),
            None,
            &profile,
            Some(&block),
            None,
        );
        // 100 - (30/120)*100 = 75
        assert_eq!(result.score, 75.0);

        // Overrun penalty caps at 50
        let result = DurationCriterion.evaluate(
            &movie("m", "Epic", 600),
            None,
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 50.0);
    }

    #[test]
    fn test_zero_duration_scores_0() {
        let block = bounded_block(60.0, 120.0);
        let profile = profile_with_block(&block);
        let result = DurationCriterion.evaluate(
            &movie("m", "Broken", 0),
            None,
            &profile,
            Some(&block),
            None,
        );
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_duration_categories() {
        assert_eq!(duration_category(30 * 60_000), Some("short"));
        assert_eq!(duration_category(90 * 60_000), Some("standard"));
        assert_eq!(duration_category(150 * 60_000), Some("long"));
        assert_eq!(duration_category(200 * 60_000), Some("very_long"));
        assert_eq!(duration_category(300 * 60_000), Some("epic"));
        assert_eq!(duration_category(0), None);
    }
}
