/// Block fit in time: overflow past the block end, late start after the
/// block start, and time-of-day appropriateness.
///
/// Overflow only applies to the last program of a block instance and late
/// start only to the first; interior programs are reduced to the time-of-day
/// component here and are marked `skipped` by the post-processing pass.
use chrono::Duration;

use crate::blocks::TimeBlock;
use crate::domain::{Content, ContentKind, ContentMeta, Profile};
use crate::scoring::criteria::{block_rules, multiplier_of, policy_of, weight_of, Criterion};
use crate::scoring::{mfp, CriterionDetails, CriterionResult, ScoringContext, TimingDetails};

pub struct TimingCriterion;

/// Piecewise-linear penalty: 0 min -> 100, 30 -> ~75, 60 -> ~50, 120 -> ~25,
/// 180+ -> 5.
fn offset_penalty_score(offset_minutes: f64) -> f64 {
    if offset_minutes <= 0.0 {
        100.0
    } else if offset_minutes <= 30.0 {
        100.0 - offset_minutes * 0.83
    } else if offset_minutes <= 60.0 {
        75.0 - (offset_minutes - 30.0) * 0.83
    } else if offset_minutes <= 120.0 {
        50.0 - (offset_minutes - 60.0) * 0.42
    } else if offset_minutes <= 180.0 {
        25.0 - (offset_minutes - 120.0) * 0.33
    } else {
        5.0
    }
}

/// Day period token for a block's start hour.
pub fn day_period(start_hour: u32) -> &'static str {
    match start_hour {
        6..=11 => "morning",
        12..=17 => "afternoon",
        18..=21 => "evening",
        _ => "night",
    }
}

fn time_of_day_score(content: &Content, block: Option<&TimeBlock>) -> f64 {
    let Some(block) = block else {
        return 75.0;
    };
    let period = day_period(block.start_hour());

    match content.kind {
        ContentKind::Movie => match period {
            "evening" => 100.0,
            "night" => 90.0,
            "afternoon" => 70.0,
            _ => 50.0,
        },
        ContentKind::Episode => match period {
            "evening" | "afternoon" => 90.0,
            _ => 75.0,
        },
        ContentKind::Trailer | ContentKind::Short => 80.0,
        _ => 75.0,
    }
}

impl TimingCriterion {
    fn details(
        &self,
        content: &Content,
        block: Option<&TimeBlock>,
        ctx: Option<&ScoringContext>,
    ) -> TimingDetails {
        let mut details = TimingDetails {
            final_score: Some(50.0),
            ..TimingDetails::default()
        };

        let Some(ctx) = ctx else {
            details.final_score = Some(time_of_day_score(content, block));
            return details;
        };
        let (Some(current), Some(block_end)) = (ctx.current_time, ctx.block_end) else {
            details.final_score = Some(time_of_day_score(content, block));
            return details;
        };

        details.is_first_in_block = ctx.is_first_in_block;
        details.is_last_in_block = ctx.is_last_in_block;

        if content.duration_ms <= 0 {
            return details;
        }
        let content_end = current + Duration::milliseconds(content.duration_ms);

        // Overflow counts only for the last program of the block instance
        let mut overflow_score = 100.0;
        if ctx.is_last_in_block {
            let overflow_minutes =
                (content_end - block_end).num_seconds() as f64 / 60.0;
            details.overflow_minutes = Some((overflow_minutes * 10.0).round() / 10.0);
            overflow_score = offset_penalty_score(overflow_minutes.max(0.0));
        }

        // Late (or early) start counts only for the first program
        let mut late_start_score = 100.0;
        if ctx.is_first_in_block {
            if let Some(block_start) = ctx.block_start {
                let start_offset = (current - block_start).num_seconds() as f64 / 60.0;
                if start_offset > 0.0 {
                    details.late_start_minutes = Some((start_offset * 10.0).round() / 10.0);
                    late_start_score = offset_penalty_score(start_offset);
                } else if start_offset < 0.0 {
                    details.early_start_minutes =
                        Some((start_offset.abs() * 10.0).round() / 10.0);
                }
            }
        }

        let tod = time_of_day_score(content, block);
        let final_score = if ctx.is_first_in_block {
            overflow_score * 0.4 + late_start_score * 0.3 + tod * 0.3
        } else {
            overflow_score * 0.7 + tod * 0.3
        };
        details.final_score = Some(final_score.clamp(0.0, 100.0));
        details
    }
}

impl Criterion for TimingCriterion {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn default_weight(&self) -> f64 {
        20.0
    }

    fn evaluate(
        &self,
        content: &Content,
        _meta: Option<&ContentMeta>,
        profile: &Profile,
        block: Option<&TimeBlock>,
        ctx: Option<&ScoringContext>,
    ) -> CriterionResult {
        let details = self.details(content, block, ctx);
        let mut score = details.final_score.unwrap_or(50.0);

        // Timing rules match day-period tokens plus an exact-hour alias
        let mut violation = None;
        if let Some(block) = block {
            if let Some(rules) = block_rules(Some(block), self.name()) {
                let policy = policy_of(profile, Some(block));
                let hour = block.start_hour();
                let tokens = vec![day_period(hour).to_string(), format!("{}h", hour)];
                let (adjustment, outcome) =
                    mfp::check_alias_tokens(&tokens, Some(rules), &policy);
                score += adjustment;
                violation = outcome;
            }
        }

        CriterionResult::build(
            self.name(),
            score,
            weight_of(profile, self),
            multiplier_of(profile, block, self.name()),
        )
        .with_details(CriterionDetails::Timing(details))
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
    use crate::testing::fixtures::{block_with_criteria, dt, movie, profile_with_block};

    fn context(
        current: chrono::NaiveDateTime,
        block_start: chrono::NaiveDateTime,
        block_end: chrono::NaiveDateTime,
        first: bool,
        last: bool,
    ) -> ScoringContext {
        ScoringContext {
            current_time: Some(current),
            block_start: Some(block_start),
            block_end: Some(block_end),
            is_first_in_block: first,
            is_last_in_block: last,
            is_schedule_start: false,
        }
    }

    #[test]
    fn test_penalty_curve_breakpoints() {
        assert_eq!(offset_penalty_score(0.0), 100.0);
        assert!((offset_penalty_score(30.0) - 75.1).abs() < 0.2);
        assert!((offset_penalty_score(60.0) - 50.1).abs() < 0.2);
        assert!((offset_penalty_score(120.0) - 24.8).abs() < 0.5);
        assert_eq!(offset_penalty_score(200.0), 5.0);
    }

    #[test]
    fn test_day_periods() {
        assert_eq!(day_period(7), "morning");
        assert_eq!(day_period(13), "afternoon");
        assert_eq!(day_period(20), "evening");
        assert_eq!(day_period(23), "night");
        assert_eq!(day_period(2), "night");
    }

    #[test]
    fn test_last_in_block_overflow_recorded() {
        let block = block_with_criteria("evening", "18:00", "22:00", BlockCriteria::default());
        let profile = profile_with_block(&block);
        // 120-minute movie starting 21:00 overflows 22:00 by 60 minutes
        let ctx = context(
            dt(2025, 1, 10, 21, 0),
            dt(2025, 1, 10, 18, 0),
            dt(2025, 1, 10, 22, 0),
            false,
            true,
        );

        let result = TimingCriterion.evaluate(
            &movie("m", "Late", 120),
            None,
            &profile,
            Some(&block),
            Some(&ctx),
        );
        let CriterionDetails::Timing(details) = result.details.unwrap() else {
            panic!("expected timing details");
        };
        assert_eq!(details.overflow_minutes, Some(60.0));
        // 0.7 * ~50 + 0.3 * 100 (movie in evening)
        assert!(result.score > 60.0 && result.score < 70.0);
    }

    #[test]
    fn test_first_in_block_late_start_recorded() {
        let block = block_with_criteria("evening", "18:00", "23:59", BlockCriteria::default());
        let profile = profile_with_block(&block);
        let ctx = context(
            dt(2025, 1, 10, 18, 30),
            dt(2025, 1, 10, 18, 0),
            dt(2025, 1, 10, 23, 59),
            true,
            false,
        );

        let result = TimingCriterion.evaluate(
            &movie("m", "Late", 90),
            None,
            &profile,
            Some(&block),
            Some(&ctx),
        );
        let CriterionDetails::Timing(details) = result.details.unwrap() else {
            panic!("expected timing details");
        };
        assert_eq!(details.late_start_minutes, Some(30.0));
        assert!(details.overflow_minutes.is_none());
    }

    #[test]
    fn test_interior_program_uses_time_of_day_only() {
        let block = block_with_criteria("evening", "18:00", "23:59", BlockCriteria::default());
        let profile = profile_with_block(&block);
        let ctx = context(
            dt(2025, 1, 10, 19, 0),
            dt(2025, 1, 10, 18, 0),
            dt(2025, 1, 10, 23, 59),
            false,
            false,
        );

        let result = TimingCriterion.evaluate(
            &movie("m", "Mid", 90),
            None,
            &profile,
            Some(&block),
            Some(&ctx),
        );
        // 0.7 * 100 (no overflow for non-last) + 0.3 * 100 (movie, evening)
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_no_context_falls_back_to_time_of_day() {
        let block = block_with_criteria("morning", "06:00", "12:00", BlockCriteria::default());
        let profile = profile_with_block(&block);

        let result = TimingCriterion.evaluate(
            &movie("m", "AM Movie", 90),
            None,
            &profile,
            Some(&block),
            None,
        );
        // Movies in the morning score 50
        assert_eq!(result.score, 50.0);
    }
}
